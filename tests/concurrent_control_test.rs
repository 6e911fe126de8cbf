// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证多个写入方（各自持有连接）同时操作时的串行化
// 1. 并发分配不超过需求配额
// 2. 同一集装箱的并发迁移只有一个成功
// ==========================================

mod helpers;

#[cfg(test)]
mod concurrent_control_test {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use container_qc::api::ApiError;
    use container_qc::app::AppState;
    use container_qc::domain::types::QcStatus;

    use crate::helpers::api_test_helper::{ApiTestEnv, FARMER, LIC_OM_INTERNAL};
    use crate::helpers::test_data_builder::{date, RequestBuilder};
    use crate::test_helpers::count_rows;

    /// 为每个线程准备独立的 AppState（同一数据库文件）
    fn states_for(env: &ApiTestEnv, count: usize) -> Vec<AppState> {
        (0..count)
            .map(|_| AppState::new(env.db_path.clone()).expect("无法创建AppState"))
            .collect()
    }

    #[test]
    fn test_concurrent_allocations_respect_quota() {
        let env = ApiTestEnv::new().expect("无法创建测试环境");
        RequestBuilder::new("R-Q5").quota(5).insert(&env.conn());

        const THREADS: usize = 4;
        let barrier = Arc::new(Barrier::new(THREADS));
        let mut handles = Vec::new();

        for (i, state) in states_for(&env, THREADS).into_iter().enumerate() {
            let barrier = barrier.clone();
            let handle = thread::spawn(move || {
                barrier.wait();
                // 每个线程使用不同日期，互不替换
                state
                    .plan_api
                    .allocate("R-Q5", FARMER, date(2025, 1, 10 + i as u32), 2)
            });
            handles.push(handle);
        }

        let mut allocated = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.join().expect("线程异常退出") {
                Ok(plan) => allocated += plan.containers.len() as i64,
                Err(ApiError::QuotaExceeded { total, .. }) => {
                    assert_eq!(total, 5);
                    rejected += 1;
                }
                Err(e) => panic!("意外错误: {:?}", e),
            }
        }

        // 4 × 2 申请 5 个配额: 恰好两个线程成功
        assert_eq!(allocated, 4);
        assert_eq!(rejected, 2);

        let view = env.state.plan_api.list_with_quota("R-Q5").expect("查询失败");
        assert_eq!(view.quota.used, 4);
        assert!(view.quota.used <= view.quota.total);

        let conn = env.conn();
        let stored: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM container WHERE buyer_request_id = 'R-Q5'",
                [],
                |row| row.get(0),
            )
            .expect("统计失败");
        assert_eq!(stored, 4);
    }

    #[test]
    fn test_concurrent_clear_single_winner() {
        let env = ApiTestEnv::new().expect("无法创建测试环境");
        let id = env.submitted_container();

        const THREADS: usize = 4;
        let barrier = Arc::new(Barrier::new(THREADS));
        let mut handles = Vec::new();

        for state in states_for(&env, THREADS) {
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                state.qc_api.clear(LIC_OM_INTERNAL, id)
            }));
        }

        let mut success = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.join().expect("线程异常退出") {
                Ok(container) => {
                    assert_eq!(container.qc_status, QcStatus::Approved);
                    success += 1;
                }
                Err(ApiError::InvalidTransition { .. }) => conflicts += 1,
                Err(e) => panic!("意外错误: {:?}", e),
            }
        }

        assert_eq!(success, 1);
        assert_eq!(conflicts, THREADS - 1);

        // 只记录一次 qc_submitted → approved
        let conn = env.conn();
        let approvals: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM container_status_history \
                 WHERE container_id = ?1 AND to_status = 'approved'",
                [id],
                |row| row.get(0),
            )
            .expect("统计失败");
        assert_eq!(approvals, 1);
        assert_eq!(count_rows(&conn, "container_status_history", Some(id)), 3);
    }
}
