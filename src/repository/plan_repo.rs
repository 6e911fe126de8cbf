// ==========================================
// 出口集装箱质检追踪系统 - 生产计划数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: *_tx 方法接收调用方持有的连接/事务，供 API 层组合成单事务
// ==========================================

use crate::domain::plan::{Plan, PlanFile};
use crate::domain::types::PlanStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_support::{fmt_date, fmt_datetime, get_date, get_datetime};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const PLAN_COLUMNS: &str = r#"
    SELECT plan_id, request_id, plan_date, status, created_by, created_at, updated_at
    FROM production_plan
"#;

/// 替换前的计划占用情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanActivity {
    pub container_count: i64,
    /// 已离开 pending、已发追踪码或已有外部报告的集装箱数
    pub progressed_count: i64,
}

// ==========================================
// PlanRepository - 生产计划仓储
// ==========================================
pub struct PlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanRepository {
    /// 创建新的PlanRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入计划（事务内）
    pub fn insert_tx(conn: &Connection, plan: &Plan) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO production_plan (
                plan_id, request_id, plan_date, status, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                &plan.plan_id,
                &plan.request_id,
                fmt_date(&plan.plan_date),
                plan.status.to_db_str(),
                &plan.created_by,
                fmt_datetime(&plan.created_at),
                fmt_datetime(&plan.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 删除计划及其全部从属数据（事务内）
    ///
    /// 显式逐表删除，不依赖 foreign_keys PRAGMA 是否开启
    ///
    /// # 返回
    /// - Ok(n): 被删除的集装箱数量
    pub fn delete_cascade_tx(conn: &Connection, plan_id: &str) -> RepositoryResult<usize> {
        const CONTAINER_SCOPED: [&str; 4] = [
            "external_qc_report",
            "qc_hold_resolution",
            "container_tracking_status",
            "container_status_history",
        ];

        conn.execute("DELETE FROM plan_file WHERE plan_id = ?1", params![plan_id])?;
        for table in CONTAINER_SCOPED {
            let sql = format!(
                "DELETE FROM {} WHERE container_id IN (SELECT container_id FROM container WHERE plan_id = ?1)",
                table
            );
            conn.execute(&sql, params![plan_id])?;
        }
        let containers = conn.execute("DELETE FROM container WHERE plan_id = ?1", params![plan_id])?;
        conn.execute("DELETE FROM production_plan WHERE plan_id = ?1", params![plan_id])?;
        Ok(containers)
    }

    /// 记录附件引用（事务内）
    pub fn insert_file_tx(conn: &Connection, file: &PlanFile) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO plan_file (
                file_id, plan_id, container_id, file_name, storage_key, uploaded_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                &file.file_id,
                &file.plan_id,
                &file.container_id,
                &file.file_name,
                &file.storage_key,
                &file.uploaded_by,
                fmt_datetime(&file.created_at),
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按计划ID查询
    pub fn find_by_id(&self, plan_id: &str) -> RepositoryResult<Option<Plan>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, plan_id)
    }

    /// 按计划ID查询（事务内）
    pub fn find_by_id_tx(conn: &Connection, plan_id: &str) -> RepositoryResult<Option<Plan>> {
        let sql = format!("{} WHERE plan_id = ?1", PLAN_COLUMNS);
        Ok(conn.query_row(&sql, params![plan_id], Self::map_row).optional()?)
    }

    /// 按 (request_id, plan_date) 查询（事务内）
    pub fn find_by_request_and_date_tx(
        conn: &Connection,
        request_id: &str,
        plan_date: NaiveDate,
    ) -> RepositoryResult<Option<Plan>> {
        let sql = format!("{} WHERE request_id = ?1 AND plan_date = ?2", PLAN_COLUMNS);
        Ok(conn
            .query_row(&sql, params![request_id, fmt_date(&plan_date)], Self::map_row)
            .optional()?)
    }

    /// 查询需求下的全部计划（按日期升序，事务内）
    pub fn list_by_request_tx(conn: &Connection, request_id: &str) -> RepositoryResult<Vec<Plan>> {
        let sql = format!("{} WHERE request_id = ?1 ORDER BY plan_date ASC", PLAN_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let plans = stmt
            .query_map(params![request_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// 某操作人在需求下已创建的计划数（事务内）
    pub fn count_by_request_and_actor_tx(
        conn: &Connection,
        request_id: &str,
        actor_id: &str,
    ) -> RepositoryResult<i64> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM production_plan WHERE request_id = ?1 AND created_by = ?2",
            params![request_id, actor_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// 统计计划下集装箱的推进情况（事务内）
    pub fn activity_tx(conn: &Connection, plan_id: &str) -> RepositoryResult<PlanActivity> {
        let activity = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE
                    WHEN c.qc_status <> 'pending'
                      OR c.tracking_code IS NOT NULL
                      OR EXISTS (SELECT 1 FROM external_qc_report r WHERE r.container_id = c.container_id)
                    THEN 1 ELSE 0 END), 0)
            FROM container c
            WHERE c.plan_id = ?1
            "#,
            params![plan_id],
            |row| {
                Ok(PlanActivity {
                    container_count: row.get(0)?,
                    progressed_count: row.get(1)?,
                })
            },
        )?;
        Ok(activity)
    }

    /// 查询计划附件（事务内）
    pub fn list_files_tx(conn: &Connection, plan_id: &str) -> RepositoryResult<Vec<PlanFile>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT file_id, plan_id, container_id, file_name, storage_key, uploaded_by, created_at
            FROM plan_file
            WHERE plan_id = ?1
            ORDER BY created_at ASC, file_id ASC
            "#,
        )?;
        let files = stmt
            .query_map(params![plan_id], |row| {
                Ok(PlanFile {
                    file_id: row.get(0)?,
                    plan_id: row.get(1)?,
                    container_id: row.get(2)?,
                    file_name: row.get(3)?,
                    storage_key: row.get(4)?,
                    uploaded_by: row.get(5)?,
                    created_at: get_datetime(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(files)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Plan> {
        let status: String = row.get(3)?;
        Ok(Plan {
            plan_id: row.get(0)?,
            request_id: row.get(1)?,
            plan_date: get_date(row, 2)?,
            status: PlanStatus::from_str(&status),
            created_by: row.get(4)?,
            created_at: get_datetime(row, 5)?,
            updated_at: get_datetime(row, 6)?,
        })
    }
}
