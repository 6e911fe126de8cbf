// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用环境与流程捷径
// 种子: 用户 A1(admin) M1(manager) B1(buyer) F1(farmer)
//       执照 OM/QA 内部与外部各一，另有停用执照
//       需求 REQ-OM（Oman，配额 20）
// ==========================================

#![allow(dead_code)]

use std::cell::Cell;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use container_qc::api::{ApiError, ApiResult};
use container_qc::app::AppState;
use container_qc::domain::container::InspectionInfo;
use container_qc::domain::plan::PlanWithContainers;
use container_qc::engine::notification::RecordingNotificationSink;
use rusqlite::Connection;

use super::test_data_builder::{date, RequestBuilder};
use crate::test_helpers::{create_test_db, insert_license, insert_user, open_test_conn};

pub const ADMIN: &str = "A1";
pub const MANAGER: &str = "M1";
pub const BUYER: &str = "B1";
pub const FARMER: &str = "F1";

pub const LIC_OM_INTERNAL: &str = "LIC-OM-INT";
pub const LIC_OM_EXTERNAL: &str = "LIC-OM-EXT";
pub const LIC_QA_INTERNAL: &str = "LIC-QA-INT";
pub const LIC_QA_EXTERNAL: &str = "LIC-QA-EXT";
pub const LIC_INACTIVE: &str = "LIC-OFF";

pub const REQUEST: &str = "REQ-OM";

// ==========================================
// API测试环境
// ==========================================

pub struct ApiTestEnv {
    pub db_path: String,
    pub state: AppState,
    pub sink: Arc<RecordingNotificationSink>,

    // 下一个可用计划日期（窗口内逐日递增）
    next_day: Cell<u32>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 默认环境（通知出口为内存记录）
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_sink(Arc::new(RecordingNotificationSink::new()))
    }

    pub fn with_sink(
        sink: Arc<RecordingNotificationSink>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let (temp_file, db_path) = create_test_db()?;

        {
            let conn = open_test_conn(&db_path);
            seed_directory(&conn);
            RequestBuilder::new(REQUEST).buyer(BUYER).quota(20).insert(&conn);
        }

        let state = AppState::with_sink(db_path.clone(), sink.clone())?;

        Ok(Self {
            db_path,
            state,
            sink,
            next_day: Cell::new(1),
            _temp_file: temp_file,
        })
    }

    /// 断言用的独立连接
    pub fn conn(&self) -> Connection {
        open_test_conn(&self.db_path)
    }

    /// 取一个尚未使用的窗口内日期
    pub fn fresh_date(&self) -> NaiveDate {
        let day = self.next_day.get();
        self.next_day.set(day + 1);
        date(2025, 1, day)
    }

    /// 以 F1 身份在新日期分配
    pub fn allocate(&self, request_id: &str, count: i64) -> ApiResult<PlanWithContainers> {
        let plan_date = self.fresh_date();
        self.state
            .plan_api
            .allocate(request_id, FARMER, plan_date, count)
    }

    /// 分配一个集装箱并推进到 qc_submitted
    pub fn submitted_container(&self) -> i64 {
        let plan = self.allocate(REQUEST, 1).expect("分配失败");
        let id = plan.containers[0].container_id;
        self.state
            .qc_api
            .mark_arrived(LIC_OM_INTERNAL, id, None, "Muscat Port")
            .expect("登记到场失败");
        self.state
            .qc_api
            .start_inspection(LIC_OM_INTERNAL, id, cartons(100))
            .expect("提交检验失败");
        id
    }

    /// 分配一个集装箱并推进到 approved
    pub fn approved_container(&self) -> i64 {
        let id = self.submitted_container();
        self.state.qc_api.clear(LIC_OM_INTERNAL, id).expect("放行失败");
        id
    }

    /// 分配一个集装箱并推进到 held
    pub async fn held_container(&self) -> i64 {
        let id = self.submitted_container();
        self.state
            .qc_api
            .hold(LIC_OM_INTERNAL, id, "damaged", Some("visible dents"))
            .await
            .expect("扣留失败");
        id
    }
}

/// 仅含纸箱数的检验数据
pub fn cartons(count: i64) -> InspectionInfo {
    InspectionInfo {
        actual_carton_count: Some(count),
        ..Default::default()
    }
}

/// 断言错误类型
pub fn assert_api_error<T: std::fmt::Debug>(
    result: ApiResult<T>,
    matcher: impl Fn(&ApiError) -> bool,
    label: &str,
) {
    match result {
        Ok(v) => panic!("{}: 期望错误，实际成功 {:?}", label, v),
        Err(e) => assert!(matcher(&e), "{}: 错误类型不符 {:?}", label, e),
    }
}

fn seed_directory(conn: &Connection) {
    insert_user(conn, ADMIN, "Admin", "admin", true);
    insert_user(conn, MANAGER, "Manager", "manager", true);
    insert_user(conn, "M2", "Retired Manager", "manager", false);
    insert_user(conn, BUYER, "Gulf Buyer", "buyer", true);
    insert_user(conn, FARMER, "Green Farm", "farmer", true);
    insert_user(conn, "F2", "Desert Orchard", "farmer", true);

    insert_license(conn, LIC_OM_INTERNAL, "QC-OM", Some("OM"), "internal", true);
    insert_license(conn, LIC_OM_EXTERNAL, "EXT-OM", Some("om"), "external", true);
    insert_license(conn, LIC_QA_INTERNAL, "QC-QA", Some("QA"), "internal", true);
    insert_license(conn, LIC_QA_EXTERNAL, "EXT-QA", Some("QA"), "external", true);
    insert_license(conn, LIC_INACTIVE, "QC-OLD", Some("OM"), "internal", false);
}
