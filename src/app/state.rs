// ==========================================
// 出口集装箱质检追踪系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约定: 一个 AppState 持有一个共享连接；并发写入方各自持有 AppState
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{
    ContainerNotifier, ExternalQcApi, HoldResolutionApi, PlanApi, QcApi, TrackingApi,
};
use crate::app::lifecycle::RequestLifecycleAdapter;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, warn_on_schema_mismatch};
use crate::engine::events::AllocationEventPublisher;
use crate::engine::notification::{NotificationDispatcher, NotificationSink};
use crate::repository::{
    CapacityRequestRepository, ContainerRepository, ExternalQcRepository,
    HoldResolutionRepository, PlanRepository, QcLicenseRepository, StatusHistoryRepository,
    TrackingRepository, UserRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生产计划分配API
    pub plan_api: Arc<PlanApi>,

    /// 内部质检API
    pub qc_api: Arc<QcApi>,

    /// 扣留处理API
    pub hold_resolution_api: Arc<HoldResolutionApi>,

    /// 外部质检确认API
    pub external_qc_api: Arc<ExternalQcApi>,

    /// 追踪台账API
    pub tracking_api: Arc<TrackingApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 产能需求仓储（只读查询 + 首个计划标记）
    pub request_repo: Arc<CapacityRequestRepository>,
}

impl AppState {
    /// 创建新的AppState实例（不发送通知）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::build(db_path, NotificationDispatcher::none())
    }

    /// 创建带通知出口的AppState实例
    pub fn with_sink(db_path: String, sink: Arc<dyn NotificationSink>) -> Result<Self, String> {
        Self::build(db_path, NotificationDispatcher::new(sink))
    }

    fn build(db_path: String, dispatcher: NotificationDispatcher) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        if let Err(e) = warn_on_schema_mismatch(&conn) {
            tracing::warn!(error = %e, "schema_version 读取失败(将继续启动)");
        }
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let request_repo = Arc::new(CapacityRequestRepository::new(conn.clone()));
        let plan_repo = Arc::new(PlanRepository::new(conn.clone()));
        let container_repo = Arc::new(ContainerRepository::new(conn.clone()));
        let license_repo = Arc::new(QcLicenseRepository::new(conn.clone()));
        let status_history_repo = Arc::new(StatusHistoryRepository::new(conn.clone()));
        let resolution_repo = Arc::new(HoldResolutionRepository::new(conn.clone()));
        let report_repo = Arc::new(ExternalQcRepository::new(conn.clone()));
        let tracking_repo = Arc::new(TrackingRepository::new(conn.clone()));
        let user_repo = Arc::new(UserRepository::new(conn.clone()));

        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));

        // ==========================================
        // 事件与通知
        // ==========================================

        // 分配事件 → 需求首个计划标记（依赖倒置，API 层不直接写需求表）
        let event_publisher: Arc<dyn AllocationEventPublisher> =
            Arc::new(RequestLifecycleAdapter::new(request_repo.clone()));
        let notifier = Arc::new(ContainerNotifier::new(user_repo, dispatcher));

        // ==========================================
        // 初始化API层
        // ==========================================
        let plan_api = Arc::new(PlanApi::new(
            conn.clone(),
            plan_repo,
            config_manager.clone(),
            Some(event_publisher),
        ));

        let qc_api = Arc::new(QcApi::new(
            conn.clone(),
            container_repo.clone(),
            license_repo.clone(),
            status_history_repo,
            config_manager.clone(),
            notifier.clone(),
        ));

        let hold_resolution_api = Arc::new(HoldResolutionApi::new(
            conn.clone(),
            resolution_repo,
            notifier.clone(),
        ));

        let external_qc_api = Arc::new(ExternalQcApi::new(
            conn.clone(),
            container_repo,
            report_repo,
            license_repo,
            config_manager.clone(),
            notifier.clone(),
        ));

        let tracking_api = Arc::new(TrackingApi::new(
            conn,
            tracking_repo,
            config_manager.clone(),
            notifier,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            plan_api,
            qc_api,
            hold_resolution_api,
            external_qc_api,
            tracking_api,
            config_manager,
            request_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 CONTAINER_QC_DB（非空时）
/// - 否则: 用户本地数据目录/container-qc/container_qc.db
/// - 无法获取数据目录时: ./container_qc.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("CONTAINER_QC_DB") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./container_qc.db");
    if let Some(data_dir) = dirs::data_local_dir() {
        let dir = data_dir.join("container-qc");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "数据目录创建失败，使用当前目录");
        } else {
            path = dir.join("container_qc.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_on_fresh_database() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();

        let state = AppState::new(path.clone()).unwrap();
        assert_eq!(state.get_db_path(), path);
        assert_eq!(state.config_manager.default_page_size().unwrap(), 20);
    }
}
