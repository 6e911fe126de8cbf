// ==========================================
// 出口集装箱质检追踪系统 - 核心库
// ==========================================
// 范围: 产能分配、集装箱质检状态机、扣留处理、外部质检确认、追踪台账
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LicenseKind, PlanStatus, QcStatus, RequestStatus, ResolutionAction};

// 领域实体
pub use domain::{
    CapacityQuota, CapacityRequest, Container, ContainerSummary, ExternalQcReport,
    ExternalReportInput, HoldResolution, HoldResolutionOutcome, InspectionInfo, Plan,
    PlanWithContainers, QcLicense, StatusHistoryEntry, TrackingStatus,
};

// 引擎
pub use engine::{NotificationSink, RecordingNotificationSink};

// API
pub use api::{
    ApiError, ApiResult, ExternalQcApi, HoldResolutionApi, PlanApi, QcApi, TrackingApi,
};

// 应用
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "出口集装箱质检追踪系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
