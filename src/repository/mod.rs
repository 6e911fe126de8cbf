// ==========================================
// 出口集装箱质检追踪系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: *_tx 关联函数接收 &Connection（含事务），由 API 层组合成单一写事务
// ==========================================

pub mod capacity_request_repo;
pub mod container_repo;
pub mod error;
pub mod external_qc_repo;
pub mod hold_resolution_repo;
pub mod plan_repo;
pub mod qc_license_repo;
pub mod sql_support;
pub mod status_history_repo;
pub mod tracking_repo;
pub mod user_repo;

// 重导出核心仓储
pub use capacity_request_repo::CapacityRequestRepository;
pub use container_repo::{ContainerQuery, ContainerRepository, ContainerSortColumn, ScopedContainer};
pub use error::{RepositoryError, RepositoryResult};
pub use external_qc_repo::ExternalQcRepository;
pub use hold_resolution_repo::HoldResolutionRepository;
pub use plan_repo::{PlanActivity, PlanRepository};
pub use qc_license_repo::QcLicenseRepository;
pub use status_history_repo::StatusHistoryRepository;
pub use tracking_repo::{TrackingEventWrite, TrackingRepository};
pub use user_repo::UserRepository;
