// ==========================================
// 出口集装箱质检追踪系统 - API 层
// ==========================================
// 职责: 编排仓储与引擎，供宿主应用调用
// 约定: 读-校验-写在单一 IMMEDIATE 事务内完成；通知在提交后发送
// ==========================================

pub mod error;
pub mod external_qc_api;
pub mod hold_resolution_api;
pub mod notify;
pub mod pagination;
pub mod plan_api;
pub mod qc_api;
pub mod tracking_api;

pub(crate) mod scope;
pub(crate) mod tx;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use external_qc_api::ExternalQcApi;
pub use hold_resolution_api::HoldResolutionApi;
pub use notify::ContainerNotifier;
pub use pagination::{Page, PageRequest};
pub use plan_api::PlanApi;
pub use qc_api::{ContainerListFilter, ContainerListResult, QcApi, StatusCount};
pub use tracking_api::TrackingApi;
