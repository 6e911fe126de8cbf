// ==========================================
// 出口集装箱质检追踪系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含业务规则编排
// ==========================================

pub mod capacity;
pub mod container;
pub mod plan;
pub mod qc;
pub mod status_history;
pub mod tracking;
pub mod types;

// 重导出核心类型
pub use capacity::{CapacityQuota, CapacityRequest, DeliveryWindow};
pub use container::{
    ArrivalInfo, Container, ContainerSummary, HoldInfo, InspectionInfo, InspectionRecord,
};
pub use plan::{Plan, PlanFile, PlanQuotaView, PlanWithContainers};
pub use qc::{
    ExternalQcReport, ExternalReportInput, HoldResolution, HoldResolutionOutcome, QcLicense,
    ReportedContainer,
};
pub use status_history::StatusHistoryEntry;
pub use tracking::{TrackingLookup, TrackingStatus, TrackingWriteKind, TrackingWriteOutcome};
pub use types::{LicenseKind, PlanStatus, QcStatus, RequestStatus, ResolutionAction};
