// ==========================================
// 出口集装箱质检追踪系统 - 引擎层
// ==========================================
// 职责: 实现业务规则,不拼 SQL
// 红线: Engine 不拼 SQL, 所有拒绝必须输出原因
// ==========================================

pub mod allocation_rules;
pub mod country_scope;
pub mod events;
pub mod notification;
pub mod qc_transition;
pub mod tracking_code;

// 重导出核心引擎
pub use allocation_rules::{check_allocation, check_replacement, AllocationDenial};
pub use country_scope::{check_request, country_name, resolve_scope, LicenseScope, ScopeDenial, COUNTRY_TABLE};
pub use events::{
    AllocationEvent, AllocationEventPublisher, AllocationEventType, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use notification::{
    DispatchSummary, Notification, NotificationDispatcher, NotificationEventType, NotificationSink,
    RecordingNotificationSink,
};
pub use qc_transition::{forward_target, resolution_effect, QcOperation, ResolutionEffect};
pub use tracking_code::{generate_tracking_code, normalize_tracking_code};
