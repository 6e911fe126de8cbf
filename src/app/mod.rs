// ==========================================
// 出口集装箱质检追踪系统 - 应用层
// ==========================================
// 职责: 组装仓储/引擎/API，提供宿主应用入口
// ==========================================

pub mod lifecycle;
pub mod state;

// 重导出
pub use lifecycle::RequestLifecycleAdapter;
pub use state::{get_default_db_path, AppState};
