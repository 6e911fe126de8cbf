// ==========================================
// 出口集装箱质检追踪系统 - 质检状态历史数据仓储
// ==========================================
// 红线: 所有质检状态变更必须记录，只追加
// ==========================================

mod core;
mod queries;


pub use core::StatusHistoryRepository;
