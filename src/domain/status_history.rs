// ==========================================
// 出口集装箱质检追踪系统 - 质检状态历史
// ==========================================
// 红线: 所有质检状态变更必须记录，只追加不修改
// 用途: 审计追踪，还原单个集装箱的状态轨迹
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::types::QcStatus;

// ==========================================
// StatusHistoryEntry - 状态变更记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub history_id: String,
    pub container_id: i64,
    pub from_status: QcStatus,
    pub to_status: QcStatus,
    pub actor: String,                   // 执照ID或用户ID
    pub payload_json: Option<JsonValue>, // 动作参数快照
    pub action_ts: NaiveDateTime,
}

impl StatusHistoryEntry {
    /// 以当前时间创建一条记录
    pub fn now(
        container_id: i64,
        from_status: QcStatus,
        to_status: QcStatus,
        actor: &str,
        payload_json: Option<JsonValue>,
    ) -> Self {
        Self {
            history_id: uuid::Uuid::new_v4().to_string(),
            container_id,
            from_status,
            to_status,
            actor: actor.to_string(),
            payload_json,
            action_ts: chrono::Local::now().naive_local(),
        }
    }
}
