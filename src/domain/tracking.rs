// ==========================================
// 出口集装箱质检追踪系统 - 追踪台账领域模型
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// TrackingStatus - 面向用户的物流状态事件
// ==========================================
// 按 (container_id, tracking_code) 松散键控，NULL 追踪码自成一键
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingStatus {
    pub tracking_id: i64,
    pub container_id: i64,
    pub tracking_code: Option<String>,
    pub status: String,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 追踪事件写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingWriteKind {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingWriteOutcome {
    pub kind: TrackingWriteKind,
    pub record: TrackingStatus,
}

// ==========================================
// TrackingLookup - 按追踪码查询结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingLookup {
    pub container_id: i64,
    pub container_no: i64,
    pub tracking_code: Option<String>,
    pub qc_status: String,
    pub plan_id: String,
    pub plan_date: NaiveDate,
    pub request_id: String,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub import_country: String,
    pub latest: Option<TrackingStatus>,
}
