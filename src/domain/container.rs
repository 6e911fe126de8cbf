// ==========================================
// 出口集装箱质检追踪系统 - 集装箱领域模型
// ==========================================
// 红线: qc_status 只能前进，回退仅经由扣留处理
// 红线: 检验数据每个放行周期只写一次
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::domain::types::QcStatus;

// ==========================================
// Container - 集装箱
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub container_id: i64,
    pub plan_id: String,
    pub container_no: i64, // 计划内 1 起始序号

    // ===== 质检状态 =====
    pub qc_status: QcStatus,
    pub qc_reviewed_by: Option<String>, // 最近操作的执照
    pub qc_reviewed_at: Option<NaiveDateTime>,
    pub arrival: Option<ArrivalInfo>,
    pub inspection: Option<InspectionRecord>,
    pub hold: Option<HoldInfo>,

    // ===== 追踪 =====
    pub tracking_code: Option<String>,

    // ===== 归属 =====
    pub supplier_id: Option<String>,
    pub buyer_request_id: String,

    // ===== 独立于质检审核的扩展数据 =====
    pub metadata: Option<JsonValue>,
    pub admin_metadata: Option<JsonValue>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// ArrivalInfo - 到场信息（只写一次）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalInfo {
    pub arrived_at: NaiveDateTime,
    pub place: String,
}

// ==========================================
// InspectionInfo - 质检员录入的检验数据
// ==========================================
// 已知字段显式建模；未知字段保存在 extra 中向前兼容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_carton_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seal_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl InspectionInfo {
    /// 是否为空载荷（没有任何字段）
    pub fn is_empty(&self) -> bool {
        self.actual_carton_count.is_none()
            && self.actual_weight_kg.is_none()
            && self.temperature_c.is_none()
            && self.seal_number.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.remarks.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.photos.is_empty()
            && self.extra.is_empty()
    }

    /// 写入边界校验
    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("检验数据不能为空".to_string());
        }
        if matches!(self.actual_carton_count, Some(n) if n < 0) {
            return Err("actual_carton_count 不能为负数".to_string());
        }
        if matches!(self.actual_weight_kg, Some(w) if w < 0.0 || !w.is_finite()) {
            return Err("actual_weight_kg 必须为非负数".to_string());
        }
        Ok(())
    }
}

// ==========================================
// InspectionRecord - 已保存的检验记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub info: InspectionInfo,
    pub inspected_by: Option<String>,
    pub inspected_at: Option<NaiveDateTime>,
}

// ==========================================
// HoldInfo - 扣留原因（仅在 held 期间存在）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldInfo {
    pub reason: String,
    pub details: Option<String>,
}

// ==========================================
// ContainerSummary - 列表视图行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub container: Container,
    pub plan_date: NaiveDate,
    pub supplier_name: Option<String>,
    pub import_country: String,
}
