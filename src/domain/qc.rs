// ==========================================
// 出口集装箱质检追踪系统 - 质检执照/报告/扣留处理模型
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::container::ContainerSummary;
use crate::domain::types::{LicenseKind, QcStatus, ResolutionAction};

// ==========================================
// QcLicense - 质检执照（外部实体）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcLicense {
    pub license_id: String,
    pub assigned_to: String,          // 持证质检员
    pub country_code: Option<String>, // 国别代码（OM/QA/BA）
    pub kind: LicenseKind,
    pub is_active: bool,
}

// ==========================================
// ExternalQcReport - 外部质检确认报告
// ==========================================
// 每个集装箱至多一份，创建后不可修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalQcReport {
    pub report_id: String,
    pub container_id: i64,
    pub qc_license_id: String,
    pub actual_quantity: i64,
    pub quality_condition: Option<String>,
    pub packaging_condition: Option<String>,
    pub discrepancies: Option<String>,
    pub attachments: Vec<String>,
    pub confirmed_at: NaiveDateTime,
}

/// 已提交外部报告的集装箱（报告 + 集装箱概要）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedContainer {
    pub report: ExternalQcReport,
    pub summary: ContainerSummary,
}

/// 外部质检报告录入参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalReportInput {
    pub actual_quantity: i64,
    pub quality_condition: Option<String>,
    pub packaging_condition: Option<String>,
    pub discrepancies: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

// ==========================================
// HoldResolution - 扣留处理记录（只追加）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldResolution {
    pub resolution_id: String,
    pub container_id: i64,
    pub previous_qc_status: QcStatus, // 处理前状态快照
    pub resolution_action: ResolutionAction,
    pub resolution_note: Option<String>,
    pub resolved_by: String,
    pub send_back_to_qc: bool,
    pub resolved_at: NaiveDateTime,
}

/// 扣留处理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldResolutionOutcome {
    pub resolution: HoldResolution,
    pub new_status: QcStatus,
    /// 集装箱是否重新进入质检流程
    pub reenters_qc: bool,
}
