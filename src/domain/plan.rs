// ==========================================
// 出口集装箱质检追踪系统 - 生产计划领域模型
// ==========================================
// 红线: 每个 (request_id, plan_date) 至多一个计划；
//       同日期重新提交为整体替换
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::capacity::CapacityQuota;
use crate::domain::container::Container;
use crate::domain::types::PlanStatus;

// ==========================================
// Plan - 生产计划
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub request_id: String,        // 所属产能需求
    pub plan_date: NaiveDate,      // 计划日期（无时间部分）
    pub status: PlanStatus,        // 管理审批状态
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// PlanFile - 计划附件引用
// ==========================================
// 文件本体由外部存储服务管理，这里只保存引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFile {
    pub file_id: String,
    pub plan_id: String,
    pub container_id: Option<i64>,
    pub file_name: String,
    pub storage_key: String,
    pub uploaded_by: String,
    pub created_at: NaiveDateTime,
}

// ==========================================
// PlanWithContainers - 计划及其集装箱
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanWithContainers {
    pub plan: Plan,
    pub containers: Vec<Container>,
    pub files: Vec<PlanFile>,
}

// ==========================================
// PlanQuotaView - 计划列表 + 配额
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanQuotaView {
    pub request_id: String,
    pub plans: Vec<PlanWithContainers>,
    pub quota: CapacityQuota,
}
