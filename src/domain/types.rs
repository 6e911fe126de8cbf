// ==========================================
// 出口集装箱质检追踪系统 - 领域类型定义
// ==========================================
// 红线: 状态值为封闭枚举，在写入边界解析校验，
//       不依赖数据库 CHECK 约束
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 质检状态 (QC Status)
// ==========================================
// 主流程: pending → arrived → qc_submitted → approved
// 扣留:   qc_submitted → held → (扣留处理)
// 终态:   rejected（仅由扣留处理写入）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcStatus {
    Pending,     // 待到场
    Arrived,     // 已到场
    QcSubmitted, // 已提交检验
    Approved,    // 已放行
    Held,        // 已扣留
    Rejected,    // 已拒收
}

impl QcStatus {
    /// 全部状态（用于看板统计补零）
    pub const ALL: [QcStatus; 6] = [
        QcStatus::Pending,
        QcStatus::Arrived,
        QcStatus::QcSubmitted,
        QcStatus::Approved,
        QcStatus::Held,
        QcStatus::Rejected,
    ];

    /// 转换为数据库存储的字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            QcStatus::Pending => "pending",
            QcStatus::Arrived => "arrived",
            QcStatus::QcSubmitted => "qc_submitted",
            QcStatus::Approved => "approved",
            QcStatus::Held => "held",
            QcStatus::Rejected => "rejected",
        }
    }

    /// 从字符串解析（大小写不敏感）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(QcStatus::Pending),
            "arrived" => Some(QcStatus::Arrived),
            "qc_submitted" => Some(QcStatus::QcSubmitted),
            "approved" => Some(QcStatus::Approved),
            "held" => Some(QcStatus::Held),
            "rejected" => Some(QcStatus::Rejected),
            _ => None,
        }
    }

    /// 是否终态（不再接受任何质检动作）
    pub fn is_terminal(&self) -> bool {
        matches!(self, QcStatus::Rejected)
    }
}

impl fmt::Display for QcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 扣留处理动作 (Resolution Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    ReleaseHold,         // 解除扣留
    RequestReinspection, // 要求复检
    RejectContainer,     // 拒收
}

impl ResolutionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionAction::ReleaseHold => "release_hold",
            ResolutionAction::RequestReinspection => "request_reinspection",
            ResolutionAction::RejectContainer => "reject_container",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "release_hold" => Some(ResolutionAction::ReleaseHold),
            "request_reinspection" => Some(ResolutionAction::RequestReinspection),
            "reject_container" => Some(ResolutionAction::RejectContainer),
            _ => None,
        }
    }
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 生产计划状态 (Plan Status)
// ==========================================
// 仅为管理审批标记，不控制集装箱质检流程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Submitted, // 已提交
    Approved,  // 已批准
    Rejected,  // 已驳回
}

impl PlanStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PlanStatus::Submitted => "submitted",
            PlanStatus::Approved => "approved",
            PlanStatus::Rejected => "rejected",
        }
    }

    /// 从字符串解析状态（未知值回落为 submitted）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "approved" => PlanStatus::Approved,
            "rejected" => PlanStatus::Rejected,
            _ => PlanStatus::Submitted,
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 产能需求生命周期状态 (Request Status)
// ==========================================
// 外部实体，本核心只读；分配与质检均要求 accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,   // 待确认
    Accepted,  // 已接受
    Completed, // 已完成
    Cancelled, // 已取消
}

impl RequestStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// 从字符串解析状态（未知值回落为 pending，不会被视为 accepted）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "accepted" => RequestStatus::Accepted,
            "completed" => RequestStatus::Completed,
            "cancelled" => RequestStatus::Cancelled,
            _ => RequestStatus::Pending,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 质检执照类型 (License Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseKind {
    Internal, // 内部质检员
    External, // 进口国外部质检员
}

impl LicenseKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LicenseKind::Internal => "internal",
            LicenseKind::External => "external",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "internal" => Some(LicenseKind::Internal),
            "external" => Some(LicenseKind::External),
            _ => None,
        }
    }
}

impl fmt::Display for LicenseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}
