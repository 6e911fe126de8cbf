// ==========================================
// 出口集装箱质检追踪系统 - 质检状态迁移表
// ==========================================
// 红线: 只能沿迁移表前进，回退只经由扣留处理
// 说明: 这里只做内存判定，持久化时仍以条件 UPDATE 兜底并发
// ==========================================

use crate::domain::types::{QcStatus, ResolutionAction};
use serde::{Deserialize, Serialize};

/// 质检操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcOperation {
    MarkArrived,
    StartInspection,
    Clear,
    Hold,
    ResolveHold,
}

impl QcOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcOperation::MarkArrived => "mark_arrived",
            QcOperation::StartInspection => "start_inspection",
            QcOperation::Clear => "clear",
            QcOperation::Hold => "hold",
            QcOperation::ResolveHold => "resolve_hold",
        }
    }

    /// 操作要求的当前状态
    pub fn required_status(&self) -> QcStatus {
        match self {
            QcOperation::MarkArrived => QcStatus::Pending,
            QcOperation::StartInspection => QcStatus::Arrived,
            QcOperation::Clear | QcOperation::Hold => QcStatus::QcSubmitted,
            QcOperation::ResolveHold => QcStatus::Held,
        }
    }
}

/// 正向迁移目标状态；不满足守卫返回 None
///
/// ResolveHold 的目标取决于处理动作，见 [`resolution_effect`]
pub fn forward_target(op: QcOperation, current: QcStatus) -> Option<QcStatus> {
    if current != op.required_status() {
        return None;
    }
    match op {
        QcOperation::MarkArrived => Some(QcStatus::Arrived),
        QcOperation::StartInspection => Some(QcStatus::QcSubmitted),
        QcOperation::Clear => Some(QcStatus::Approved),
        QcOperation::Hold => Some(QcStatus::Held),
        QcOperation::ResolveHold => None,
    }
}

/// 扣留处理效果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionEffect {
    pub new_status: QcStatus,
    /// 清空检验数据，允许重新提交检验
    pub clear_inspection: bool,
    /// 集装箱重新进入质检流程
    pub reenters_qc: bool,
}

/// 扣留处理动作 → 新状态
pub fn resolution_effect(action: ResolutionAction, send_back_to_qc: bool) -> ResolutionEffect {
    match action {
        ResolutionAction::ReleaseHold if send_back_to_qc => ResolutionEffect {
            new_status: QcStatus::QcSubmitted,
            clear_inspection: false,
            reenters_qc: true,
        },
        ResolutionAction::ReleaseHold => ResolutionEffect {
            new_status: QcStatus::Approved,
            clear_inspection: false,
            reenters_qc: false,
        },
        ResolutionAction::RequestReinspection => ResolutionEffect {
            new_status: QcStatus::Arrived,
            clear_inspection: true,
            reenters_qc: true,
        },
        ResolutionAction::RejectContainer => ResolutionEffect {
            new_status: QcStatus::Rejected,
            clear_inspection: false,
            reenters_qc: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_edges() {
        assert_eq!(forward_target(QcOperation::MarkArrived, QcStatus::Pending), Some(QcStatus::Arrived));
        assert_eq!(
            forward_target(QcOperation::StartInspection, QcStatus::Arrived),
            Some(QcStatus::QcSubmitted)
        );
        assert_eq!(forward_target(QcOperation::Clear, QcStatus::QcSubmitted), Some(QcStatus::Approved));
        assert_eq!(forward_target(QcOperation::Hold, QcStatus::QcSubmitted), Some(QcStatus::Held));
    }

    #[test]
    fn test_no_skipping_states() {
        for status in QcStatus::ALL {
            for op in [
                QcOperation::MarkArrived,
                QcOperation::StartInspection,
                QcOperation::Clear,
                QcOperation::Hold,
            ] {
                let allowed = forward_target(op, status).is_some();
                assert_eq!(allowed, status == op.required_status(), "{:?} on {:?}", op, status);
            }
        }
        assert_eq!(forward_target(QcOperation::Clear, QcStatus::Pending), None);
        assert_eq!(forward_target(QcOperation::MarkArrived, QcStatus::Rejected), None);
    }

    #[test]
    fn test_resolution_effects() {
        let release = resolution_effect(ResolutionAction::ReleaseHold, false);
        assert_eq!(release.new_status, QcStatus::Approved);
        assert!(!release.reenters_qc);

        let release_back = resolution_effect(ResolutionAction::ReleaseHold, true);
        assert_eq!(release_back.new_status, QcStatus::QcSubmitted);
        assert!(release_back.reenters_qc);

        for send_back in [true, false] {
            let reinspect = resolution_effect(ResolutionAction::RequestReinspection, send_back);
            assert_eq!(reinspect.new_status, QcStatus::Arrived);
            assert!(reinspect.clear_inspection);
        }

        let reject = resolution_effect(ResolutionAction::RejectContainer, true);
        assert_eq!(reject.new_status, QcStatus::Rejected);
        assert!(reject.new_status.is_terminal());
    }
}
