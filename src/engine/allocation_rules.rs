// ==========================================
// 出口集装箱质检追踪系统 - 产能分配规则
// ==========================================
// 职责: 分配前置校验（数量、需求状态、交付窗口、配额、替换保护）
// 红线: Engine 不拼 SQL，已用量由调用方在写事务内统计后传入
// ==========================================

use crate::domain::capacity::{CapacityQuota, CapacityRequest};
use crate::domain::types::RequestStatus;
use chrono::NaiveDate;
use thiserror::Error;

/// 分配拒绝原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationDenial {
    #[error("集装箱数量必须大于 0: {count}")]
    InvalidCount { count: i64 },

    #[error("需求未处于已接受状态: {status:?}")]
    RequestNotAccepted { status: RequestStatus },

    #[error("计划日期 {plan_date} 不在交付窗口内")]
    OutOfWindow {
        plan_date: NaiveDate,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },

    #[error("配额不足: 申请 {requested}, 已用 {used}, 总量 {total}")]
    QuotaExceeded { requested: i64, used: i64, total: i64 },

    #[error("计划已有 {progressed} 个集装箱进入质检/追踪流程，不允许替换")]
    ReplacementBlocked { progressed: i64 },
}

/// 分配前置校验
///
/// # 参数
/// - `request`: 产能需求
/// - `plan_date`: 计划日期
/// - `container_count`: 申请数量
/// - `used`: 当前已分配数量（含将被替换的计划）
///
/// # 返回
/// - Ok(quota): 分配前的配额快照
pub fn check_allocation(
    request: &CapacityRequest,
    plan_date: NaiveDate,
    container_count: i64,
    used: i64,
) -> Result<CapacityQuota, AllocationDenial> {
    if container_count <= 0 {
        return Err(AllocationDenial::InvalidCount {
            count: container_count,
        });
    }
    if !request.is_accepted() {
        return Err(AllocationDenial::RequestNotAccepted {
            status: request.status,
        });
    }

    let window = request.delivery_window();
    if window.is_constrained() && !window.contains(plan_date) {
        return Err(AllocationDenial::OutOfWindow {
            plan_date,
            start: window.start_date,
            end: window.end_date.or(window.deadline_date),
        });
    }

    let quota = CapacityQuota::from_usage(request.container_amount, used);
    if container_count > quota.remaining {
        return Err(AllocationDenial::QuotaExceeded {
            requested: container_count,
            used: quota.used,
            total: quota.total,
        });
    }

    Ok(quota)
}

/// 同日期计划替换保护
///
/// `block_after_qc` 关闭时总是允许替换
pub fn check_replacement(progressed: i64, block_after_qc: bool) -> Result<(), AllocationDenial> {
    if block_after_qc && progressed > 0 {
        return Err(AllocationDenial::ReplacementBlocked { progressed });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(amount: i64) -> CapacityRequest {
        CapacityRequest {
            request_id: "R1".to_string(),
            buyer_id: Some("B1".to_string()),
            container_amount: amount,
            start_date: Some(date(2025, 1, 1)),
            end_date: Some(date(2025, 1, 31)),
            deadline_date: None,
            import_country: "Oman".to_string(),
            status: RequestStatus::Accepted,
            farmer_accepted_at: None,
        }
    }

    #[test]
    fn test_allocation_within_quota() {
        let quota = check_allocation(&request(5), date(2025, 1, 10), 2, 3).unwrap();
        assert_eq!(quota.used, 3);
        assert_eq!(quota.remaining, 2);
    }

    #[test]
    fn test_quota_exceeded_reports_usage() {
        let err = check_allocation(&request(5), date(2025, 1, 10), 3, 3).unwrap_err();
        assert_eq!(
            err,
            AllocationDenial::QuotaExceeded {
                requested: 3,
                used: 3,
                total: 5
            }
        );
    }

    #[test]
    fn test_out_of_window() {
        let err = check_allocation(&request(5), date(2025, 2, 1), 1, 0).unwrap_err();
        assert!(matches!(err, AllocationDenial::OutOfWindow { .. }));

        assert!(check_allocation(&request(5), date(2025, 1, 1), 1, 0).is_ok());
        assert!(check_allocation(&request(5), date(2025, 1, 31), 1, 0).is_ok());
    }

    #[test]
    fn test_legacy_deadline_window() {
        let mut req = request(5);
        req.start_date = None;
        req.end_date = None;
        req.deadline_date = Some(date(2025, 3, 1));

        assert!(check_allocation(&req, date(2025, 3, 1), 1, 0).is_ok());
        assert!(matches!(
            check_allocation(&req, date(2025, 3, 2), 1, 0),
            Err(AllocationDenial::OutOfWindow { .. })
        ));
    }

    #[test]
    fn test_invalid_count_and_state() {
        assert!(matches!(
            check_allocation(&request(5), date(2025, 1, 10), 0, 0),
            Err(AllocationDenial::InvalidCount { count: 0 })
        ));

        let mut req = request(5);
        req.status = RequestStatus::Pending;
        assert!(matches!(
            check_allocation(&req, date(2025, 1, 10), 1, 0),
            Err(AllocationDenial::RequestNotAccepted { .. })
        ));
    }

    #[test]
    fn test_replacement_guard() {
        assert!(check_replacement(0, true).is_ok());
        assert!(check_replacement(2, false).is_ok());
        assert_eq!(
            check_replacement(1, true),
            Err(AllocationDenial::ReplacementBlocked { progressed: 1 })
        );
    }
}
