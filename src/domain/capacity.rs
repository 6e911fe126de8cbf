// ==========================================
// 出口集装箱质检追踪系统 - 产能需求领域模型
// ==========================================
// CapacityRequest 为外部实体（采购方需求），本核心只读，
// 唯一回写为“首个计划已创建”标记
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::RequestStatus;

// ==========================================
// CapacityRequest - 采购方产能需求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityRequest {
    pub request_id: String,
    pub buyer_id: Option<String>,
    pub container_amount: i64,                    // 集装箱总配额
    pub start_date: Option<NaiveDate>,            // 交付窗口开始（含）
    pub end_date: Option<NaiveDate>,              // 交付窗口结束（含）
    pub deadline_date: Option<NaiveDate>,         // 旧版单日期窗口
    pub import_country: String,                   // 进口国（质检国别范围）
    pub status: RequestStatus,
    pub farmer_accepted_at: Option<NaiveDateTime>, // 首个计划创建标记
}

impl CapacityRequest {
    /// 交付窗口
    pub fn delivery_window(&self) -> DeliveryWindow {
        DeliveryWindow {
            start_date: self.start_date,
            end_date: self.end_date,
            deadline_date: self.deadline_date,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == RequestStatus::Accepted
    }
}

// ==========================================
// DeliveryWindow - 交付窗口
// ==========================================
// 缺省边界表示不受约束
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub deadline_date: Option<NaiveDate>,
}

impl DeliveryWindow {
    /// 是否定义了任何边界
    pub fn is_constrained(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.deadline_date.is_some()
    }

    /// 日期是否落在窗口内（闭区间）
    ///
    /// start/end 任一存在时按区间判断；否则回落到旧版 deadline（plan_date <= deadline）
    pub fn contains(&self, date: NaiveDate) -> bool {
        if self.start_date.is_some() || self.end_date.is_some() {
            let after_start = self.start_date.map_or(true, |s| date >= s);
            let before_end = self.end_date.map_or(true, |e| date <= e);
            return after_start && before_end;
        }
        self.deadline_date.map_or(true, |d| date <= d)
    }
}

// ==========================================
// CapacityQuota - 配额使用情况
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityQuota {
    pub used: i64,
    pub remaining: i64,
    pub total: i64,
}

impl CapacityQuota {
    /// 由总配额与已用数量计算（remaining 不低于 0）
    pub fn from_usage(total: i64, used: i64) -> Self {
        Self {
            used,
            remaining: (total - used).max(0),
            total,
        }
    }
}
