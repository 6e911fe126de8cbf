// ==========================================
// 出口集装箱质检追踪系统 - 分页
// ==========================================

use serde::{Deserialize, Serialize};

/// 分页请求（page 从 1 开始）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// 解析为 (page, limit, offset)
    ///
    /// 缺省 limit 取 default_size，超过 max_size 截断；page 小于 1 按 1 处理。
    /// 页码过大时 offset 饱和到 i64::MAX，查询返回空页
    pub fn resolve(&self, default_size: i64, max_size: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(default_size)
            .min(max_size.max(1));
        (page, limit, (page - 1).saturating_mul(limit))
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.limit <= 0 {
            return 0;
        }
        (self.total + self.limit - 1) / self.limit
    }
}
