// ==========================================
// 出口集装箱质检追踪系统 - 需求生命周期适配器
// ==========================================
// 职责: 消费分配事件，回写产能需求的首个计划标记
// 依赖方向: Engine 定义 AllocationEventPublisher，此处实现
// ==========================================

use std::error::Error;
use std::sync::Arc;

use crate::engine::events::{AllocationEvent, AllocationEventPublisher, AllocationEventType};
use crate::repository::capacity_request_repo::CapacityRequestRepository;

pub struct RequestLifecycleAdapter {
    request_repo: Arc<CapacityRequestRepository>,
}

impl RequestLifecycleAdapter {
    pub fn new(request_repo: Arc<CapacityRequestRepository>) -> Self {
        Self { request_repo }
    }
}

impl AllocationEventPublisher for RequestLifecycleAdapter {
    /// 仅处理 FirstPlanCreated；标记已存在时不覆盖
    ///
    /// # 返回
    /// - Ok(true): 本次写入了标记
    /// - Ok(false): 非首个计划事件或标记已存在
    fn publish(&self, event: &AllocationEvent) -> Result<bool, Box<dyn Error + Send + Sync>> {
        if event.event_type != AllocationEventType::FirstPlanCreated {
            return Ok(false);
        }

        let written = self
            .request_repo
            .mark_first_plan_created(&event.request_id, event.occurred_at)?;
        if written {
            tracing::info!(
                request_id = %event.request_id,
                actor_id = %event.actor_id,
                "已记录首个计划创建时间"
            );
        } else {
            tracing::debug!(request_id = %event.request_id, "首个计划标记已存在，跳过");
        }
        Ok(written)
    }
}
