// ==========================================
// 出口集装箱质检追踪系统 - 分配事件发布
// ==========================================
// 职责: 定义分配事件发布 trait，实现依赖倒置
// 说明: API 层只发布事件，需求生命周期等下游由 app 层适配器实现
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 分配事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationEventType {
    /// 新建计划
    PlanAllocated,
    /// 同日期计划被替换
    PlanReplaced,
    /// 操作人在该需求下的首个计划
    FirstPlanCreated,
}

impl AllocationEventType {
    pub fn as_str(&self) -> &str {
        match self {
            AllocationEventType::PlanAllocated => "PlanAllocated",
            AllocationEventType::PlanReplaced => "PlanReplaced",
            AllocationEventType::FirstPlanCreated => "FirstPlanCreated",
        }
    }
}

/// 分配事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationEvent {
    pub event_type: AllocationEventType,
    pub request_id: String,
    pub plan_id: String,
    pub plan_date: NaiveDate,
    pub actor_id: String,
    pub container_count: i64,
    pub occurred_at: NaiveDateTime,
}

impl AllocationEvent {
    /// 以同一计划上下文派生另一类型的事件
    pub fn with_type(&self, event_type: AllocationEventType) -> Self {
        Self {
            event_type,
            ..self.clone()
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 分配事件发布者
///
/// 发布发生在写事务提交之后，失败只记录日志，不回滚分配
pub trait AllocationEventPublisher: Send + Sync {
    /// 发布分配事件
    ///
    /// # 返回
    /// - `Ok(true)`: 订阅方产生了写入
    /// - `Ok(false)`: 订阅方忽略了该事件
    fn publish(&self, event: &AllocationEvent) -> Result<bool, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl AllocationEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: &AllocationEvent) -> Result<bool, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - request_id={}, event_type={}",
            event.request_id,
            event.event_type.as_str()
        );
        Ok(false)
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn AllocationEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn AllocationEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn AllocationEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: &AllocationEvent) -> Result<bool, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - request_id={}, event_type={}",
                    event.request_id,
                    event.event_type.as_str()
                );
                Ok(false)
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn sample_event() -> AllocationEvent {
        AllocationEvent {
            event_type: AllocationEventType::PlanAllocated,
            request_id: "R1".to_string(),
            plan_id: "P1".to_string(),
            plan_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            actor_id: "S1".to_string(),
            container_count: 2,
            occurred_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    struct Recording(Mutex<Vec<AllocationEventType>>);

    impl AllocationEventPublisher for Recording {
        fn publish(&self, event: &AllocationEvent) -> Result<bool, Box<dyn Error + Send + Sync>> {
            self.0.lock().unwrap().push(event.event_type);
            Ok(true)
        }
    }

    #[test]
    fn test_with_type_keeps_context() {
        let event = sample_event().with_type(AllocationEventType::FirstPlanCreated);
        assert_eq!(event.event_type, AllocationEventType::FirstPlanCreated);
        assert_eq!(event.plan_id, "P1");
        assert_eq!(event.container_count, 2);
    }

    #[test]
    fn test_noop_publisher() {
        assert!(!NoOpEventPublisher.publish(&sample_event()).unwrap());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        assert!(!publisher.publish(&sample_event()).unwrap());
    }

    #[test]
    fn test_optional_publisher_forwards() {
        let recording = Arc::new(Recording(Mutex::new(Vec::new())));
        let publisher = OptionalEventPublisher::with_publisher(recording.clone());
        assert!(publisher.is_configured());

        assert!(publisher.publish(&sample_event()).unwrap());
        assert_eq!(
            recording.0.lock().unwrap().as_slice(),
            &[AllocationEventType::PlanAllocated]
        );
    }
}
