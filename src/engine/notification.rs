// ==========================================
// 出口集装箱质检追踪系统 - 通知分发
// ==========================================
// 职责: 定义通知出口 trait，并发分发（settle-all）
// 红线: 通知在写事务提交之后发送，失败只记录日志，不向调用方传播
// ==========================================

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 通知事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEventType {
    ContainerHeld,
    HoldResolved,
    ExternalReportSubmitted,
    TrackingUpdated,
}

impl NotificationEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEventType::ContainerHeld => "container_held",
            NotificationEventType::HoldResolved => "hold_resolved",
            NotificationEventType::ExternalReportSubmitted => "external_report_submitted",
            NotificationEventType::TrackingUpdated => "tracking_updated",
        }
    }
}

/// 单条通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: String,
    pub event_type: NotificationEventType,
    pub related_id: String,
    pub title: String,
    pub payload: JsonValue,
}

impl Notification {
    /// 同一内容发给多个接收人（按出现顺序去重）
    pub fn fan_out(
        recipients: &[String],
        event_type: NotificationEventType,
        related_id: &str,
        title: &str,
        payload: JsonValue,
    ) -> Vec<Notification> {
        let mut seen = std::collections::HashSet::new();
        recipients
            .iter()
            .filter(|r| !r.trim().is_empty() && seen.insert(r.as_str()))
            .map(|recipient| Notification {
                recipient_id: recipient.clone(),
                event_type,
                related_id: related_id.to_string(),
                title: title.to_string(),
                payload: payload.clone(),
            })
            .collect()
    }
}

// ==========================================
// NotificationSink Trait
// ==========================================
// 实现者: 宿主应用的消息/推送通道
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 分发结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

// ==========================================
// NotificationDispatcher - 通知分发器
// ==========================================
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    sink: Option<Arc<dyn NotificationSink>>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// 不发送任何通知
    pub fn none() -> Self {
        Self { sink: None }
    }

    /// 并发发送全部通知，等待全部完成
    pub async fn dispatch(&self, notifications: Vec<Notification>) -> DispatchSummary {
        let Some(sink) = &self.sink else {
            tracing::debug!(count = notifications.len(), "未配置通知出口，跳过通知");
            return DispatchSummary::default();
        };

        let results = join_all(notifications.iter().map(|n| sink.notify(n))).await;

        let mut summary = DispatchSummary::default();
        for (notification, result) in notifications.iter().zip(results) {
            match result {
                Ok(()) => summary.delivered += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        recipient = %notification.recipient_id,
                        event_type = notification.event_type.as_str(),
                        related_id = %notification.related_id,
                        error = %e,
                        "通知发送失败"
                    );
                }
            }
        }
        summary
    }
}

// ==========================================
// RecordingNotificationSink - 内存通知出口
// ==========================================
// 用于测试与本地运行，可指定对某些接收人返回失败
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<Notification>>,
    failing_recipients: Vec<String>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing_recipients: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// 已成功发送的通知快照
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.failing_recipients.contains(&notification.recipient_id) {
            return Err(format!("接收人不可达: {}", notification.recipient_id).into());
        }
        self.sent
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recipients(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fan_out_dedupes_recipients() {
        let list = Notification::fan_out(
            &recipients(&["A1", "B1", "A1", " "]),
            NotificationEventType::TrackingUpdated,
            "7",
            "title",
            json!({"status": "shipped"}),
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].recipient_id, "A1");
        assert_eq!(list[1].recipient_id, "B1");
    }

    #[tokio::test]
    async fn test_dispatch_settles_all() {
        let sink = Arc::new(RecordingNotificationSink::failing_for(&["B1"]));
        let dispatcher = NotificationDispatcher::new(sink.clone());

        let list = Notification::fan_out(
            &recipients(&["A1", "B1", "M1"]),
            NotificationEventType::ContainerHeld,
            "7",
            "title",
            json!({}),
        );
        let summary = dispatcher.dispatch(list).await;

        assert_eq!(summary, DispatchSummary { delivered: 2, failed: 1 });
        let sent: Vec<String> = sink.sent().into_iter().map(|n| n.recipient_id).collect();
        assert_eq!(sent, vec!["A1".to_string(), "M1".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_without_sink() {
        let summary = NotificationDispatcher::none()
            .dispatch(vec![Notification {
                recipient_id: "A1".to_string(),
                event_type: NotificationEventType::HoldResolved,
                related_id: "1".to_string(),
                title: String::new(),
                payload: json!(null),
            }])
            .await;
        assert_eq!(summary, DispatchSummary::default());
    }
}
