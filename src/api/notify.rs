// ==========================================
// 出口集装箱质检追踪系统 - 集装箱事件通知
// ==========================================
// 接收人: 在岗管理员/经理 + 需求采购方（可解析时）
// 红线: 只在事务提交后调用；任何失败只记录日志
// ==========================================

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::engine::notification::{
    DispatchSummary, Notification, NotificationDispatcher, NotificationEventType,
};
use crate::repository::user_repo::UserRepository;

pub struct ContainerNotifier {
    user_repo: Arc<UserRepository>,
    dispatcher: NotificationDispatcher,
}

impl ContainerNotifier {
    pub fn new(user_repo: Arc<UserRepository>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            user_repo,
            dispatcher,
        }
    }

    /// 解析接收人并分发
    pub async fn notify(
        &self,
        container_id: i64,
        event_type: NotificationEventType,
        title: String,
        payload: JsonValue,
    ) -> DispatchSummary {
        let recipients = match self.recipients(container_id) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(container_id, error = %e, "通知接收人解析失败，跳过通知");
                return DispatchSummary::default();
            }
        };

        let notifications = Notification::fan_out(
            &recipients,
            event_type,
            &container_id.to_string(),
            &title,
            payload,
        );
        let summary = self.dispatcher.dispatch(notifications).await;
        tracing::debug!(
            container_id,
            event_type = event_type.as_str(),
            delivered = summary.delivered,
            failed = summary.failed,
            "通知分发完成"
        );
        summary
    }

    fn recipients(&self, container_id: i64) -> crate::repository::RepositoryResult<Vec<String>> {
        let mut recipients = self.user_repo.list_active_staff()?;
        if let Some(buyer) = self.user_repo.find_buyer_of_container(container_id)? {
            recipients.push(buyer);
        }
        Ok(recipients)
    }
}
