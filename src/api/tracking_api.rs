// ==========================================
// 出口集装箱质检追踪系统 - 追踪台账 API
// ==========================================
// 职责: 物流状态事件 upsert、最新状态/历史/追踪码查询、追踪码发放
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::notify::ContainerNotifier;
use crate::api::scope::container_not_found;
use crate::api::tx::with_write_tx;
use crate::config::ConfigManager;
use crate::domain::tracking::{TrackingLookup, TrackingStatus, TrackingWriteOutcome};
use crate::engine::notification::NotificationEventType;
use crate::engine::tracking_code::{generate_tracking_code, normalize_tracking_code};
use crate::i18n;
use crate::repository::container_repo::ContainerRepository;
use crate::repository::error::RepositoryError;
use crate::repository::tracking_repo::{TrackingEventWrite, TrackingRepository};

/// 追踪码冲突时的最大重试次数
const MAX_TRACKING_CODE_ATTEMPTS: usize = 5;

/// 返回集装箱已有追踪码，或分配一个新的全局唯一追踪码（事务内）
pub(crate) fn ensure_tracking_code_tx(
    conn: &Connection,
    container_id: i64,
    prefix: &str,
) -> ApiResult<String> {
    let container = ContainerRepository::find_by_id_tx(conn, container_id)?
        .ok_or_else(|| container_not_found(container_id))?;
    if let Some(code) = container.tracking_code {
        return Ok(code);
    }

    for attempt in 1..=MAX_TRACKING_CODE_ATTEMPTS {
        let code = generate_tracking_code(prefix);
        match ContainerRepository::assign_tracking_code_tx(conn, container_id, &code) {
            Ok(true) => {
                tracing::info!(container_id, tracking_code = %code, "追踪码已分配");
                return Ok(code);
            }
            Ok(false) => {
                // 同事务内已被赋值
                return ContainerRepository::find_by_id_tx(conn, container_id)?
                    .and_then(|c| c.tracking_code)
                    .ok_or_else(|| container_not_found(container_id));
            }
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                tracing::warn!(container_id, attempt, "追踪码冲突，重新生成");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::InternalError(format!(
        "追踪码分配失败: container_id={}, 重试 {} 次仍冲突",
        container_id, MAX_TRACKING_CODE_ATTEMPTS
    )))
}

// ==========================================
// TrackingApi - 追踪台账 API
// ==========================================
pub struct TrackingApi {
    conn: Arc<Mutex<Connection>>,
    tracking_repo: Arc<TrackingRepository>,
    config_manager: Arc<ConfigManager>,
    notifier: Arc<ContainerNotifier>,
}

impl TrackingApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        tracking_repo: Arc<TrackingRepository>,
        config_manager: Arc<ConfigManager>,
        notifier: Arc<ContainerNotifier>,
    ) -> Self {
        Self {
            conn,
            tracking_repo,
            config_manager,
            notifier,
        }
    }

    /// 记录物流状态事件
    ///
    /// # 参数
    /// - tracking_code: 可空；(container_id, tracking_code) 相同则原地更新，否则新增
    ///
    /// # 返回
    /// - Ok(outcome): kind=Created/Updated 及写入后的记录
    pub async fn record_event(
        &self,
        container_id: i64,
        actor_id: &str,
        status: &str,
        tracking_code: Option<&str>,
        note: Option<&str>,
    ) -> ApiResult<TrackingWriteOutcome> {
        let status = status.trim();
        if status.is_empty() {
            return Err(ApiError::ValidationError("追踪状态不能为空".to_string()));
        }
        if actor_id.trim().is_empty() {
            return Err(ApiError::ValidationError("操作人不能为空".to_string()));
        }
        let tracking_code = tracking_code.map(str::trim).filter(|c| !c.is_empty());

        let outcome = with_write_tx(&self.conn, |tx| {
            ContainerRepository::find_by_id_tx(tx, container_id)?
                .ok_or_else(|| container_not_found(container_id))?;

            let event = TrackingEventWrite {
                container_id,
                tracking_code,
                status,
                note,
                actor_id,
                now: chrono::Local::now().naive_local(),
            };
            Ok(TrackingRepository::upsert_tx(tx, &event)?)
        })?;

        tracing::info!(
            container_id,
            tracking_id = outcome.record.tracking_id,
            kind = ?outcome.kind,
            status = %status,
            "追踪事件已记录"
        );

        let id = container_id.to_string();
        let title = i18n::t_with_args(
            "notification.tracking_updated",
            &[("container_id", id.as_str()), ("status", status)],
        );
        self.notifier
            .notify(
                container_id,
                NotificationEventType::TrackingUpdated,
                title,
                json!({
                    "tracking_id": outcome.record.tracking_id,
                    "status": status,
                    "tracking_code": outcome.record.tracking_code,
                    "note": outcome.record.note,
                    "kind": outcome.kind,
                }),
            )
            .await;

        Ok(outcome)
    }

    /// 发放追踪码（已有则直接返回）
    pub fn issue_tracking_code(&self, container_id: i64) -> ApiResult<String> {
        let prefix = self.config_manager.tracking_code_prefix()?;
        with_write_tx(&self.conn, |tx| ensure_tracking_code_tx(tx, container_id, &prefix))
    }

    /// 每个集装箱最新的一条追踪事件
    pub fn latest_per_container(&self) -> ApiResult<Vec<TrackingStatus>> {
        Ok(self.tracking_repo.latest_per_container()?)
    }

    /// 单个集装箱的追踪事件（最新在前）
    pub fn history(&self, container_id: i64) -> ApiResult<Vec<TrackingStatus>> {
        Ok(self.tracking_repo.history(container_id)?)
    }

    /// 按追踪码查询（不区分大小写）
    pub fn find_by_code(&self, code: &str) -> ApiResult<TrackingLookup> {
        let code = normalize_tracking_code(code)
            .ok_or_else(|| ApiError::ValidationError("追踪码不能为空".to_string()))?;
        self.tracking_repo
            .find_by_code(&code)?
            .ok_or_else(|| ApiError::NotFound(format!("追踪码({})不存在", code)))
    }
}
