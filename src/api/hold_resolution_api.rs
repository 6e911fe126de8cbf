// ==========================================
// 出口集装箱质检追踪系统 - 扣留处理 API
// ==========================================
// 前置: 集装箱当前为 held
// 动作: release_hold → approved（send_back_to_qc 时 qc_submitted）
//       request_reinspection → arrived（清空检验数据）
//       reject_container → rejected（终态）
// 红线: 处理记录只追加，previous_qc_status 固定为处理前快照
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde_json::json;

use crate::api::error::ApiResult;
use crate::api::notify::ContainerNotifier;
use crate::api::scope::{container_in_scope, invalid_transition, license_scope};
use crate::api::tx::with_write_tx;
use crate::domain::qc::{HoldResolution, HoldResolutionOutcome};
use crate::domain::status_history::StatusHistoryEntry;
use crate::domain::types::{LicenseKind, QcStatus, ResolutionAction};
use crate::engine::notification::NotificationEventType;
use crate::engine::qc_transition::{resolution_effect, QcOperation};
use crate::i18n;
use crate::repository::container_repo::ContainerRepository;
use crate::repository::hold_resolution_repo::HoldResolutionRepository;
use crate::repository::status_history_repo::StatusHistoryRepository;

// ==========================================
// HoldResolutionApi - 扣留处理 API
// ==========================================
pub struct HoldResolutionApi {
    conn: Arc<Mutex<Connection>>,
    resolution_repo: Arc<HoldResolutionRepository>,
    notifier: Arc<ContainerNotifier>,
}

impl HoldResolutionApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        resolution_repo: Arc<HoldResolutionRepository>,
        notifier: Arc<ContainerNotifier>,
    ) -> Self {
        Self {
            conn,
            resolution_repo,
            notifier,
        }
    }

    /// 处理扣留
    ///
    /// # 参数
    /// - action: 处理动作
    /// - note: 处理说明（可空）
    /// - resolver_license_id: 处理人执照（内部执照，范围校验同质检写入）
    /// - send_back_to_qc: 仅对 release_hold 生效，回到 qc_submitted 重新审核
    ///
    /// # 返回
    /// - Ok(outcome): 处理记录、新状态、是否重新进入质检流程
    /// - Err(AccessDenied / NotFound / InvalidTransition)
    pub async fn resolve_hold(
        &self,
        container_id: i64,
        action: ResolutionAction,
        note: Option<&str>,
        resolver_license_id: &str,
        send_back_to_qc: bool,
    ) -> ApiResult<HoldResolutionOutcome> {
        let note = note.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        let effect = resolution_effect(action, send_back_to_qc);

        let outcome = with_write_tx(&self.conn, |tx| {
            let scope = license_scope(tx, resolver_license_id, LicenseKind::Internal)?;
            let current = container_in_scope(tx, &scope, container_id)?.container;

            if current.qc_status != QcStatus::Held {
                return Err(invalid_transition(&current, QcOperation::ResolveHold));
            }

            let now = chrono::Local::now().naive_local();
            if !ContainerRepository::apply_resolution_tx(
                tx,
                container_id,
                effect.new_status,
                effect.clear_inspection,
                resolver_license_id,
                now,
            )? {
                return Err(invalid_transition(&current, QcOperation::ResolveHold));
            }

            let resolution = HoldResolution {
                resolution_id: uuid::Uuid::new_v4().to_string(),
                container_id,
                previous_qc_status: current.qc_status,
                resolution_action: action,
                resolution_note: note.clone(),
                resolved_by: resolver_license_id.to_string(),
                send_back_to_qc,
                resolved_at: now,
            };
            HoldResolutionRepository::insert_tx(tx, &resolution)?;

            let mut entry = StatusHistoryEntry::now(
                container_id,
                current.qc_status,
                effect.new_status,
                resolver_license_id,
                Some(json!({
                    "resolution_id": resolution.resolution_id,
                    "action": action.as_str(),
                    "note": resolution.resolution_note,
                    "send_back_to_qc": send_back_to_qc,
                    "hold_reason": current.hold.as_ref().map(|h| h.reason.clone()),
                })),
            );
            entry.action_ts = now;
            StatusHistoryRepository::insert_tx(tx, &entry)?;

            Ok(HoldResolutionOutcome {
                resolution,
                new_status: effect.new_status,
                reenters_qc: effect.reenters_qc,
            })
        })?;

        tracing::info!(
            container_id,
            license_id = %resolver_license_id,
            action = action.as_str(),
            to = outcome.new_status.as_str(),
            reenters_qc = outcome.reenters_qc,
            "扣留已处理"
        );

        let id = container_id.to_string();
        let title = i18n::t_with_args(
            "notification.hold_resolved",
            &[("container_id", id.as_str()), ("action", action.as_str())],
        );
        self.notifier
            .notify(
                container_id,
                NotificationEventType::HoldResolved,
                title,
                json!({
                    "resolution_id": outcome.resolution.resolution_id,
                    "action": action.as_str(),
                    "new_status": outcome.new_status.as_str(),
                    "reenters_qc": outcome.reenters_qc,
                    "note": outcome.resolution.resolution_note,
                }),
            )
            .await;

        Ok(outcome)
    }

    /// 集装箱的扣留处理记录（按时间顺序）
    pub fn list_resolutions(&self, container_id: i64) -> ApiResult<Vec<HoldResolution>> {
        Ok(self.resolution_repo.list_by_container(container_id)?)
    }
}
