// ==========================================
// 出口集装箱质检追踪系统 - 内部质检状态机 API
// ==========================================
// 迁移: pending → arrived → qc_submitted → approved | held
// 红线: 每次写入在 IMMEDIATE 事务内重读状态，UPDATE 携带期望状态谓词；
//       并发竞争的失败方得到 InvalidTransition
// 审计: 每次迁移追加 container_status_history
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::notify::ContainerNotifier;
use crate::api::pagination::{Page, PageRequest};
use crate::api::scope::{container_in_scope, invalid_transition, license_scope, reload_container};
use crate::api::tracking_api::ensure_tracking_code_tx;
use crate::config::ConfigManager;
use crate::domain::container::{ArrivalInfo, Container, ContainerSummary, HoldInfo, InspectionInfo};
use crate::domain::status_history::StatusHistoryEntry;
use crate::domain::types::{LicenseKind, QcStatus};
use crate::engine::country_scope::resolve_scope;
use crate::engine::notification::NotificationEventType;
use crate::engine::qc_transition::{forward_target, QcOperation};
use crate::i18n;
use crate::repository::container_repo::{ContainerQuery, ContainerRepository, ContainerSortColumn};
use crate::repository::qc_license_repo::QcLicenseRepository;
use crate::repository::status_history_repo::StatusHistoryRepository;

// ==========================================
// 列表查询参数与结果
// ==========================================

/// 集装箱列表过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerListFilter {
    pub qc_status: Option<QcStatus>,
    /// 匹配集装箱序号、追踪码或数字ID
    pub search: Option<String>,
    /// 供应商名称（模糊匹配）
    pub supplier: Option<String>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    /// 排序字段（白名单），缺省按 container_id
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_desc: bool,
}

/// 单个状态的计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: QcStatus,
    pub count: i64,
}

/// 列表结果 + 看板计数（计数忽略状态过滤，其余过滤生效）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerListResult {
    pub page: Page<ContainerSummary>,
    pub status_counts: Vec<StatusCount>,
}

impl ContainerListResult {
    pub fn count_of(&self, status: QcStatus) -> i64 {
        self.status_counts
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

// ==========================================
// QcApi - 内部质检 API
// ==========================================
pub struct QcApi {
    conn: Arc<Mutex<Connection>>,
    container_repo: Arc<ContainerRepository>,
    license_repo: Arc<QcLicenseRepository>,
    status_history_repo: Arc<StatusHistoryRepository>,
    config_manager: Arc<ConfigManager>,
    notifier: Arc<ContainerNotifier>,
}

impl QcApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        container_repo: Arc<ContainerRepository>,
        license_repo: Arc<QcLicenseRepository>,
        status_history_repo: Arc<StatusHistoryRepository>,
        config_manager: Arc<ConfigManager>,
        notifier: Arc<ContainerNotifier>,
    ) -> Self {
        Self {
            conn,
            container_repo,
            license_repo,
            status_history_repo,
            config_manager,
            notifier,
        }
    }

    // ==========================================
    // 状态迁移
    // ==========================================

    /// 登记到场（pending → arrived）
    ///
    /// # 参数
    /// - arrived_at: 到场时间，缺省为当前时间
    /// - place: 到场地点
    ///
    /// # 说明
    /// 尚无追踪码时同事务分配一个
    pub fn mark_arrived(
        &self,
        license_id: &str,
        container_id: i64,
        arrived_at: Option<NaiveDateTime>,
        place: &str,
    ) -> ApiResult<Container> {
        let place = place.trim();
        if place.is_empty() {
            return Err(ApiError::ValidationError("到场地点不能为空".to_string()));
        }
        let prefix = self.config_manager.tracking_code_prefix()?;

        let container = self.transition(license_id, container_id, QcOperation::MarkArrived, |tx, current, now| {
            let arrival = ArrivalInfo {
                arrived_at: arrived_at.unwrap_or(now),
                place: place.to_string(),
            };
            if !ContainerRepository::mark_arrived_tx(tx, container_id, &arrival, license_id, now)? {
                return Err(invalid_transition(current, QcOperation::MarkArrived));
            }
            let code = ensure_tracking_code_tx(tx, container_id, &prefix)?;
            Ok(Some(json!({
                "arrived_at": crate::repository::sql_support::fmt_datetime(&arrival.arrived_at),
                "place": arrival.place,
                "tracking_code": code,
            })))
        })?;

        Ok(container)
    }

    /// 提交检验数据（arrived → qc_submitted）
    ///
    /// 检验数据已存在时返回 AlreadySubmitted
    pub fn start_inspection(
        &self,
        license_id: &str,
        container_id: i64,
        info: InspectionInfo,
    ) -> ApiResult<Container> {
        info.validate().map_err(ApiError::ValidationError)?;
        let payload = serde_json::to_value(&info)
            .map_err(|e| ApiError::ValidationError(format!("检验数据序列化失败: {}", e)))?;

        self.transition(license_id, container_id, QcOperation::StartInspection, |tx, current, now| {
            if !ContainerRepository::submit_inspection_tx(tx, container_id, &info, license_id, now)? {
                let latest = reload_container(tx, container_id)?;
                if latest.inspection.is_some() {
                    return Err(ApiError::AlreadySubmitted(container_id));
                }
                return Err(invalid_transition(current, QcOperation::StartInspection));
            }
            Ok(Some(payload))
        })
    }

    /// 放行（qc_submitted → approved）
    pub fn clear(&self, license_id: &str, container_id: i64) -> ApiResult<Container> {
        self.transition(license_id, container_id, QcOperation::Clear, |tx, current, now| {
            if !ContainerRepository::approve_tx(tx, container_id, license_id, now)? {
                return Err(invalid_transition(current, QcOperation::Clear));
            }
            Ok(None)
        })
    }

    /// 扣留（qc_submitted → held），提交后通知管理员与采购方
    pub async fn hold(
        &self,
        license_id: &str,
        container_id: i64,
        reason: &str,
        details: Option<&str>,
    ) -> ApiResult<Container> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::ValidationError("扣留原因不能为空".to_string()));
        }
        let hold = HoldInfo {
            reason: reason.to_string(),
            details: details.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
        };

        let container = self.transition(license_id, container_id, QcOperation::Hold, |tx, current, now| {
            if !ContainerRepository::hold_tx(tx, container_id, &hold, license_id, now)? {
                return Err(invalid_transition(current, QcOperation::Hold));
            }
            Ok(Some(json!({ "reason": hold.reason, "details": hold.details })))
        })?;

        let id = container_id.to_string();
        let title = i18n::t_with_args(
            "notification.container_held",
            &[("container_id", id.as_str()), ("reason", reason)],
        );
        self.notifier
            .notify(
                container_id,
                NotificationEventType::ContainerHeld,
                title,
                json!({ "reason": reason, "details": hold.details, "license_id": license_id }),
            )
            .await;

        Ok(container)
    }

    /// 通用迁移骨架：执照 → 集装箱 → 状态守卫 → 写入 → 历史 → 重读
    ///
    /// `apply` 执行条件 UPDATE 并返回历史载荷；返回 Err 时整个事务回滚
    fn transition<F>(
        &self,
        license_id: &str,
        container_id: i64,
        op: QcOperation,
        apply: F,
    ) -> ApiResult<Container>
    where
        F: FnOnce(&Transaction<'_>, &Container, NaiveDateTime) -> ApiResult<Option<serde_json::Value>>,
    {
        let container = crate::api::tx::with_write_tx(&self.conn, |tx| {
            let scope = license_scope(tx, license_id, LicenseKind::Internal)?;
            let scoped = container_in_scope(tx, &scope, container_id)?;
            let current = scoped.container;

            if op == QcOperation::StartInspection && current.inspection.is_some() {
                return Err(ApiError::AlreadySubmitted(container_id));
            }
            let target =
                forward_target(op, current.qc_status).ok_or_else(|| invalid_transition(&current, op))?;

            let now = chrono::Local::now().naive_local();
            let payload = apply(tx, &current, now)?;

            let mut entry =
                StatusHistoryEntry::now(container_id, current.qc_status, target, license_id, payload);
            entry.action_ts = now;
            StatusHistoryRepository::insert_tx(tx, &entry)?;

            reload_container(tx, container_id)
        })?;

        tracing::info!(
            container_id,
            license_id = %license_id,
            operation = op.as_str(),
            to = container.qc_status.as_str(),
            "质检状态已迁移"
        );
        Ok(container)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 执照范围内的集装箱详情
    pub fn get_container(&self, license_id: &str, container_id: i64) -> ApiResult<Container> {
        crate::api::tx::with_read_tx(&self.conn, |tx| {
            let scope = license_scope(tx, license_id, LicenseKind::Internal)?;
            Ok(container_in_scope(tx, &scope, container_id)?.container)
        })
    }

    /// 集装箱的质检状态轨迹
    pub fn status_history(
        &self,
        license_id: &str,
        container_id: i64,
    ) -> ApiResult<Vec<StatusHistoryEntry>> {
        self.get_container(license_id, container_id)?;
        Ok(self.status_history_repo.list_by_container(container_id)?)
    }

    /// 执照范围内的集装箱列表 + 按状态计数
    pub fn list_containers(
        &self,
        license_id: &str,
        filter: &ContainerListFilter,
        page: PageRequest,
    ) -> ApiResult<ContainerListResult> {
        let license = self
            .license_repo
            .find_by_id(license_id)?
            .ok_or_else(|| ApiError::AccessDenied(format!("执照不存在: {}", license_id)))?;
        let scope = resolve_scope(&license, LicenseKind::Internal)?;

        let sort_by = match filter.sort_by.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => ContainerSortColumn::from_str(raw)
                .ok_or_else(|| ApiError::ValidationError(format!("不支持的排序字段: {}", raw)))?,
            None => ContainerSortColumn::ContainerId,
        };
        if let (Some(from), Some(to)) = (filter.created_from, filter.created_to) {
            if from > to {
                return Err(ApiError::ValidationError(format!(
                    "创建日期范围无效: {} > {}",
                    from, to
                )));
            }
        }

        let (page_no, limit, offset) = page.resolve(
            self.config_manager.default_page_size()?,
            self.config_manager.max_page_size()?,
        );

        let query = ContainerQuery {
            country: scope.country.to_string(),
            qc_status: filter.qc_status,
            search: filter.search.clone(),
            supplier: filter.supplier.clone(),
            created_from: filter.created_from,
            created_to: filter.created_to,
            sort_by,
            sort_desc: filter.sort_desc,
            limit,
            offset,
        };

        let (items, total) = self.container_repo.list_scoped(&query)?;
        let counts = self.container_repo.count_by_status_scoped(&query)?;
        let status_counts = QcStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: counts.get(status).copied().unwrap_or(0),
            })
            .collect();

        Ok(ContainerListResult {
            page: Page {
                items,
                total,
                page: page_no,
                limit,
            },
            status_counts,
        })
    }
}
