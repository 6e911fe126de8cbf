// ==========================================
// 出口集装箱质检追踪系统 - 生产计划分配 API
// ==========================================
// 职责: 按配额与交付窗口创建计划及集装箱；计划/配额查询；附件引用
// 红线: 配额校验与写入在同一 IMMEDIATE 事务内，部分写入不可见
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::api::error::{ApiError, ApiResult};
use crate::api::tx::{with_read_tx, with_write_tx};
use crate::config::ConfigManager;
use crate::domain::capacity::CapacityQuota;
use crate::domain::plan::{Plan, PlanFile, PlanQuotaView, PlanWithContainers};
use crate::domain::types::PlanStatus;
use crate::engine::allocation_rules::{check_allocation, check_replacement};
use crate::engine::events::{
    AllocationEvent, AllocationEventPublisher, AllocationEventType, OptionalEventPublisher,
};
use crate::repository::capacity_request_repo::CapacityRequestRepository;
use crate::repository::container_repo::ContainerRepository;
use crate::repository::plan_repo::PlanRepository;

/// 分配事务的提交结果
struct AllocationCommit {
    result: PlanWithContainers,
    replaced: bool,
    first_for_actor: bool,
}

// ==========================================
// PlanApi - 生产计划分配 API
// ==========================================
pub struct PlanApi {
    conn: Arc<Mutex<Connection>>,
    plan_repo: Arc<PlanRepository>,
    config_manager: Arc<ConfigManager>,
    event_publisher: OptionalEventPublisher,
}

impl PlanApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        plan_repo: Arc<PlanRepository>,
        config_manager: Arc<ConfigManager>,
        event_publisher: Option<Arc<dyn AllocationEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            conn,
            plan_repo,
            config_manager,
            event_publisher,
        }
    }

    // ==========================================
    // 分配
    // ==========================================

    /// 为产能需求在指定日期创建计划及集装箱
    ///
    /// # 参数
    /// - request_id: 产能需求ID
    /// - actor_id: 操作人（供应商）
    /// - plan_date: 计划日期
    /// - container_count: 集装箱数量（> 0）
    ///
    /// # 返回
    /// - Ok(PlanWithContainers): 新计划及编号 1..n 的集装箱
    /// - Err(NotFound / InvalidState / OutOfWindow / QuotaExceeded / ValidationError / ReplacementBlocked)
    ///
    /// # 说明
    /// 同日期已有计划时整体替换；配额已用量包含被替换计划的集装箱
    pub fn allocate(
        &self,
        request_id: &str,
        actor_id: &str,
        plan_date: NaiveDate,
        container_count: i64,
    ) -> ApiResult<PlanWithContainers> {
        if actor_id.trim().is_empty() {
            return Err(ApiError::ValidationError("操作人不能为空".to_string()));
        }
        let block_replacement = self.config_manager.block_plan_replacement_after_qc()?;

        let commit = with_write_tx(&self.conn, |tx| {
            let request = CapacityRequestRepository::find_by_id_tx(tx, request_id)?
                .ok_or_else(|| ApiError::NotFound(format!("产能需求(id={})不存在", request_id)))?;

            let used = CapacityRequestRepository::count_allocated_containers_tx(tx, request_id)?;
            check_allocation(&request, plan_date, container_count, used)?;

            let prior_by_actor =
                PlanRepository::count_by_request_and_actor_tx(tx, request_id, actor_id)?;

            let mut replaced = false;
            if let Some(existing) =
                PlanRepository::find_by_request_and_date_tx(tx, request_id, plan_date)?
            {
                let activity = PlanRepository::activity_tx(tx, &existing.plan_id)?;
                check_replacement(activity.progressed_count, block_replacement)?;
                let removed = PlanRepository::delete_cascade_tx(tx, &existing.plan_id)?;
                tracing::info!(
                    request_id = %request_id,
                    plan_id = %existing.plan_id,
                    plan_date = %plan_date,
                    removed_containers = removed,
                    "同日期计划被替换"
                );
                replaced = true;
            }

            let now = chrono::Local::now().naive_local();
            let plan = Plan {
                plan_id: uuid::Uuid::new_v4().to_string(),
                request_id: request_id.to_string(),
                plan_date,
                status: PlanStatus::Submitted,
                created_by: actor_id.to_string(),
                created_at: now,
                updated_at: now,
            };
            PlanRepository::insert_tx(tx, &plan)?;
            let containers =
                ContainerRepository::insert_batch_tx(tx, &plan, container_count, actor_id, now)?;

            Ok(AllocationCommit {
                result: PlanWithContainers {
                    plan,
                    containers,
                    files: Vec::new(),
                },
                replaced,
                first_for_actor: prior_by_actor == 0,
            })
        })?;

        tracing::info!(
            request_id = %request_id,
            plan_id = %commit.result.plan.plan_id,
            plan_date = %plan_date,
            actor_id = %actor_id,
            container_count,
            replaced = commit.replaced,
            "计划分配完成"
        );

        self.publish_after_commit(&commit, actor_id, container_count);
        Ok(commit.result)
    }

    /// 提交后发布分配事件，失败只记录日志
    fn publish_after_commit(&self, commit: &AllocationCommit, actor_id: &str, container_count: i64) {
        let plan = &commit.result.plan;
        let base = AllocationEvent {
            event_type: if commit.replaced {
                AllocationEventType::PlanReplaced
            } else {
                AllocationEventType::PlanAllocated
            },
            request_id: plan.request_id.clone(),
            plan_id: plan.plan_id.clone(),
            plan_date: plan.plan_date,
            actor_id: actor_id.to_string(),
            container_count,
            occurred_at: plan.created_at,
        };

        let mut events = vec![base.clone()];
        if commit.first_for_actor {
            events.push(base.with_type(AllocationEventType::FirstPlanCreated));
        }

        for event in events {
            if let Err(e) = self.event_publisher.publish(&event) {
                tracing::warn!(
                    request_id = %event.request_id,
                    event_type = event.event_type.as_str(),
                    error = %e,
                    "分配事件发布失败"
                );
            }
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询需求下的全部计划（含集装箱、附件）及配额
    pub fn list_with_quota(&self, request_id: &str) -> ApiResult<PlanQuotaView> {
        with_read_tx(&self.conn, |tx| {
            let request = CapacityRequestRepository::find_by_id_tx(tx, request_id)?
                .ok_or_else(|| ApiError::NotFound(format!("产能需求(id={})不存在", request_id)))?;

            let used = CapacityRequestRepository::count_allocated_containers_tx(tx, request_id)?;
            let plans = PlanRepository::list_by_request_tx(tx, request_id)?
                .into_iter()
                .map(|plan| -> ApiResult<PlanWithContainers> {
                    let containers = ContainerRepository::list_by_plan_tx(tx, &plan.plan_id)?;
                    let files = PlanRepository::list_files_tx(tx, &plan.plan_id)?;
                    Ok(PlanWithContainers {
                        plan,
                        containers,
                        files,
                    })
                })
                .collect::<ApiResult<Vec<_>>>()?;

            Ok(PlanQuotaView {
                request_id: request.request_id,
                plans,
                quota: CapacityQuota::from_usage(request.container_amount, used),
            })
        })
    }

    /// 查询单个计划
    pub fn get_plan(&self, plan_id: &str) -> ApiResult<Plan> {
        self.plan_repo
            .find_by_id(plan_id)?
            .ok_or_else(|| ApiError::NotFound(format!("计划(id={})不存在", plan_id)))
    }

    // ==========================================
    // 附件
    // ==========================================

    /// 记录计划附件引用（文件本体由外部存储管理）
    ///
    /// # 参数
    /// - container_id: 可选，附件关联的集装箱，必须属于该计划
    pub fn attach_file(
        &self,
        plan_id: &str,
        container_id: Option<i64>,
        file_name: &str,
        storage_key: &str,
        uploaded_by: &str,
    ) -> ApiResult<PlanFile> {
        if file_name.trim().is_empty() || storage_key.trim().is_empty() {
            return Err(ApiError::ValidationError(
                "文件名与存储键不能为空".to_string(),
            ));
        }
        if uploaded_by.trim().is_empty() {
            return Err(ApiError::ValidationError("上传人不能为空".to_string()));
        }

        let file = with_write_tx(&self.conn, |tx| {
            if PlanRepository::find_by_id_tx(tx, plan_id)?.is_none() {
                return Err(ApiError::NotFound(format!("计划(id={})不存在", plan_id)));
            }
            if let Some(cid) = container_id {
                let containers = ContainerRepository::list_by_plan_tx(tx, plan_id)?;
                if !containers.iter().any(|c| c.container_id == cid) {
                    return Err(ApiError::ValidationError(format!(
                        "集装箱 {} 不属于计划 {}",
                        cid, plan_id
                    )));
                }
            }

            let file = PlanFile {
                file_id: uuid::Uuid::new_v4().to_string(),
                plan_id: plan_id.to_string(),
                container_id,
                file_name: file_name.trim().to_string(),
                storage_key: storage_key.trim().to_string(),
                uploaded_by: uploaded_by.to_string(),
                created_at: chrono::Local::now().naive_local(),
            };
            PlanRepository::insert_file_tx(tx, &file)?;
            Ok(file)
        })?;

        tracing::info!(plan_id = %plan_id, file_id = %file.file_id, "计划附件已登记");
        Ok(file)
    }
}
