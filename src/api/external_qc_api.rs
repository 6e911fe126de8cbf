// ==========================================
// 出口集装箱质检追踪系统 - 外部质检确认 API
// ==========================================
// 守卫顺序: 执照（AccessDenied）→ 集装箱存在（NotFound）
//           → approved（InvalidState）→ 国别（AccessDenied）→ 未提交（AlreadyReported）
// 红线: 每个集装箱至多一份报告；提交不改变集装箱状态
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::notify::ContainerNotifier;
use crate::api::pagination::{Page, PageRequest};
use crate::api::scope::{container_not_found, license_scope};
use crate::api::tx::with_write_tx;
use crate::config::ConfigManager;
use crate::domain::container::ContainerSummary;
use crate::domain::qc::{ExternalQcReport, ExternalReportInput, ReportedContainer};
use crate::domain::types::{LicenseKind, QcStatus};
use crate::engine::country_scope::{country_matches, resolve_scope, LicenseScope};
use crate::engine::notification::NotificationEventType;
use crate::i18n;
use crate::repository::container_repo::{ContainerRepository, ScopedContainer};
use crate::repository::error::RepositoryError;
use crate::repository::external_qc_repo::ExternalQcRepository;
use crate::repository::qc_license_repo::QcLicenseRepository;

// ==========================================
// ExternalQcApi - 外部质检确认 API
// ==========================================
pub struct ExternalQcApi {
    conn: Arc<Mutex<Connection>>,
    container_repo: Arc<ContainerRepository>,
    report_repo: Arc<ExternalQcRepository>,
    license_repo: Arc<QcLicenseRepository>,
    config_manager: Arc<ConfigManager>,
    notifier: Arc<ContainerNotifier>,
}

impl ExternalQcApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        container_repo: Arc<ContainerRepository>,
        report_repo: Arc<ExternalQcRepository>,
        license_repo: Arc<QcLicenseRepository>,
        config_manager: Arc<ConfigManager>,
        notifier: Arc<ContainerNotifier>,
    ) -> Self {
        Self {
            conn,
            container_repo,
            report_repo,
            license_repo,
            config_manager,
            notifier,
        }
    }

    /// 提交外部质检报告
    ///
    /// # 参数
    /// - officer_license_id: 外部质检员执照
    /// - input: 实际数量及质量/包装/差异说明、附件
    ///
    /// # 返回
    /// - Ok(report): 新建的报告
    /// - Err(AccessDenied / NotFound / InvalidState / AlreadyReported / ValidationError)
    pub async fn submit_report(
        &self,
        container_id: i64,
        officer_license_id: &str,
        input: ExternalReportInput,
    ) -> ApiResult<ExternalQcReport> {
        if input.actual_quantity < 0 {
            return Err(ApiError::ValidationError(format!(
                "actual_quantity 不能为负数: {}",
                input.actual_quantity
            )));
        }

        let report = with_write_tx(&self.conn, |tx| {
            let scope = license_scope(tx, officer_license_id, LicenseKind::External)?;
            let scoped = ContainerRepository::find_scoped_tx(tx, container_id)?
                .ok_or_else(|| container_not_found(container_id))?;

            if scoped.container.qc_status != QcStatus::Approved {
                tracing::warn!(
                    container_id,
                    qc_status = scoped.container.qc_status.as_str(),
                    "外部报告被拒绝: 集装箱未放行"
                );
                return Err(ApiError::InvalidState(format!(
                    "只有已放行的集装箱可以提交外部报告: container_id={}, 当前状态={}",
                    container_id, scoped.container.qc_status
                )));
            }
            ensure_country(&scope, &scoped)?;

            if ExternalQcRepository::exists_for_container_tx(tx, container_id)? {
                return Err(ApiError::AlreadyReported(container_id));
            }

            let report = ExternalQcReport {
                report_id: uuid::Uuid::new_v4().to_string(),
                container_id,
                qc_license_id: officer_license_id.to_string(),
                actual_quantity: input.actual_quantity,
                quality_condition: trimmed(input.quality_condition),
                packaging_condition: trimmed(input.packaging_condition),
                discrepancies: trimmed(input.discrepancies),
                attachments: input
                    .attachments
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect(),
                confirmed_at: chrono::Local::now().naive_local(),
            };
            match ExternalQcRepository::insert_tx(tx, &report) {
                Ok(()) => Ok(report),
                Err(RepositoryError::UniqueConstraintViolation(_)) => {
                    Err(ApiError::AlreadyReported(container_id))
                }
                Err(e) => Err(e.into()),
            }
        })?;

        tracing::info!(
            container_id,
            license_id = %officer_license_id,
            report_id = %report.report_id,
            actual_quantity = report.actual_quantity,
            "外部质检报告已提交"
        );

        let id = container_id.to_string();
        let title = i18n::t_with_args("notification.external_reported", &[("container_id", id.as_str())]);
        self.notifier
            .notify(
                container_id,
                NotificationEventType::ExternalReportSubmitted,
                title,
                json!({
                    "report_id": report.report_id,
                    "actual_quantity": report.actual_quantity,
                    "discrepancies": report.discrepancies,
                }),
            )
            .await;

        Ok(report)
    }

    /// 外部质检工作队列：国别范围内已放行且未提交报告的集装箱
    pub fn list_approved_for_country(
        &self,
        officer_license_id: &str,
        page: PageRequest,
    ) -> ApiResult<Page<ContainerSummary>> {
        let scope = self.external_scope(officer_license_id)?;
        let (page_no, limit, offset) = self.resolve_page(page)?;
        let (items, total) = self
            .container_repo
            .list_approved_unreported(scope.country, limit, offset)?;
        Ok(Page {
            items,
            total,
            page: page_no,
            limit,
        })
    }

    /// 执照在国别范围内提交过的报告
    pub fn list_reported_by_officer(
        &self,
        officer_license_id: &str,
        page: PageRequest,
    ) -> ApiResult<Page<ReportedContainer>> {
        let scope = self.external_scope(officer_license_id)?;
        let (page_no, limit, offset) = self.resolve_page(page)?;
        let (items, total) = self.report_repo.list_by_license(
            &scope.license_id,
            scope.country,
            limit,
            offset,
        )?;
        Ok(Page {
            items,
            total,
            page: page_no,
            limit,
        })
    }

    /// 集装箱的外部报告（无则 None）
    pub fn find_report(&self, container_id: i64) -> ApiResult<Option<ExternalQcReport>> {
        Ok(self.report_repo.find_by_container(container_id)?)
    }

    fn external_scope(&self, license_id: &str) -> ApiResult<LicenseScope> {
        let license = self
            .license_repo
            .find_by_id(license_id)?
            .ok_or_else(|| ApiError::AccessDenied(format!("执照不存在: {}", license_id)))?;
        Ok(resolve_scope(&license, LicenseKind::External)?)
    }

    fn resolve_page(&self, page: PageRequest) -> ApiResult<(i64, i64, i64)> {
        Ok(page.resolve(
            self.config_manager.default_page_size()?,
            self.config_manager.max_page_size()?,
        ))
    }
}

/// 报告只校验国别，不要求需求仍为 accepted
fn ensure_country(scope: &LicenseScope, scoped: &ScopedContainer) -> ApiResult<()> {
    if country_matches(scope.country, &scoped.import_country) {
        return Ok(());
    }
    tracing::warn!(
        license_id = %scope.license_id,
        container_id = scoped.container.container_id,
        licensed = scope.country,
        import_country = %scoped.import_country,
        "外部报告被拒绝: 国别不匹配"
    );
    Err(ApiError::AccessDenied(format!(
        "执照国别 {} 与进口国 {} 不匹配",
        scope.country, scoped.import_country
    )))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
