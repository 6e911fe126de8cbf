// ==========================================
// 出口集装箱质检追踪系统 - 执照范围校验（API 内部共用）
// ==========================================
// 顺序: 执照（AccessDenied）→ 集装箱存在（NotFound）→ 国别/需求状态（AccessDenied）
// ==========================================

use rusqlite::Connection;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::container::Container;
use crate::domain::types::LicenseKind;
use crate::engine::country_scope::{check_request, resolve_scope, LicenseScope};
use crate::engine::qc_transition::QcOperation;
use crate::repository::container_repo::{ContainerRepository, ScopedContainer};
use crate::repository::qc_license_repo::QcLicenseRepository;

/// 读取执照并解析国别范围
pub(crate) fn license_scope(
    conn: &Connection,
    license_id: &str,
    required: LicenseKind,
) -> ApiResult<LicenseScope> {
    let license = QcLicenseRepository::find_by_id_tx(conn, license_id)?
        .ok_or_else(|| ApiError::AccessDenied(format!("执照不存在: {}", license_id)))?;
    let scope = resolve_scope(&license, required).map_err(|denial| {
        tracing::warn!(license_id = %license_id, reason = %denial, "执照校验未通过");
        ApiError::from(denial)
    })?;
    Ok(scope)
}

/// 读取集装箱并校验其在执照范围内
pub(crate) fn container_in_scope(
    conn: &Connection,
    scope: &LicenseScope,
    container_id: i64,
) -> ApiResult<ScopedContainer> {
    let scoped = ContainerRepository::find_scoped_tx(conn, container_id)?
        .ok_or_else(|| container_not_found(container_id))?;
    check_request(scope, &scoped.import_country, scoped.request_status).map_err(|denial| {
        tracing::warn!(
            license_id = %scope.license_id,
            container_id,
            reason = %denial,
            "集装箱不在执照范围内"
        );
        ApiError::from(denial)
    })?;
    Ok(scoped)
}

/// 写入后重新读取集装箱
pub(crate) fn reload_container(conn: &Connection, container_id: i64) -> ApiResult<Container> {
    ContainerRepository::find_by_id_tx(conn, container_id)?
        .ok_or_else(|| container_not_found(container_id))
}

pub(crate) fn container_not_found(container_id: i64) -> ApiError {
    ApiError::NotFound(format!("集装箱(id={})不存在", container_id))
}

pub(crate) fn invalid_transition(container: &Container, op: QcOperation) -> ApiError {
    tracing::warn!(
        container_id = container.container_id,
        from = container.qc_status.as_str(),
        operation = op.as_str(),
        "质检状态守卫未通过"
    );
    ApiError::InvalidTransition {
        container_id: container.container_id,
        from: container.qc_status.as_str().to_string(),
        operation: op.as_str().to_string(),
    }
}
