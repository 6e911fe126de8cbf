// ==========================================
// 出口集装箱质检追踪系统 - 质检执照国别范围规则
// ==========================================
// 职责: 执照 → 国别映射；集装箱所属需求是否在执照范围内
// 红线: Engine 不拼 SQL，拒绝必须给出原因
// ==========================================

use crate::domain::qc::QcLicense;
use crate::domain::types::{LicenseKind, RequestStatus};
use thiserror::Error;

/// 固定国别表（执照国别代码 → 进口国名称）
pub const COUNTRY_TABLE: [(&str, &str); 3] = [("OM", "Oman"), ("QA", "Qatar"), ("BA", "Bahrain")];

/// 范围拒绝原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeDenial {
    #[error("执照已停用: {license_id}")]
    LicenseInactive { license_id: String },

    #[error("执照类型不符: 需要 {required}, 实际 {actual}")]
    WrongLicenseKind { required: String, actual: String },

    #[error("执照缺少有效国别代码: {code:?}")]
    UnknownCountry { code: Option<String> },

    #[error("进口国不在执照范围内: 执照={licensed}, 需求={requested}")]
    CountryMismatch { licensed: String, requested: String },

    #[error("需求未处于已接受状态: {status}")]
    RequestNotAccepted { status: String },
}

/// 已解析的执照范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseScope {
    pub license_id: String,
    pub country: &'static str,
}

/// 国别代码映射（去空白，不区分大小写）
pub fn country_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    COUNTRY_TABLE
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// 进口国名称比较（去空白，不区分大小写）
pub fn country_matches(licensed: &str, import_country: &str) -> bool {
    licensed.trim().eq_ignore_ascii_case(import_country.trim())
}

/// 校验执照并解析国别范围
///
/// # 参数
/// - `license`: 调用方执照
/// - `required`: 操作要求的执照类型
pub fn resolve_scope(license: &QcLicense, required: LicenseKind) -> Result<LicenseScope, ScopeDenial> {
    if !license.is_active {
        return Err(ScopeDenial::LicenseInactive {
            license_id: license.license_id.clone(),
        });
    }
    if license.kind != required {
        return Err(ScopeDenial::WrongLicenseKind {
            required: required.to_db_str().to_string(),
            actual: license.kind.to_db_str().to_string(),
        });
    }
    let country = license
        .country_code
        .as_deref()
        .and_then(country_name)
        .ok_or_else(|| ScopeDenial::UnknownCountry {
            code: license.country_code.clone(),
        })?;

    Ok(LicenseScope {
        license_id: license.license_id.clone(),
        country,
    })
}

/// 校验需求的进口国与状态
pub fn check_request(
    scope: &LicenseScope,
    import_country: &str,
    request_status: RequestStatus,
) -> Result<(), ScopeDenial> {
    if !country_matches(scope.country, import_country) {
        return Err(ScopeDenial::CountryMismatch {
            licensed: scope.country.to_string(),
            requested: import_country.to_string(),
        });
    }
    if request_status != RequestStatus::Accepted {
        return Err(ScopeDenial::RequestNotAccepted {
            status: request_status.to_db_str().to_string(),
        });
    }
    Ok(())
}
