// ==========================================
// 出口集装箱质检追踪系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换 Repository/Engine 错误为带结构化上下文的业务错误
// 红线: 所有错误必须同步返回调用方，不允许吞掉（通知失败除外）
// ==========================================

use crate::engine::allocation_rules::AllocationDenial;
use crate::engine::country_scope::ScopeDenial;
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无权操作: {0}")]
    AccessDenied(String),

    #[error("无效的状态转换: container_id={container_id}, 当前状态={from}, 操作={operation}")]
    InvalidTransition {
        container_id: i64,
        from: String,
        operation: String,
    },

    #[error("状态不允许该操作: {0}")]
    InvalidState(String),

    #[error("计划日期不在交付窗口内: plan_date={plan_date}, 窗口=[{start:?}, {end:?}]")]
    OutOfWindow {
        plan_date: NaiveDate,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },

    #[error("配额不足: 申请 {requested}, 已用 {used}, 总量 {total}")]
    QuotaExceeded { requested: i64, used: i64, total: i64 },

    #[error("检验数据已提交: container_id={0}")]
    AlreadySubmitted(i64),

    #[error("外部质检报告已存在: container_id={0}")]
    AlreadyReported(i64),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("计划不可替换: {0}")]
    ReplacementBlocked(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// 事务边界（BEGIN/COMMIT）直接返回 rusqlite::Error
impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

// 配置读取失败（ConfigManager 返回装箱错误）
impl From<Box<dyn std::error::Error + Send + Sync>> for ApiError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ApiError::InternalError(format!("配置读取失败: {}", err))
    }
}

// ==========================================
// 从 Engine 拒绝原因转换
// ==========================================
impl From<ScopeDenial> for ApiError {
    fn from(denial: ScopeDenial) -> Self {
        ApiError::AccessDenied(denial.to_string())
    }
}

impl From<AllocationDenial> for ApiError {
    fn from(denial: AllocationDenial) -> Self {
        match denial {
            AllocationDenial::InvalidCount { .. } => ApiError::ValidationError(denial.to_string()),
            AllocationDenial::RequestNotAccepted { .. } => ApiError::InvalidState(denial.to_string()),
            AllocationDenial::OutOfWindow {
                plan_date,
                start,
                end,
            } => ApiError::OutOfWindow {
                plan_date,
                start,
                end,
            },
            AllocationDenial::QuotaExceeded {
                requested,
                used,
                total,
            } => ApiError::QuotaExceeded {
                requested,
                used,
                total,
            },
            AllocationDenial::ReplacementBlocked { .. } => {
                ApiError::ReplacementBlocked(denial.to_string())
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Container".to_string(),
            id: "42".to_string(),
        };
        match ApiError::from(repo_err) {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Container"));
                assert!(msg.contains("42"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let lock_err = RepositoryError::LockError("poisoned".to_string());
        assert!(matches!(
            ApiError::from(lock_err),
            ApiError::DatabaseConnectionError(_)
        ));
    }

    #[test]
    fn test_allocation_denial_conversion() {
        let err: ApiError = AllocationDenial::QuotaExceeded {
            requested: 3,
            used: 3,
            total: 5,
        }
        .into();
        match err {
            ApiError::QuotaExceeded { used, total, .. } => {
                assert_eq!(used, 3);
                assert_eq!(total, 5);
            }
            other => panic!("Expected QuotaExceeded, got {:?}", other),
        }

        let err: ApiError = AllocationDenial::InvalidCount { count: 0 }.into();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err: ApiError = AllocationDenial::ReplacementBlocked { progressed: 1 }.into();
        assert!(matches!(err, ApiError::ReplacementBlocked(_)));
    }

    #[test]
    fn test_scope_denial_is_access_denied() {
        let err: ApiError = ScopeDenial::UnknownCountry { code: None }.into();
        assert!(matches!(err, ApiError::AccessDenied(_)));
    }
}
