// ==========================================
// 食品加工追溯系统 - API层错误类型
// ==========================================
// 职责: 统一 API 层错误, 将仓储/引擎错误转换为用户可读的错误消息
// 分类: 校验类 (警告提示, 未调用存储) / 存储类 (错误提示)
// ==========================================

use crate::engine::{AllocationError, EngineError, ValidationError};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 校验错误 (存储调用前)
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据验证失败: {0}")]
    Validation(#[from] ValidationError),

    #[error("数量平衡校验失败: {0}")]
    Allocation(#[from] AllocationError),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

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
    #[error("配置读取失败: {0}")]
    ConfigError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为存储调用前的校验错误
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidInput(_) | ApiError::Validation(_) | ApiError::Allocation(_)
        )
    }
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
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::ChildKindMismatch {
                step_kind,
                child_kind,
            } => ApiError::InvalidInput(format!(
                "工序{}不允许{}类子记录",
                step_kind, child_kind
            )),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::SerializationError(msg) => ApiError::InternalError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(e) => ApiError::Validation(e),
            EngineError::Allocation(e) => ApiError::Allocation(e),
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
        let api_err: ApiError = RepositoryError::NotFound {
            entity: "StepRun".to_string(),
            id: "SR001".to_string(),
        }
        .into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("StepRun"));
                assert!(msg.contains("SR001"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::ChildKindMismatch {
            step_kind: "QC_CHECK".to_string(),
            child_kind: "WASTE".to_string(),
        }
        .into();
        assert!(api_err.is_validation());
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: ApiError = EngineError::Allocation(AllocationError::OverAllocation {
            candidate: 95.0,
            cap: 90.0,
            shortfall: 5.0,
        })
        .into();
        assert!(matches!(err, ApiError::Allocation(_)));
        assert!(err.is_validation());

        let err: ApiError = RepositoryError::DatabaseQueryError("disk I/O".to_string()).into();
        assert!(!err.is_validation());
    }
}
