// ==========================================
// 食品加工追溯系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 校验错误在任何存储调用之前抛出, 不产生部分写入
// ==========================================

use crate::domain::types::ParseEnumError;
use crate::engine::allocation::AllocationError;
use thiserror::Error;

/// 字段/规则校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("必填字段缺失: {field}")]
    MissingField { field: String },

    #[error("字段{field}不是有效数字: '{value}'")]
    NotANumber { field: String, value: String },

    #[error("字段{field}超出范围: {value} (允许 {min}~{max})")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("字段{field}必须大于 0: {value}")]
    NotPositive { field: String, value: f64 },

    #[error("字段{field}取值无效: {source}")]
    InvalidEnum {
        field: String,
        source: ParseEnumError,
    },

    #[error("检查编号重复: {0}")]
    DuplicateCheckNumber(i32),

    #[error("金属检测结论与剔除记录不一致: {0}")]
    MetalCheckInconsistent(String),

    #[error("质检评分无效: {0}")]
    InvalidQcScores(String),

    #[error("业务规则违反: {0}")]
    Rule(String),
}

/// 引擎层统一错误 (校验 + 台账)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

pub type EngineResult<T> = Result<T, EngineError>;
