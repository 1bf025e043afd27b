// ==========================================
// 食品加工追溯系统 - 引擎层
// ==========================================
// 职责: 纯业务规则 (台账/质检/金属检测/包装/字段校验)
// 红线: Engine 不拼 SQL, 不持有连接
// ==========================================

pub mod allocation;
pub mod error;
pub mod events;
pub mod field_validation;
pub mod metal_check;
pub mod packaging_calc;
pub mod qc_evaluator;
pub mod step_ledger;

// 重导出核心引擎
pub use allocation::{
    compute_remaining, validate_entry, AllocationError, AllocationLedger, AllocationSlot,
    LedgerSnapshot, LedgerWarning, Tolerance, DEFAULT_TOLERANCE_EPSILON,
};
pub use error::{EngineError, EngineResult, ValidationError};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, StepEvent, StepEventPublisher, StepEventType,
};
pub use metal_check::MetalCheckValidator;
pub use packaging_calc::PackagingCalculator;
pub use qc_evaluator::QcEvaluator;
pub use step_ledger::{build_ledger, StepLedgerProfile};
