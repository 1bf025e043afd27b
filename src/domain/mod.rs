// ==========================================
// 食品加工追溯系统 - 领域层
// ==========================================
// 职责: 实体、值对象与封闭枚举
// 红线: 领域层不访问数据库
// ==========================================

pub mod action_log;
pub mod child;
pub mod forms;
pub mod metal;
pub mod packaging;
pub mod qc;
pub mod reference;
pub mod sorting;
pub mod step_run;
pub mod types;
pub mod waste;

// 重导出核心实体
pub use action_log::{ActionLog, ActionType};
pub use child::{ChildRecord, NewChild};
pub use forms::{DryingForm, WashingForm};
pub use metal::{MetalCheckAttempt, MetalRejection, NewMetalCheckAttempt, NewMetalRejection};
pub use packaging::{
    BoxBreakdown, BoxPackRule, NewPackEntry, NewRemainderUsage, NewStorageAllocation, PackEntry,
    PackagingUnit, RemainderUsage, StorageAllocation,
};
pub use qc::{FailedParameter, NewQcCheck, QcCheck, QcOutcome, QcScore};
pub use reference::{Product, Supply, UserProfile};
pub use sorting::{NewReworkedLot, NewSortingOutput, ReworkedLot, SortingOutput};
pub use step_run::{FieldMap, StepRun, StepRunDetail, StepRunUpsert};
pub use types::{
    CheckStatus, ChildKind, ContaminationStatus, LedgerCategory, ParseEnumError, QcParameter,
    QcResult, StepKind, StepRunStatus, WasteType, YesNoNa,
};
pub use waste::{NewWasteRecord, NewWeightCheck, WasteRecord, WeightCheck};
