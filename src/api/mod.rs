// ==========================================
// 食品加工追溯系统 - API 层
// ==========================================
// 职责: 按工序提供业务接口
// 流程: 字段校验 → 存储调用 → 台账重算 → 通知
// ==========================================

pub mod config_api;
pub mod context;
pub mod error;
pub mod metal_detection_api;
pub mod packaging_api;
pub mod process_form_api;
pub mod qc_api;
pub mod reference_api;
pub mod sorting_api;
pub mod step_run_api;

// 重导出核心类型
pub use config_api::ConfigApi;
pub use context::{StepApiContext, StepMutation, StepRunView};
pub use error::{ApiError, ApiResult};
pub use metal_detection_api::MetalDetectionApi;
pub use packaging_api::PackagingApi;
pub use process_form_api::{DryingApi, WashingApi};
pub use qc_api::QcApi;
pub use reference_api::ReferenceApi;
pub use sorting_api::SortingApi;
pub use step_run_api::StepRunApi;
