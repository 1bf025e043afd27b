// ==========================================
// 食品加工追溯系统 - 自动保存
// ==========================================
// state:    纯状态机 (Idle / Dirty / Saving)
// worker:   tokio 后台任务, 防抖后写入 StepRecordStore
// registry: 多字段组统一关闭
// ==========================================

pub mod registry;
pub mod state;
pub mod worker;

pub use registry::AutosaveRegistry;
pub use state::{AutosaveAction, AutosaveMachine, AutosaveState};
pub use worker::{AutosaveConfig, AutosaveError, AutosaveHandle, AutosaveStats};
