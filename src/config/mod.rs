// ==========================================
// 食品加工追溯系统 - 配置层
// ==========================================
// 职责: 系统配置管理, 全局默认 + 工序级覆盖
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod form_profile;
pub mod form_profile_reader;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use form_profile::{FormProfile, FormProfileOverride, DEFAULT_DEBOUNCE_MS};
pub use form_profile_reader::{ConfigResult, FormProfileReader};
