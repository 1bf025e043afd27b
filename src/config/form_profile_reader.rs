// ==========================================
// 食品加工追溯系统 - 表单配置读取 Trait
// ==========================================
// 职责: 定义 API / 自动保存所需的配置读取接口 (不包含实现)
// 红线: 不包含配置写入
// ==========================================

use crate::config::form_profile::FormProfile;
use crate::domain::types::StepKind;
use async_trait::async_trait;
use std::error::Error;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// FormProfileReader Trait
// ==========================================
// 实现者: ConfigManager (从 config_kv 表读取)
#[async_trait]
pub trait FormProfileReader: Send + Sync {
    /// 获取工序的生效表单配置
    ///
    /// # 默认值
    /// - debounce_ms: autosave_debounce_ms 或 1000
    /// - tolerance_epsilon: tolerance_epsilon 或 1e-6
    async fn get_form_profile(&self, step_kind: StepKind) -> ConfigResult<FormProfile>;

    /// 通知显示时长 (秒), 默认 5
    async fn get_notification_ttl_secs(&self) -> ConfigResult<u64>;

    /// 缓存有效期 (秒), 默认 300
    async fn get_cache_ttl_secs(&self) -> ConfigResult<u64>;

    /// 称重复核允许偏差比例, 默认 0.02
    async fn get_weight_check_tolerance_pct(&self) -> ConfigResult<f64>;
}
