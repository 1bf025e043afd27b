// ==========================================
// 食品加工追溯系统 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新、工序表单配置、快照管理
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_keys;
use crate::config::{ConfigManager, FormProfile, FormProfileOverride, FormProfileReader};
use crate::domain::types::StepKind;

/// 数值型配置键及其允许的解析类型
const NUMERIC_KEYS: &[(&str, NumericKind)] = &[
    (config_keys::AUTOSAVE_DEBOUNCE_MS, NumericKind::Unsigned),
    (config_keys::NOTIFICATION_TTL_SECS, NumericKind::Unsigned),
    (config_keys::CACHE_TTL_SECS, NumericKind::Unsigned),
    (config_keys::TOLERANCE_EPSILON, NumericKind::NonNegativeFloat),
    (config_keys::WEIGHT_CHECK_TOLERANCE_PCT, NumericKind::NonNegativeFloat),
];

#[derive(Debug, Clone, Copy)]
enum NumericKind {
    Unsigned,
    NonNegativeFloat,
}

impl NumericKind {
    fn accepts(&self, raw: &str) -> bool {
        match self {
            NumericKind::Unsigned => raw.trim().parse::<u64>().is_ok(),
            NumericKind::NonNegativeFloat => raw
                .trim()
                .parse::<f64>()
                .map(|v| v.is_finite() && v >= 0.0)
                .unwrap_or(false),
        }
    }
}

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    fn config_err(e: Box<dyn std::error::Error + Send + Sync>) -> ApiError {
        ApiError::ConfigError(e.to_string())
    }

    pub fn get_config(&self, key: &str) -> ApiResult<Option<String>> {
        self.config_manager
            .get_global_config_value(key)
            .map_err(Self::config_err)
    }

    /// 更新全局配置
    ///
    /// 数值型配置键在写入前校验格式
    pub fn update_config(&self, key: &str, value: &str, operator: &str) -> ApiResult<()> {
        if key.trim().is_empty() {
            return Err(ApiError::InvalidInput("配置键不能为空".to_string()));
        }
        if let Some((_, kind)) = NUMERIC_KEYS.iter().find(|(k, _)| *k == key) {
            if !kind.accepts(value) {
                return Err(ApiError::InvalidInput(format!(
                    "配置{}的值格式无效: {}",
                    key, value
                )));
            }
        }

        self.config_manager
            .set_global_config_value(key, value, operator)
            .map_err(Self::config_err)
    }

    /// 工序生效的表单配置
    pub async fn get_form_profile(&self, step_kind: StepKind) -> ApiResult<FormProfile> {
        self.config_manager
            .get_form_profile(step_kind)
            .await
            .map_err(Self::config_err)
    }

    pub fn set_form_profile_override(
        &self,
        step_kind: StepKind,
        over: &FormProfileOverride,
        operator: &str,
    ) -> ApiResult<()> {
        if let Some(eps) = over.tolerance_epsilon {
            if !eps.is_finite() || eps < 0.0 {
                return Err(ApiError::InvalidInput(format!("容差无效: {}", eps)));
            }
        }
        self.config_manager
            .set_form_profile_override(step_kind, over, operator)
            .map_err(Self::config_err)
    }

    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        self.config_manager
            .get_config_snapshot()
            .map_err(Self::config_err)
    }

    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ApiResult<usize> {
        self.config_manager
            .restore_config_from_snapshot(snapshot_json)
            .map_err(Self::config_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_kind() {
        assert!(NumericKind::Unsigned.accepts("1000"));
        assert!(!NumericKind::Unsigned.accepts("-5"));
        assert!(NumericKind::NonNegativeFloat.accepts("0.02"));
        assert!(!NumericKind::NonNegativeFloat.accepts("abc"));
        assert!(!NumericKind::NonNegativeFloat.accepts("-0.1"));
    }
}
