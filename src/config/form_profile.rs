use crate::domain::types::{LedgerCategory, StepKind};
use crate::engine::allocation::{Tolerance, DEFAULT_TOLERANCE_EPSILON};
use crate::engine::step_ledger::StepLedgerProfile;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认自动保存防抖窗口 (毫秒)
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// 工序表单配置覆盖 (持久化对象)
///
/// 存储位置: config_kv (scope_id='global', key='form_profile/{STEP_KIND}')
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormProfileOverride {
    #[serde(default)]
    pub debounce_ms: Option<u64>,

    #[serde(default)]
    pub tolerance_epsilon: Option<f64>,

    /// 台账类别顺序 (必须是该工序默认类别的一个排列)
    #[serde(default)]
    pub category_order: Option<Vec<LedgerCategory>>,
}

/// 生效的工序表单配置 (全局默认 + 工序覆盖)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormProfile {
    pub step_kind: StepKind,
    pub debounce_ms: u64,
    pub tolerance_epsilon: f64,
    pub category_order: Option<Vec<LedgerCategory>>,
}

impl FormProfile {
    pub fn defaults(step_kind: StepKind) -> Self {
        Self {
            step_kind,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            tolerance_epsilon: DEFAULT_TOLERANCE_EPSILON,
            category_order: None,
        }
    }

    /// 叠加工序级覆盖
    pub fn apply(mut self, over: FormProfileOverride) -> Self {
        if let Some(ms) = over.debounce_ms {
            self.debounce_ms = ms;
        }
        if let Some(eps) = over.tolerance_epsilon {
            self.tolerance_epsilon = eps;
        }
        if over.category_order.is_some() {
            self.category_order = over.category_order;
        }
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.tolerance_epsilon)
    }

    pub fn ledger_profile(&self) -> StepLedgerProfile {
        StepLedgerProfile::for_step(self.step_kind).with_order_override(self.category_order.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_override() {
        let over: FormProfileOverride =
            serde_json::from_str(r#"{"debounce_ms": 250, "category_order": ["WASTE", "OUTPUTS", "REWORKS"]}"#)
                .unwrap();
        let profile = FormProfile::defaults(StepKind::Sorting).apply(over);

        assert_eq!(profile.debounce(), Duration::from_millis(250));
        assert_eq!(profile.tolerance().epsilon, DEFAULT_TOLERANCE_EPSILON);
        assert_eq!(
            profile.ledger_profile().category_order[0],
            LedgerCategory::Waste
        );
    }

    #[test]
    fn test_empty_override_keeps_defaults() {
        let profile = FormProfile::defaults(StepKind::Drying).apply(FormProfileOverride::default());
        assert_eq!(profile, FormProfile::defaults(StepKind::Drying));
    }
}
