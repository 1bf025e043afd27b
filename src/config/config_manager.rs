// ==========================================
// 食品加工追溯系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::form_profile::{FormProfile, FormProfileOverride, DEFAULT_DEBOUNCE_MS};
use crate::config::form_profile_reader::{ConfigResult, FormProfileReader};
use crate::db::open_sqlite_connection;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::StepKind;
use crate::engine::allocation::DEFAULT_TOLERANCE_EPSILON;
use crate::repository::row_util::{format_ts, now};
use crate::repository::ActionLogRepository;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 会对传入连接再次应用统一 PRAGMA (幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置, 格式错误时告警并使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Display,
    {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        Ok(raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误, 使用默认值");
            default
        }))
    }

    /// 写入 global scope 配置并记录操作日志
    pub fn set_global_config_value(&self, key: &str, value: &str, actor: &str) -> ConfigResult<()> {
        {
            let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            conn.execute(
                r#"
                INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, ?3)
                ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = ?3
                "#,
                params![key, value, format_ts(&now())],
            )?;
        }

        let log = ActionLog::new(None, ActionType::UpdateConfig, actor)
            .with_payload(json!({ "key": key, "value": value }));
        ActionLogRepository::new(self.conn.clone()).insert(&log)?;

        tracing::info!(config_key = key, actor = actor, "配置已更新");
        Ok(())
    }

    /// 读取工序级配置覆盖 (form_profile/{STEP_KIND})
    pub fn get_form_profile_override(&self, step_kind: StepKind) -> ConfigResult<FormProfileOverride> {
        let key = config_keys::form_profile_key(step_kind);
        let raw = match self.get_config_value(&key)? {
            Some(v) => v,
            None => return Ok(FormProfileOverride::default()),
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(
                config_key = %key,
                raw_value = %raw,
                error = %e,
                "表单配置格式错误, 忽略工序级覆盖"
            );
            FormProfileOverride::default()
        }))
    }

    /// 写入工序级配置覆盖
    pub fn set_form_profile_override(
        &self,
        step_kind: StepKind,
        over: &FormProfileOverride,
        actor: &str,
    ) -> ConfigResult<()> {
        let key = config_keys::form_profile_key(step_kind);
        self.set_global_config_value(&key, &serde_json::to_string(over)?, actor)
    }

    /// 获取所有配置的快照 (JSON)
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 从配置快照恢复配置 (覆盖现有 global 配置)
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;
        let ts = format_ts(&now());

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                r#"
                INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, ?3)
                ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = ?3
                "#,
                params![key, value, ts],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// FormProfileReader Trait 实现
// ==========================================
#[async_trait]
impl FormProfileReader for ConfigManager {
    async fn get_form_profile(&self, step_kind: StepKind) -> ConfigResult<FormProfile> {
        let mut profile = FormProfile::defaults(step_kind);
        profile.debounce_ms =
            self.get_parsed_or_default(config_keys::AUTOSAVE_DEBOUNCE_MS, DEFAULT_DEBOUNCE_MS)?;
        profile.tolerance_epsilon =
            self.get_parsed_or_default(config_keys::TOLERANCE_EPSILON, DEFAULT_TOLERANCE_EPSILON)?;

        Ok(profile.apply(self.get_form_profile_override(step_kind)?))
    }

    async fn get_notification_ttl_secs(&self) -> ConfigResult<u64> {
        self.get_parsed_or_default(config_keys::NOTIFICATION_TTL_SECS, 5u64)
    }

    async fn get_cache_ttl_secs(&self) -> ConfigResult<u64> {
        self.get_parsed_or_default(config_keys::CACHE_TTL_SECS, 300u64)
    }

    async fn get_weight_check_tolerance_pct(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(config_keys::WEIGHT_CHECK_TOLERANCE_PCT, 0.02f64)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::domain::types::StepKind;

    // 自动保存
    pub const AUTOSAVE_DEBOUNCE_MS: &str = "autosave_debounce_ms";

    // 台账
    pub const TOLERANCE_EPSILON: &str = "tolerance_epsilon";

    // 通知 / 缓存
    pub const NOTIFICATION_TTL_SECS: &str = "notification_ttl_secs";
    pub const CACHE_TTL_SECS: &str = "cache_ttl_secs";

    // 称重复核
    pub const WEIGHT_CHECK_TOLERANCE_PCT: &str = "weight_check_tolerance_pct";

    // 工序级表单配置 (JSON)
    pub const FORM_PROFILE_PREFIX: &str = "form_profile/";

    pub fn form_profile_key(step_kind: StepKind) -> String {
        format!("{}{}", FORM_PROFILE_PREFIX, step_kind.as_str())
    }
}
