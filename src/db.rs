// ==========================================
// 食品加工追溯系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键/busy_timeout)
// - 建库脚本集中在此处, 并写入 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;
use tracing::{info, warn};

/// 默认 busy_timeout (毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建库脚本 (幂等)
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id),
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (scope_id, key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key, created_at)
VALUES ('global', 'GLOBAL', 'global', datetime('now'));

CREATE TABLE IF NOT EXISTS step_run (
    step_run_id TEXT PRIMARY KEY,
    step_kind TEXT NOT NULL,
    lot_id TEXT NOT NULL,
    available_qty REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    fields_json TEXT NOT NULL DEFAULT '{}',
    revision INTEGER NOT NULL DEFAULT 1,
    updated_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_step_run_lot ON step_run(lot_id);

CREATE TABLE IF NOT EXISTS waste_record (
    waste_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    waste_type TEXT NOT NULL,
    quantity REAL NOT NULL CHECK (quantity >= 0),
    remarks TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sorting_output (
    output_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    product_id TEXT NOT NULL,
    grade TEXT,
    quantity REAL NOT NULL CHECK (quantity >= 0),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reworked_lot (
    rework_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    new_lot_id TEXT NOT NULL UNIQUE,
    target_step TEXT NOT NULL,
    quantity REAL NOT NULL CHECK (quantity >= 0),
    reason TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS weight_check (
    check_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    check_no INTEGER NOT NULL,
    target_weight REAL NOT NULL,
    actual_weight REAL NOT NULL,
    within_tolerance INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (step_run_id, check_no)
);

CREATE TABLE IF NOT EXISTS metal_check_attempt (
    attempt_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    check_no INTEGER NOT NULL,
    status TEXT NOT NULL,
    remarks TEXT,
    checked_by TEXT,
    checked_at TEXT NOT NULL,
    UNIQUE (step_run_id, check_no)
);

CREATE TABLE IF NOT EXISTS metal_rejection (
    rejection_id TEXT PRIMARY KEY,
    attempt_id TEXT NOT NULL REFERENCES metal_check_attempt(attempt_id) ON DELETE CASCADE,
    object_type TEXT NOT NULL,
    weight REAL NOT NULL CHECK (weight > 0)
);

CREATE TABLE IF NOT EXISTS packaging_unit (
    unit_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    unit_weight REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS box_pack_rule (
    rule_id TEXT PRIMARY KEY,
    packaging_unit_id TEXT NOT NULL UNIQUE REFERENCES packaging_unit(unit_id),
    packs_per_box INTEGER NOT NULL CHECK (packs_per_box > 0)
);

CREATE TABLE IF NOT EXISTS pack_entry (
    pack_entry_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    product_id TEXT NOT NULL,
    packaging_unit_id TEXT NOT NULL,
    pack_count INTEGER NOT NULL CHECK (pack_count >= 0),
    unit_weight REAL NOT NULL,
    remainder_qty REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS remainder_usage (
    usage_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    source_pack_entry_id TEXT NOT NULL REFERENCES pack_entry(pack_entry_id),
    target_pack_entry_id TEXT NOT NULL REFERENCES pack_entry(pack_entry_id) ON DELETE CASCADE,
    quantity REAL NOT NULL CHECK (quantity > 0),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS storage_allocation (
    allocation_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    pack_entry_id TEXT NOT NULL REFERENCES pack_entry(pack_entry_id) ON DELETE CASCADE,
    location TEXT NOT NULL,
    box_count INTEGER NOT NULL CHECK (box_count > 0),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS qc_check (
    qc_id TEXT PRIMARY KEY,
    step_run_id TEXT NOT NULL REFERENCES step_run(step_run_id) ON DELETE CASCADE,
    scores_json TEXT NOT NULL,
    result TEXT NOT NULL,
    failed_json TEXT NOT NULL,
    checked_by TEXT,
    checked_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product (
    product_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    unit TEXT NOT NULL DEFAULT 'kg'
);

CREATE TABLE IF NOT EXISTS supply (
    supply_id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL REFERENCES product(product_id),
    quantity REAL NOT NULL,
    received_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_profile (
    user_id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    step_run_id TEXT,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    payload_json TEXT,
    detail TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_step_run ON action_log(step_run_id, action_ts);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要每个连接单独开启
/// - busy_timeout 需要每个连接单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建库 (幂等), 首次建库时写入 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    match read_schema_version(conn)? {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                [CURRENT_SCHEMA_VERSION],
            )?;
            info!(version = CURRENT_SCHEMA_VERSION, "数据库初始化完成");
        }
        Some(v) if v != CURRENT_SCHEMA_VERSION => {
            warn!(
                found = v,
                expected = CURRENT_SCHEMA_VERSION,
                "schema_version 与当前代码不一致"
            );
        }
        Some(_) => {}
    }
    Ok(())
}

/// 读取 schema_version (表不存在或为空时返回 None)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
