// ==========================================
// 食品加工追溯系统 - 损耗/称重数据仓储
// ==========================================
// 对齐: waste_record / weight_check 表
// ==========================================

use crate::domain::waste::{NewWasteRecord, NewWeightCheck, WasteRecord, WeightCheck};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_util::{format_ts, new_id, now, parse_enum, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct WasteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WasteRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 损耗记录
    // ==========================================

    pub fn insert_waste(&self, step_run_id: &str, new: &NewWasteRecord) -> RepositoryResult<WasteRecord> {
        let record = WasteRecord {
            waste_id: new_id(),
            step_run_id: step_run_id.to_string(),
            waste_type: new.waste_type,
            quantity: new.quantity,
            remarks: new.remarks.clone(),
            created_at: now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO waste_record (waste_id, step_run_id, waste_type, quantity, remarks, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.waste_id,
                record.step_run_id,
                record.waste_type.as_str(),
                record.quantity,
                record.remarks,
                format_ts(&record.created_at),
            ],
        )?;
        Ok(record)
    }

    pub fn list_waste(&self, step_run_id: &str) -> RepositoryResult<Vec<WasteRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT waste_id, step_run_id, waste_type, quantity, remarks, created_at
            FROM waste_record
            WHERE step_run_id = ?1
            ORDER BY created_at, rowid
            "#,
        )?;
        let rows = stmt
            .query_map(params![step_run_id], map_waste_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 删除损耗记录, 返回所属工序记录 ID
    pub fn delete_waste(&self, waste_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(&conn, "waste_record", "waste_id", waste_id, "WasteRecord")
    }

    // ==========================================
    // 称重复核
    // ==========================================

    pub fn insert_weight_check(
        &self,
        step_run_id: &str,
        new: &NewWeightCheck,
    ) -> RepositoryResult<WeightCheck> {
        let check = WeightCheck {
            check_id: new_id(),
            step_run_id: step_run_id.to_string(),
            check_no: new.check_no,
            target_weight: new.target_weight,
            actual_weight: new.actual_weight,
            within_tolerance: new.within_tolerance,
            created_at: now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO weight_check (
                check_id, step_run_id, check_no, target_weight, actual_weight,
                within_tolerance, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                check.check_id,
                check.step_run_id,
                check.check_no,
                check.target_weight,
                check.actual_weight,
                check.within_tolerance,
                format_ts(&check.created_at),
            ],
        )?;
        Ok(check)
    }

    pub fn list_weight_checks(&self, step_run_id: &str) -> RepositoryResult<Vec<WeightCheck>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT check_id, step_run_id, check_no, target_weight, actual_weight,
                   within_tolerance, created_at
            FROM weight_check
            WHERE step_run_id = ?1
            ORDER BY check_no
            "#,
        )?;
        let rows = stmt
            .query_map(params![step_run_id], |row| {
                let created_at: String = row.get(6)?;
                Ok(WeightCheck {
                    check_id: row.get(0)?,
                    step_run_id: row.get(1)?,
                    check_no: row.get(2)?,
                    target_weight: row.get(3)?,
                    actual_weight: row.get(4)?,
                    within_tolerance: row.get(5)?,
                    created_at: parse_ts(6, &created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_weight_check(&self, check_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(&conn, "weight_check", "check_id", check_id, "WeightCheck")
    }
}

fn map_waste_row(row: &Row) -> rusqlite::Result<WasteRecord> {
    let waste_type: String = row.get(2)?;
    let created_at: String = row.get(5)?;
    Ok(WasteRecord {
        waste_id: row.get(0)?,
        step_run_id: row.get(1)?,
        waste_type: parse_enum(2, &waste_type)?,
        quantity: row.get(3)?,
        remarks: row.get(4)?,
        created_at: parse_ts(5, &created_at)?,
    })
}

/// 按主键删除子记录, 返回其 step_run_id; 不存在时返回 NotFound
///
/// table/id_column 只接受代码内常量
pub(crate) fn delete_returning_parent(
    conn: &Connection,
    table: &str,
    id_column: &str,
    id: &str,
    entity: &str,
) -> RepositoryResult<String> {
    let select = format!("SELECT step_run_id FROM {} WHERE {} = ?1", table, id_column);
    let parent: Option<String> = conn
        .query_row(&select, params![id], |row| row.get(0))
        .optional()?;

    let parent = parent.ok_or_else(|| RepositoryError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    })?;

    let delete = format!("DELETE FROM {} WHERE {} = ?1", table, id_column);
    conn.execute(&delete, params![id])?;
    Ok(parent)
}
