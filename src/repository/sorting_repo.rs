// ==========================================
// 食品加工追溯系统 - 分选数据仓储
// ==========================================
// 对齐: sorting_output / reworked_lot 表
// 说明: 返工批次号在写入时生成 (RW-<uuid 前 8 位>)
// ==========================================

use crate::domain::sorting::{NewReworkedLot, NewSortingOutput, ReworkedLot, SortingOutput};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_util::{format_ts, new_id, now, parse_enum, parse_ts};
use crate::repository::waste_repo::delete_returning_parent;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct SortingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SortingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 分选产出
    // ==========================================

    pub fn insert_output(
        &self,
        step_run_id: &str,
        new: &NewSortingOutput,
    ) -> RepositoryResult<SortingOutput> {
        let output = SortingOutput {
            output_id: new_id(),
            step_run_id: step_run_id.to_string(),
            product_id: new.product_id.clone(),
            grade: new.grade.clone(),
            quantity: new.quantity,
            created_at: now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO sorting_output (output_id, step_run_id, product_id, grade, quantity, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                output.output_id,
                output.step_run_id,
                output.product_id,
                output.grade,
                output.quantity,
                format_ts(&output.created_at),
            ],
        )?;
        Ok(output)
    }

    pub fn list_outputs(&self, step_run_id: &str) -> RepositoryResult<Vec<SortingOutput>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT output_id, step_run_id, product_id, grade, quantity, created_at
            FROM sorting_output
            WHERE step_run_id = ?1
            ORDER BY created_at, rowid
            "#,
        )?;
        let rows = stmt
            .query_map(params![step_run_id], |row| {
                let created_at: String = row.get(5)?;
                Ok(SortingOutput {
                    output_id: row.get(0)?,
                    step_run_id: row.get(1)?,
                    product_id: row.get(2)?,
                    grade: row.get(3)?,
                    quantity: row.get(4)?,
                    created_at: parse_ts(5, &created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_output(&self, output_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(&conn, "sorting_output", "output_id", output_id, "SortingOutput")
    }

    // ==========================================
    // 返工批次
    // ==========================================

    pub fn insert_rework(
        &self,
        step_run_id: &str,
        new: &NewReworkedLot,
    ) -> RepositoryResult<ReworkedLot> {
        let rework_id = new_id();
        let new_lot_id = format!("RW-{}", &rework_id[..8].to_uppercase());
        let rework = ReworkedLot {
            rework_id,
            step_run_id: step_run_id.to_string(),
            new_lot_id,
            target_step: new.target_step,
            quantity: new.quantity,
            reason: new.reason.clone(),
            created_at: now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO reworked_lot (
                rework_id, step_run_id, new_lot_id, target_step, quantity, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                rework.rework_id,
                rework.step_run_id,
                rework.new_lot_id,
                rework.target_step.as_str(),
                rework.quantity,
                rework.reason,
                format_ts(&rework.created_at),
            ],
        )?;
        Ok(rework)
    }

    pub fn list_reworks(&self, step_run_id: &str) -> RepositoryResult<Vec<ReworkedLot>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT rework_id, step_run_id, new_lot_id, target_step, quantity, reason, created_at
            FROM reworked_lot
            WHERE step_run_id = ?1
            ORDER BY created_at, rowid
            "#,
        )?;
        let rows = stmt
            .query_map(params![step_run_id], |row| {
                let target_step: String = row.get(3)?;
                let created_at: String = row.get(6)?;
                Ok(ReworkedLot {
                    rework_id: row.get(0)?,
                    step_run_id: row.get(1)?,
                    new_lot_id: row.get(2)?,
                    target_step: parse_enum(3, &target_step)?,
                    quantity: row.get(4)?,
                    reason: row.get(5)?,
                    created_at: parse_ts(6, &created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_rework(&self, rework_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(&conn, "reworked_lot", "rework_id", rework_id, "ReworkedLot")
    }
}
