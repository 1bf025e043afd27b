// ==========================================
// 食品加工追溯系统 - 质检数据仓储
// ==========================================
// 对齐: qc_check 表 (scores_json / failed_json)
// ==========================================

use crate::domain::qc::{NewQcCheck, QcCheck};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_util::{format_ts, new_id, now, parse_enum, parse_json, parse_ts};
use crate::repository::waste_repo::delete_returning_parent;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct QcRepository {
    conn: Arc<Mutex<Connection>>,
}

impl QcRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, step_run_id: &str, new: &NewQcCheck) -> RepositoryResult<QcCheck> {
        let check = QcCheck {
            qc_id: new_id(),
            step_run_id: step_run_id.to_string(),
            scores: new.scores.clone(),
            result: new.outcome.result,
            failed_parameters: new.outcome.failed_parameters.clone(),
            checked_by: new.checked_by.clone(),
            checked_at: now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO qc_check (qc_id, step_run_id, scores_json, result, failed_json, checked_by, checked_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                check.qc_id,
                check.step_run_id,
                serde_json::to_string(&check.scores)?,
                check.result.as_str(),
                serde_json::to_string(&check.failed_parameters)?,
                check.checked_by,
                format_ts(&check.checked_at),
            ],
        )?;
        Ok(check)
    }

    pub fn list_by_step_run(&self, step_run_id: &str) -> RepositoryResult<Vec<QcCheck>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT qc_id, step_run_id, scores_json, result, failed_json, checked_by, checked_at
            FROM qc_check
            WHERE step_run_id = ?1
            ORDER BY checked_at, rowid
            "#,
        )?;
        let rows = stmt
            .query_map(params![step_run_id], |row| {
                let scores_json: String = row.get(2)?;
                let result: String = row.get(3)?;
                let failed_json: String = row.get(4)?;
                let checked_at: String = row.get(6)?;
                Ok(QcCheck {
                    qc_id: row.get(0)?,
                    step_run_id: row.get(1)?,
                    scores: parse_json(2, &scores_json)?,
                    result: parse_enum(3, &result)?,
                    failed_parameters: parse_json(4, &failed_json)?,
                    checked_by: row.get(5)?,
                    checked_at: parse_ts(6, &checked_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete(&self, qc_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(&conn, "qc_check", "qc_id", qc_id, "QcCheck")
    }
}
