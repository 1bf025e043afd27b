// ==========================================
// 食品加工追溯系统 - 金属检测数据仓储
// ==========================================
// 对齐: metal_check_attempt / metal_rejection 表
// 说明: 检测尝试与剔除行在同一事务内写入; 删除尝试级联删除剔除行
// ==========================================

use crate::domain::metal::{MetalCheckAttempt, MetalRejection, NewMetalCheckAttempt};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_util::{format_ts, new_id, now, parse_enum, parse_ts};
use crate::repository::waste_repo::delete_returning_parent;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct MetalCheckRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MetalCheckRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入检测尝试及其剔除行 (调用方已完成校验)
    pub fn insert_attempt(
        &self,
        step_run_id: &str,
        new: &NewMetalCheckAttempt,
    ) -> RepositoryResult<MetalCheckAttempt> {
        let attempt_id = new_id();
        let mut rejections = Vec::with_capacity(new.rejections.len());
        for row in &new.rejections {
            let weight = row.weight.ok_or_else(|| RepositoryError::FieldValueError {
                field: "weight".to_string(),
                message: "剔除行缺少重量".to_string(),
            })?;
            rejections.push(MetalRejection {
                rejection_id: new_id(),
                attempt_id: attempt_id.clone(),
                object_type: row.object_type.clone(),
                weight,
            });
        }

        let attempt = MetalCheckAttempt {
            attempt_id,
            step_run_id: step_run_id.to_string(),
            check_no: new.check_no,
            status: new.status,
            remarks: new.remarks.clone(),
            checked_by: new.checked_by.clone(),
            checked_at: now(),
            rejections,
        };

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO metal_check_attempt (
                attempt_id, step_run_id, check_no, status, remarks, checked_by, checked_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                attempt.attempt_id,
                attempt.step_run_id,
                attempt.check_no,
                attempt.status.as_str(),
                attempt.remarks,
                attempt.checked_by,
                format_ts(&attempt.checked_at),
            ],
        )?;
        for r in &attempt.rejections {
            tx.execute(
                r#"
                INSERT INTO metal_rejection (rejection_id, attempt_id, object_type, weight)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![r.rejection_id, r.attempt_id, r.object_type, r.weight],
            )?;
        }
        tx.commit()?;

        Ok(attempt)
    }

    /// 查询工序记录下的全部检测尝试 (含剔除行)
    pub fn list_attempts(&self, step_run_id: &str) -> RepositoryResult<Vec<MetalCheckAttempt>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT attempt_id, step_run_id, check_no, status, remarks, checked_by, checked_at
            FROM metal_check_attempt
            WHERE step_run_id = ?1
            ORDER BY check_no
            "#,
        )?;
        let mut attempts = stmt
            .query_map(params![step_run_id], |row| {
                let status: String = row.get(3)?;
                let checked_at: String = row.get(6)?;
                Ok(MetalCheckAttempt {
                    attempt_id: row.get(0)?,
                    step_run_id: row.get(1)?,
                    check_no: row.get(2)?,
                    status: parse_enum(3, &status)?,
                    remarks: row.get(4)?,
                    checked_by: row.get(5)?,
                    checked_at: parse_ts(6, &checked_at)?,
                    rejections: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT r.rejection_id, r.attempt_id, r.object_type, r.weight
            FROM metal_rejection r
            JOIN metal_check_attempt a ON a.attempt_id = r.attempt_id
            WHERE a.step_run_id = ?1
            ORDER BY r.rowid
            "#,
        )?;
        let rejections = stmt
            .query_map(params![step_run_id], |row| {
                Ok(MetalRejection {
                    rejection_id: row.get(0)?,
                    attempt_id: row.get(1)?,
                    object_type: row.get(2)?,
                    weight: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut by_attempt: HashMap<String, Vec<MetalRejection>> = HashMap::new();
        for r in rejections {
            by_attempt.entry(r.attempt_id.clone()).or_default().push(r);
        }
        for attempt in &mut attempts {
            attempt.rejections = by_attempt.remove(&attempt.attempt_id).unwrap_or_default();
        }

        Ok(attempts)
    }

    /// 删除检测尝试 (剔除行由外键级联删除)
    pub fn delete_attempt(&self, attempt_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(
            &conn,
            "metal_check_attempt",
            "attempt_id",
            attempt_id,
            "MetalCheckAttempt",
        )
    }
}
