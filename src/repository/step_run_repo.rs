// ==========================================
// 食品加工追溯系统 - 工序记录数据仓储
// ==========================================
// 对齐: step_run 表
// 红线: Repository 不含业务逻辑, 只做数据映射
// 说明: upsert 在同一事务内完成读-合并-写, revision 每次 +1
// ==========================================

use crate::domain::step_run::{FieldMap, StepRun, StepRunUpsert};
use crate::domain::types::StepRunStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_util::{format_ts, now, parse_enum, parse_json, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = r#"
    SELECT step_run_id, step_kind, lot_id, available_qty, status,
           fields_json, revision, updated_by, created_at, updated_at
    FROM step_run
"#;

pub struct StepRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StepRunRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 ID 查询
    pub fn find_by_id(&self, step_run_id: &str) -> RepositoryResult<Option<StepRun>> {
        let conn = self.get_conn()?;
        Self::find_with_conn(&conn, step_run_id)
    }

    fn find_with_conn(conn: &Connection, step_run_id: &str) -> RepositoryResult<Option<StepRun>> {
        let sql = format!("{} WHERE step_run_id = ?1", SELECT_COLUMNS);
        let run = conn
            .query_row(&sql, params![step_run_id], map_row)
            .optional()?;
        Ok(run)
    }

    /// 查询批次下的全部工序记录
    pub fn list_by_lot(&self, lot_id: &str) -> RepositoryResult<Vec<StepRun>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE lot_id = ?1 ORDER BY created_at, step_run_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![lot_id], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    /// 新建或更新工序记录
    ///
    /// # 参数
    /// - step_run_id: 记录 ID
    /// - upsert: 写入请求 (fields 按字段覆盖合并)
    ///
    /// # 返回
    /// - (写入后的记录, 是否新建)
    pub fn upsert(
        &self,
        step_run_id: &str,
        upsert: &StepRunUpsert,
    ) -> RepositoryResult<(StepRun, bool)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let existing = Self::find_with_conn(&tx, step_run_id)?;
        let ts = now();

        let (run, created) = match existing {
            Some(mut run) => {
                if let Some(kind) = upsert.step_kind {
                    if kind != run.step_kind {
                        return Err(RepositoryError::FieldValueError {
                            field: "step_kind".to_string(),
                            message: format!("工序类型不可修改: {} → {}", run.step_kind, kind),
                        });
                    }
                }
                if let Some(lot_id) = &upsert.lot_id {
                    run.lot_id = lot_id.clone();
                }
                if let Some(qty) = upsert.available_qty {
                    run.available_qty = qty;
                }
                if let Some(status) = upsert.status {
                    run.status = status;
                }
                merge_fields(&mut run.fields, &upsert.fields);
                run.revision += 1;
                run.updated_by = upsert.actor.clone().or(run.updated_by);
                run.updated_at = ts;

                tx.execute(
                    r#"
                    UPDATE step_run
                    SET lot_id = ?2, available_qty = ?3, status = ?4, fields_json = ?5,
                        revision = ?6, updated_by = ?7, updated_at = ?8
                    WHERE step_run_id = ?1
                    "#,
                    params![
                        run.step_run_id,
                        run.lot_id,
                        run.available_qty,
                        run.status.as_str(),
                        serde_json::to_string(&run.fields)?,
                        run.revision,
                        run.updated_by,
                        format_ts(&run.updated_at),
                    ],
                )?;
                (run, false)
            }
            None => {
                let step_kind = upsert.step_kind.ok_or_else(|| RepositoryError::FieldValueError {
                    field: "step_kind".to_string(),
                    message: "新建工序记录必须指定工序类型".to_string(),
                })?;
                let lot_id = upsert
                    .lot_id
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| RepositoryError::FieldValueError {
                        field: "lot_id".to_string(),
                        message: "新建工序记录必须指定批次号".to_string(),
                    })?;

                let run = StepRun {
                    step_run_id: step_run_id.to_string(),
                    step_kind,
                    lot_id,
                    available_qty: upsert.available_qty.unwrap_or(0.0),
                    status: upsert.status.unwrap_or(StepRunStatus::Draft),
                    fields: upsert.fields.clone(),
                    revision: 1,
                    updated_by: upsert.actor.clone(),
                    created_at: ts,
                    updated_at: ts,
                };

                tx.execute(
                    r#"
                    INSERT INTO step_run (
                        step_run_id, step_kind, lot_id, available_qty, status,
                        fields_json, revision, updated_by, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    "#,
                    params![
                        run.step_run_id,
                        run.step_kind.as_str(),
                        run.lot_id,
                        run.available_qty,
                        run.status.as_str(),
                        serde_json::to_string(&run.fields)?,
                        run.revision,
                        run.updated_by,
                        format_ts(&run.created_at),
                        format_ts(&run.updated_at),
                    ],
                )?;
                (run, true)
            }
        };

        tx.commit()?;
        Ok((run, created))
    }

    /// 删除工序记录 (子记录级联删除)
    pub fn delete(&self, step_run_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM step_run WHERE step_run_id = ?1", params![step_run_id])?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "StepRun".to_string(),
                id: step_run_id.to_string(),
            });
        }
        Ok(())
    }
}

/// 字段组合并: 新值覆盖旧值, 未出现的字段保留
fn merge_fields(target: &mut FieldMap, incoming: &FieldMap) {
    for (key, value) in incoming {
        target.insert(key.clone(), value.clone());
    }
}

fn map_row(row: &Row) -> rusqlite::Result<StepRun> {
    let step_kind: String = row.get(1)?;
    let status: String = row.get(4)?;
    let fields_json: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(StepRun {
        step_run_id: row.get(0)?,
        step_kind: parse_enum(1, &step_kind)?,
        lot_id: row.get(2)?,
        available_qty: row.get(3)?,
        status: parse_enum(4, &status)?,
        fields: parse_json(5, &fields_json)?,
        revision: row.get(6)?,
        updated_by: row.get(7)?,
        created_at: parse_ts(8, &created_at)?,
        updated_at: parse_ts(9, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::StepKind;
    use serde_json::json;

    fn setup() -> StepRunRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        StepRunRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_create_then_merge_fields() {
        let repo = setup();

        let create = StepRunUpsert::create(StepKind::Washing, "LOT-1", 80.0)
            .with_field("chlorine_ppm", json!("50"))
            .with_actor("U1");
        let (run, created) = repo.upsert("R1", &create).unwrap();
        assert!(created);
        assert_eq!(run.revision, 1);

        let mut fields = FieldMap::new();
        fields.insert("wash_duration_min".to_string(), json!(12));
        let (run, created) = repo
            .upsert("R1", &StepRunUpsert::fields_only(fields, None))
            .unwrap();
        assert!(!created);
        assert_eq!(run.revision, 2);
        assert_eq!(run.updated_by.as_deref(), Some("U1"));

        let stored = repo.find_by_id("R1").unwrap().unwrap();
        assert_eq!(stored.fields.get("chlorine_ppm"), Some(&json!("50")));
        assert_eq!(stored.fields.get("wash_duration_min"), Some(&json!(12)));
        assert_eq!(stored.available_qty, 80.0);
    }

    #[test]
    fn test_create_requires_kind_and_lot() {
        let repo = setup();
        let err = repo.upsert("R1", &StepRunUpsert::default()).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
        assert!(repo.find_by_id("R1").unwrap().is_none());
    }

    #[test]
    fn test_step_kind_is_immutable() {
        let repo = setup();
        repo.upsert("R1", &StepRunUpsert::create(StepKind::Drying, "LOT-1", 10.0))
            .unwrap();
        let err = repo
            .upsert("R1", &StepRunUpsert::create(StepKind::Sorting, "LOT-1", 10.0))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }
}
