// ==========================================
// 食品加工追溯系统 - 包装数据仓储
// ==========================================
// 对齐: pack_entry / remainder_usage / storage_allocation /
//       packaging_unit / box_pack_rule 表
// ==========================================

use crate::domain::packaging::{
    BoxPackRule, NewPackEntry, NewRemainderUsage, NewStorageAllocation, PackEntry, PackagingUnit,
    RemainderUsage, StorageAllocation,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_util::{format_ts, new_id, now, parse_ts};
use crate::repository::waste_repo::delete_returning_parent;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const PACK_ENTRY_COLUMNS: &str = r#"
    SELECT pack_entry_id, step_run_id, product_id, packaging_unit_id, pack_count,
           unit_weight, remainder_qty, created_at
    FROM pack_entry
"#;

const USAGE_COLUMNS: &str = r#"
    SELECT usage_id, step_run_id, source_pack_entry_id, target_pack_entry_id, quantity, created_at
    FROM remainder_usage
"#;

pub struct PackagingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PackagingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 包装条目
    // ==========================================

    pub fn insert_pack_entry(&self, step_run_id: &str, new: &NewPackEntry) -> RepositoryResult<PackEntry> {
        let entry = PackEntry {
            pack_entry_id: new_id(),
            step_run_id: step_run_id.to_string(),
            product_id: new.product_id.clone(),
            packaging_unit_id: new.packaging_unit_id.clone(),
            pack_count: new.pack_count,
            unit_weight: new.unit_weight,
            remainder_qty: new.remainder_qty,
            created_at: now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO pack_entry (
                pack_entry_id, step_run_id, product_id, packaging_unit_id, pack_count,
                unit_weight, remainder_qty, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.pack_entry_id,
                entry.step_run_id,
                entry.product_id,
                entry.packaging_unit_id,
                entry.pack_count,
                entry.unit_weight,
                entry.remainder_qty,
                format_ts(&entry.created_at),
            ],
        )?;
        Ok(entry)
    }

    pub fn find_pack_entry(&self, pack_entry_id: &str) -> RepositoryResult<Option<PackEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE pack_entry_id = ?1", PACK_ENTRY_COLUMNS);
        let entry = conn
            .query_row(&sql, params![pack_entry_id], map_pack_entry_row)
            .optional()?;
        Ok(entry)
    }

    pub fn list_pack_entries(&self, step_run_id: &str) -> RepositoryResult<Vec<PackEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE step_run_id = ?1 ORDER BY created_at, rowid", PACK_ENTRY_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![step_run_id], map_pack_entry_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_pack_entry(&self, pack_entry_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(&conn, "pack_entry", "pack_entry_id", pack_entry_id, "PackEntry")
    }

    // ==========================================
    // 余料复用
    // ==========================================

    pub fn insert_remainder_usage(
        &self,
        step_run_id: &str,
        new: &NewRemainderUsage,
    ) -> RepositoryResult<RemainderUsage> {
        let usage = RemainderUsage {
            usage_id: new_id(),
            step_run_id: step_run_id.to_string(),
            source_pack_entry_id: new.source_pack_entry_id.clone(),
            target_pack_entry_id: new.target_pack_entry_id.clone(),
            quantity: new.quantity,
            created_at: now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO remainder_usage (
                usage_id, step_run_id, source_pack_entry_id, target_pack_entry_id, quantity, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                usage.usage_id,
                usage.step_run_id,
                usage.source_pack_entry_id,
                usage.target_pack_entry_id,
                usage.quantity,
                format_ts(&usage.created_at),
            ],
        )?;
        Ok(usage)
    }

    /// 以本工序条目为目标的复用
    pub fn list_usages_by_step_run(&self, step_run_id: &str) -> RepositoryResult<Vec<RemainderUsage>> {
        self.query_usages("WHERE step_run_id = ?1", step_run_id)
    }

    /// 来自某个源条目的复用 (跨工序)
    pub fn list_usages_by_source(&self, source_pack_entry_id: &str) -> RepositoryResult<Vec<RemainderUsage>> {
        self.query_usages("WHERE source_pack_entry_id = ?1", source_pack_entry_id)
    }

    fn query_usages(&self, filter: &str, key: &str) -> RepositoryResult<Vec<RemainderUsage>> {
        let conn = self.get_conn()?;
        let sql = format!("{} {} ORDER BY created_at, rowid", USAGE_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![key], |row| {
                let created_at: String = row.get(5)?;
                Ok(RemainderUsage {
                    usage_id: row.get(0)?,
                    step_run_id: row.get(1)?,
                    source_pack_entry_id: row.get(2)?,
                    target_pack_entry_id: row.get(3)?,
                    quantity: row.get(4)?,
                    created_at: parse_ts(5, &created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_remainder_usage(&self, usage_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(&conn, "remainder_usage", "usage_id", usage_id, "RemainderUsage")
    }

    // ==========================================
    // 入库分配
    // ==========================================

    pub fn insert_storage_allocation(
        &self,
        step_run_id: &str,
        new: &NewStorageAllocation,
    ) -> RepositoryResult<StorageAllocation> {
        let allocation = StorageAllocation {
            allocation_id: new_id(),
            step_run_id: step_run_id.to_string(),
            pack_entry_id: new.pack_entry_id.clone(),
            location: new.location.clone(),
            box_count: new.box_count,
            created_at: now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO storage_allocation (
                allocation_id, step_run_id, pack_entry_id, location, box_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                allocation.allocation_id,
                allocation.step_run_id,
                allocation.pack_entry_id,
                allocation.location,
                allocation.box_count,
                format_ts(&allocation.created_at),
            ],
        )?;
        Ok(allocation)
    }

    pub fn list_storage_allocations(&self, step_run_id: &str) -> RepositoryResult<Vec<StorageAllocation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT allocation_id, step_run_id, pack_entry_id, location, box_count, created_at
            FROM storage_allocation
            WHERE step_run_id = ?1
            ORDER BY created_at, rowid
            "#,
        )?;
        let rows = stmt
            .query_map(params![step_run_id], |row| {
                let created_at: String = row.get(5)?;
                Ok(StorageAllocation {
                    allocation_id: row.get(0)?,
                    step_run_id: row.get(1)?,
                    pack_entry_id: row.get(2)?,
                    location: row.get(3)?,
                    box_count: row.get(4)?,
                    created_at: parse_ts(5, &created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_storage_allocation(&self, allocation_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        delete_returning_parent(
            &conn,
            "storage_allocation",
            "allocation_id",
            allocation_id,
            "StorageAllocation",
        )
    }

    // ==========================================
    // 查找表
    // ==========================================

    pub fn upsert_packaging_unit(&self, unit: &PackagingUnit) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO packaging_unit (unit_id, name, unit_weight) VALUES (?1, ?2, ?3)
            ON CONFLICT(unit_id) DO UPDATE SET name = excluded.name, unit_weight = excluded.unit_weight
            "#,
            params![unit.unit_id, unit.name, unit.unit_weight],
        )?;
        Ok(())
    }

    pub fn list_packaging_units(&self) -> RepositoryResult<Vec<PackagingUnit>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT unit_id, name, unit_weight FROM packaging_unit ORDER BY unit_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PackagingUnit {
                    unit_id: row.get(0)?,
                    name: row.get(1)?,
                    unit_weight: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn upsert_box_rule(&self, rule: &BoxPackRule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO box_pack_rule (rule_id, packaging_unit_id, packs_per_box) VALUES (?1, ?2, ?3)
            ON CONFLICT(packaging_unit_id) DO UPDATE SET
                rule_id = excluded.rule_id, packs_per_box = excluded.packs_per_box
            "#,
            params![rule.rule_id, rule.packaging_unit_id, rule.packs_per_box],
        )?;
        Ok(())
    }

    /// 按包装规格查找装箱规则
    pub fn lookup_box_rule(&self, packaging_unit_id: &str) -> RepositoryResult<Option<BoxPackRule>> {
        let conn = self.get_conn()?;
        let rule = conn
            .query_row(
                "SELECT rule_id, packaging_unit_id, packs_per_box FROM box_pack_rule WHERE packaging_unit_id = ?1",
                params![packaging_unit_id],
                |row| {
                    Ok(BoxPackRule {
                        rule_id: row.get(0)?,
                        packaging_unit_id: row.get(1)?,
                        packs_per_box: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(rule)
    }
}

fn map_pack_entry_row(row: &Row) -> rusqlite::Result<PackEntry> {
    let created_at: String = row.get(7)?;
    Ok(PackEntry {
        pack_entry_id: row.get(0)?,
        step_run_id: row.get(1)?,
        product_id: row.get(2)?,
        packaging_unit_id: row.get(3)?,
        pack_count: row.get(4)?,
        unit_weight: row.get(5)?,
        remainder_qty: row.get(6)?,
        created_at: parse_ts(7, &created_at)?,
    })
}
