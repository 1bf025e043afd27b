// ==========================================
// 食品加工追溯系统 - 参考数据仓储
// ==========================================
// 对齐: product / supply / user_profile 表
// 说明: 库存 = 到货合计 - 已包装合计 (按产品)
// ==========================================

use crate::domain::reference::{Product, Supply, UserProfile};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_util::{format_ts, parse_ts};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct ReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 产品
    // ==========================================

    pub fn upsert_product(&self, product: &Product) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product (product_id, name, unit) VALUES (?1, ?2, ?3)
            ON CONFLICT(product_id) DO UPDATE SET name = excluded.name, unit = excluded.unit
            "#,
            params![product.product_id, product.name, product.unit],
        )?;
        Ok(())
    }

    pub fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT product_id, name, unit FROM product ORDER BY product_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Product {
                    product_id: row.get(0)?,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 到货 / 库存
    // ==========================================

    pub fn insert_supply(&self, supply: &Supply) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO supply (supply_id, product_id, quantity, received_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                supply.supply_id,
                supply.product_id,
                supply.quantity,
                format_ts(&supply.received_at),
            ],
        )?;
        Ok(())
    }

    pub fn list_supplies(&self, product_id: &str) -> RepositoryResult<Vec<Supply>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT supply_id, product_id, quantity, received_at
            FROM supply WHERE product_id = ?1
            ORDER BY received_at, rowid
            "#,
        )?;
        let rows = stmt
            .query_map(params![product_id], |row| {
                let received_at: String = row.get(3)?;
                Ok(Supply {
                    supply_id: row.get(0)?,
                    product_id: row.get(1)?,
                    quantity: row.get(2)?,
                    received_at: parse_ts(3, &received_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 产品可用库存 = 到货合计 - 已包装合计
    pub fn stock_count(&self, product_id: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        let stock: f64 = conn.query_row(
            r#"
            SELECT
                COALESCE((SELECT SUM(quantity) FROM supply WHERE product_id = ?1), 0.0)
              - COALESCE((SELECT SUM(pack_count * unit_weight) FROM pack_entry WHERE product_id = ?1), 0.0)
            "#,
            params![product_id],
            |row| row.get(0),
        )?;
        Ok(stock)
    }

    // ==========================================
    // 用户
    // ==========================================

    pub fn upsert_user(&self, user: &UserProfile) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO user_profile (user_id, display_name) VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name
            "#,
            params![user.user_id, user.display_name],
        )?;
        Ok(())
    }

    pub fn find_user(&self, user_id: &str) -> RepositoryResult<Option<UserProfile>> {
        let conn = self.get_conn()?;
        let user = conn
            .query_row(
                "SELECT user_id, display_name FROM user_profile WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        user_id: row.get(0)?,
                        display_name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}
