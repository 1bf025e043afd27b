// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库创建、基础资料准备
// ==========================================

#![allow(dead_code)]

use food_trace::db::{init_schema, open_sqlite_connection};
use food_trace::domain::packaging::{BoxPackRule, PackagingUnit};
use food_trace::repository::PackagingRepository;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是有效 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 独立连接上的包装仓储 (用于准备包装规格)
pub fn packaging_repo(db_path: &str) -> Result<PackagingRepository, Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    Ok(PackagingRepository::new(Arc::new(Mutex::new(conn))))
}

/// 写入包装规格及箱规
pub fn seed_packaging_unit(
    db_path: &str,
    unit_id: &str,
    unit_weight: f64,
    packs_per_box: u32,
) -> Result<(), Box<dyn Error>> {
    let repo = packaging_repo(db_path)?;
    repo.upsert_packaging_unit(&PackagingUnit {
        unit_id: unit_id.to_string(),
        name: format!("{} 包装", unit_id),
        unit_weight,
    })?;
    repo.upsert_box_rule(&BoxPackRule {
        rule_id: format!("RULE-{}", unit_id),
        packaging_unit_id: unit_id.to_string(),
        packs_per_box,
    })?;
    Ok(())
}
