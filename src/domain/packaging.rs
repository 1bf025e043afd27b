// ==========================================
// 食品加工追溯系统 - 包装领域模型
// ==========================================
// 对齐: pack_entry / remainder_usage / storage_allocation /
//       packaging_unit / box_pack_rule 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// PackEntry - 包装条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackEntry {
    pub pack_entry_id: String,
    pub step_run_id: String,
    pub product_id: String,
    pub packaging_unit_id: String,
    pub pack_count: u32,
    pub unit_weight: f64,   // 单包净重
    pub remainder_qty: f64, // 未成包余料, 可供后续包装复用
    pub created_at: NaiveDateTime,
}

impl PackEntry {
    /// 已包装量 = 包数 × 单包净重
    pub fn packed_qty(&self) -> f64 {
        self.pack_count as f64 * self.unit_weight
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPackEntry {
    pub product_id: String,
    pub packaging_unit_id: String,
    pub pack_count: u32,
    pub unit_weight: f64,
    #[serde(default)]
    pub remainder_qty: f64,
}

// ==========================================
// RemainderUsage - 余料复用
// ==========================================
// 源条目 (前序包装) → 目标条目 (本次包装)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemainderUsage {
    pub usage_id: String,
    pub step_run_id: String, // 目标条目所属工序记录
    pub source_pack_entry_id: String,
    pub target_pack_entry_id: String,
    pub quantity: f64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRemainderUsage {
    pub source_pack_entry_id: String,
    pub target_pack_entry_id: String,
    pub quantity: f64,
}

// ==========================================
// StorageAllocation - 入库库位分配
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAllocation {
    pub allocation_id: String,
    pub step_run_id: String,
    pub pack_entry_id: String,
    pub location: String,
    pub box_count: u32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStorageAllocation {
    pub pack_entry_id: String,
    pub location: String,
    pub box_count: u32,
}

// ==========================================
// 查找表
// ==========================================

/// 包装规格
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingUnit {
    pub unit_id: String,
    pub name: String,
    pub unit_weight: f64,
}

/// 装箱规则 (每箱包数)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxPackRule {
    pub rule_id: String,
    pub packaging_unit_id: String,
    pub packs_per_box: u32,
}

/// 装箱拆分结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxBreakdown {
    pub full_boxes: u32,
    pub loose_packs: u32,
}

impl BoxBreakdown {
    /// 占用箱数 (散包单独占一箱)
    pub fn total_boxes(&self) -> u32 {
        self.full_boxes + u32::from(self.loose_packs > 0)
    }
}
