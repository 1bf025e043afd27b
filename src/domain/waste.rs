// ==========================================
// 食品加工追溯系统 - 损耗与称重复核
// ==========================================
// 对齐: waste_record / weight_check 表
// ==========================================

use crate::domain::types::WasteType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// WasteRecord - 损耗记录 (各工序共用)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteRecord {
    pub waste_id: String,
    pub step_run_id: String,
    pub waste_type: WasteType,
    pub quantity: f64,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWasteRecord {
    pub waste_type: WasteType,
    pub quantity: f64,
    #[serde(default)]
    pub remarks: Option<String>,
}

// ==========================================
// WeightCheck - 称重复核
// ==========================================
// check_no 在同一工序记录内唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightCheck {
    pub check_id: String,
    pub step_run_id: String,
    pub check_no: i32,
    pub target_weight: f64,
    pub actual_weight: f64,
    pub within_tolerance: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWeightCheck {
    pub check_no: i32,
    pub target_weight: f64,
    pub actual_weight: f64,
    /// 由校验器根据容差计算
    #[serde(default)]
    pub within_tolerance: bool,
}
