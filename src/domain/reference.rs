// ==========================================
// 食品加工追溯系统 - 基础资料
// ==========================================
// 对齐: product / supply / user_profile 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub unit: String, // kg / pcs
}

/// 原料到货
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supply {
    pub supply_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub received_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
}
