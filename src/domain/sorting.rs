// ==========================================
// 食品加工追溯系统 - 分选领域模型
// ==========================================
// 对齐: sorting_output / reworked_lot 表
// ==========================================

use crate::domain::types::StepKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// SortingOutput - 分选产出
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortingOutput {
    pub output_id: String,
    pub step_run_id: String,
    pub product_id: String,
    pub grade: Option<String>, // 等级 (A/B/...)
    pub quantity: f64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSortingOutput {
    pub product_id: String,
    #[serde(default)]
    pub grade: Option<String>,
    pub quantity: f64,
}

// ==========================================
// ReworkedLot - 返工批次
// ==========================================
// 返工量回流到前序工序, 以新批次号追踪
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReworkedLot {
    pub rework_id: String,
    pub step_run_id: String,
    pub new_lot_id: String,
    pub target_step: StepKind,
    pub quantity: f64,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReworkedLot {
    pub target_step: StepKind,
    pub quantity: f64,
    #[serde(default)]
    pub reason: Option<String>,
}
