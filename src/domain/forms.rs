// ==========================================
// 食品加工追溯系统 - 表单字段组
// ==========================================
// 职责: 清洗/干燥表单的强类型视图
// 说明: 草稿阶段字段以 FieldMap 保存, 提交时经
//       engine::field_validation 校验后得到这里的结构
// ==========================================

use crate::domain::types::{ContaminationStatus, YesNoNa};
use serde::{Deserialize, Serialize};

/// 字段名常量 (与 step_run.fields_json 的键一致)
pub mod field_keys {
    // 清洗
    pub const CHLORINE_PPM: &str = "chlorine_ppm";
    pub const WASH_DURATION_MIN: &str = "wash_duration_min";
    pub const VISUAL_STATUS: &str = "visual_status";
    pub const PEST_STATUS: &str = "pest_status";
    pub const MOULD_STATUS: &str = "mould_status";
    pub const FOREIGN_MATTER_REMOVED: &str = "foreign_matter_removed";

    // 干燥
    pub const INLET_TEMP_C: &str = "inlet_temp_c";
    pub const DRYING_DURATION_MIN: &str = "drying_duration_min";
    pub const FINAL_MOISTURE_PCT: &str = "final_moisture_pct";

    // 通用
    pub const REMARKS: &str = "remarks";
}

// ==========================================
// WashingForm - 清洗表单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WashingForm {
    pub chlorine_ppm: f64,       // 洗水余氯 (0~200 ppm)
    pub wash_duration_min: f64,  // 清洗时长 (分钟)
    pub visual_status: ContaminationStatus,
    pub pest_status: ContaminationStatus,
    pub mould_status: ContaminationStatus,
    pub foreign_matter_removed: YesNoNa,
    pub remarks: Option<String>,
}

// ==========================================
// DryingForm - 干燥表单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryingForm {
    pub inlet_temp_c: f64,          // 进风温度 (0~150 ℃)
    pub drying_duration_min: f64,   // 干燥时长 (分钟)
    pub final_moisture_pct: f64,    // 终水分 (0~100 %)
    pub visual_status: ContaminationStatus,
    pub remarks: Option<String>,
}
