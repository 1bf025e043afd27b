// ==========================================
// 食品加工追溯系统 - 金属检测领域模型
// ==========================================
// 对齐: metal_check_attempt / metal_rejection 表
// ==========================================

use crate::domain::types::CheckStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// MetalCheckAttempt - 金属检测尝试
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetalCheckAttempt {
    pub attempt_id: String,
    pub step_run_id: String,
    pub check_no: i32,
    pub status: CheckStatus,
    pub remarks: Option<String>,
    pub checked_by: Option<String>,
    pub checked_at: NaiveDateTime,
    pub rejections: Vec<MetalRejection>,
}

impl MetalCheckAttempt {
    pub fn rejected_weight(&self) -> f64 {
        self.rejections.iter().map(|r| r.weight).sum()
    }
}

// ==========================================
// MetalRejection - 剔除物
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetalRejection {
    pub rejection_id: String,
    pub attempt_id: String,
    pub object_type: String, // 剔除物类型 (铁/不锈钢/...)
    pub weight: f64,
}

/// 新建检测尝试 (连同剔除行一起提交)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMetalCheckAttempt {
    pub check_no: i32,
    pub status: CheckStatus,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub checked_by: Option<String>,
    #[serde(default)]
    pub rejections: Vec<NewMetalRejection>,
}

/// 表单中的剔除行, 未经校验
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMetalRejection {
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl NewMetalRejection {
    pub fn new(object_type: &str, weight: f64) -> Self {
        Self {
            object_type: object_type.to_string(),
            weight: Some(weight),
        }
    }

    /// 整行为空 (表单中未填写的占位行)
    pub fn is_blank(&self) -> bool {
        self.object_type.trim().is_empty() && self.weight.is_none()
    }
}
