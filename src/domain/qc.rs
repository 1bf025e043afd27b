// ==========================================
// 食品加工追溯系统 - 质检领域模型
// ==========================================
// 对齐: qc_check 表 (scores_json / failed_json)
// ==========================================

use crate::domain::types::{QcParameter, QcResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 质检满分
pub const QC_MAX_SCORE: u8 = 3;
/// 质检最低分
pub const QC_MIN_SCORE: u8 = 1;

/// 单项评分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcScore {
    pub parameter: QcParameter,
    pub score: u8,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl QcScore {
    pub fn new(parameter: QcParameter, score: u8) -> Self {
        Self {
            parameter,
            score,
            remarks: None,
        }
    }

    pub fn with_remarks(mut self, remarks: &str) -> Self {
        self.remarks = Some(remarks.to_string());
        self
    }
}

/// 不合格项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedParameter {
    pub code: String,
    pub name: String,
    pub remarks: Option<String>,
}

/// 评估结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcOutcome {
    pub result: QcResult,
    pub failed_parameters: Vec<FailedParameter>,
}

// ==========================================
// QcCheck - 质检记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcCheck {
    pub qc_id: String,
    pub step_run_id: String,
    pub scores: Vec<QcScore>,
    pub result: QcResult,
    pub failed_parameters: Vec<FailedParameter>,
    pub checked_by: Option<String>,
    pub checked_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQcCheck {
    pub scores: Vec<QcScore>,
    pub outcome: QcOutcome,
    #[serde(default)]
    pub checked_by: Option<String>,
}
