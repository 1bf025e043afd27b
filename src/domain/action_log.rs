// ==========================================
// 食品加工追溯系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub step_run_id: Option<String>, // 关联工序记录 (配置变更等为 None)
    pub action_type: ActionType,
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    pub fn new(step_run_id: Option<&str>, action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            step_run_id: step_run_id.map(str::to_string),
            action_type,
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateStepRun,  // 新建工序记录
    UpdateStepRun,  // 字段写入
    AddChild,       // 新增子记录
    DeleteChild,    // 删除子记录
    UpdateConfig,   // 配置变更
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateStepRun => "CREATE_STEP_RUN",
            ActionType::UpdateStepRun => "UPDATE_STEP_RUN",
            ActionType::AddChild => "ADD_CHILD",
            ActionType::DeleteChild => "DELETE_CHILD",
            ActionType::UpdateConfig => "UPDATE_CONFIG",
        }
    }

    /// 数据库读取时使用, 未知类型返回 None
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "CREATE_STEP_RUN" => Some(ActionType::CreateStepRun),
            "UPDATE_STEP_RUN" => Some(ActionType::UpdateStepRun),
            "ADD_CHILD" => Some(ActionType::AddChild),
            "DELETE_CHILD" => Some(ActionType::DeleteChild),
            "UPDATE_CONFIG" => Some(ActionType::UpdateConfig),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
