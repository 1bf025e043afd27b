// ==========================================
// 食品加工追溯系统 - 工序记录领域模型
// ==========================================
// 职责: 工序记录 (step run) 本体 + 详情聚合
// 对齐: step_run 表
// ==========================================

use crate::domain::metal::MetalCheckAttempt;
use crate::domain::packaging::{PackEntry, RemainderUsage, StorageAllocation};
use crate::domain::qc::QcCheck;
use crate::domain::sorting::{ReworkedLot, SortingOutput};
use crate::domain::types::{ChildKind, StepKind, StepRunStatus};
use crate::domain::waste::{WasteRecord, WeightCheck};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 表单字段组 (字段名 → 值)
pub type FieldMap = Map<String, JsonValue>;

// ==========================================
// StepRun - 工序记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRun {
    pub step_run_id: String,
    pub step_kind: StepKind,
    pub lot_id: String,           // 批次号
    pub available_qty: f64,       // 上游可用量 (已扣除前序损耗)
    pub status: StepRunStatus,
    pub fields: FieldMap,         // 表单字段组
    pub revision: i32,            // 每次写入 +1
    pub updated_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// StepRunUpsert - 写入请求
// ==========================================
// 说明:
// - 记录不存在时新建, step_kind 与 lot_id 必填
// - 记录存在时 fields 按字段覆盖合并, 其余 Option 字段仅在 Some 时更新
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepRunUpsert {
    #[serde(default)]
    pub step_kind: Option<StepKind>,
    #[serde(default)]
    pub lot_id: Option<String>,
    #[serde(default)]
    pub available_qty: Option<f64>,
    #[serde(default)]
    pub status: Option<StepRunStatus>,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub actor: Option<String>,
}

impl StepRunUpsert {
    /// 新建工序记录
    pub fn create(step_kind: StepKind, lot_id: &str, available_qty: f64) -> Self {
        Self {
            step_kind: Some(step_kind),
            lot_id: Some(lot_id.to_string()),
            available_qty: Some(available_qty),
            status: Some(StepRunStatus::Draft),
            ..Default::default()
        }
    }

    /// 仅写入字段组 (自动保存使用)
    pub fn fields_only(fields: FieldMap, actor: Option<String>) -> Self {
        Self {
            fields,
            actor,
            ..Default::default()
        }
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    pub fn with_field(mut self, key: &str, value: JsonValue) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

// ==========================================
// StepRunDetail - 工序记录 + 全部子记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRunDetail {
    pub run: StepRun,
    pub waste: Vec<WasteRecord>,
    pub outputs: Vec<SortingOutput>,
    pub reworks: Vec<ReworkedLot>,
    pub weight_checks: Vec<WeightCheck>,
    pub metal_attempts: Vec<MetalCheckAttempt>,
    pub pack_entries: Vec<PackEntry>,
    /// 以本工序包装条目为目标的余料复用
    pub remainder_usages_in: Vec<RemainderUsage>,
    pub storage_allocations: Vec<StorageAllocation>,
    pub qc_checks: Vec<QcCheck>,
}

impl StepRunDetail {
    /// 仅含工序记录本体的空详情
    pub fn empty(run: StepRun) -> Self {
        Self {
            run,
            waste: Vec::new(),
            outputs: Vec::new(),
            reworks: Vec::new(),
            weight_checks: Vec::new(),
            metal_attempts: Vec::new(),
            pack_entries: Vec::new(),
            remainder_usages_in: Vec::new(),
            storage_allocations: Vec::new(),
            qc_checks: Vec::new(),
        }
    }

    pub fn waste_total(&self) -> f64 {
        self.waste.iter().map(|w| w.quantity).sum()
    }

    pub fn outputs_total(&self) -> f64 {
        self.outputs.iter().map(|o| o.quantity).sum()
    }

    pub fn reworks_total(&self) -> f64 {
        self.reworks.iter().map(|r| r.quantity).sum()
    }

    pub fn rejections_total(&self) -> f64 {
        self.metal_attempts
            .iter()
            .flat_map(|a| a.rejections.iter())
            .map(|r| r.weight)
            .sum()
    }

    pub fn packed_total(&self) -> f64 {
        self.pack_entries.iter().map(|p| p.packed_qty()).sum()
    }

    pub fn remainder_total(&self) -> f64 {
        self.pack_entries.iter().map(|p| p.remainder_qty).sum()
    }

    /// 从前序包装余料复用进来的量
    pub fn reused_remainder_total(&self) -> f64 {
        self.remainder_usages_in.iter().map(|u| u.quantity).sum()
    }

    pub fn find_pack_entry(&self, pack_entry_id: &str) -> Option<&PackEntry> {
        self.pack_entries
            .iter()
            .find(|p| p.pack_entry_id == pack_entry_id)
    }

    /// 子记录是否挂在本工序记录下
    pub fn contains_child(&self, kind: ChildKind, child_id: &str) -> bool {
        match kind {
            ChildKind::Waste => self.waste.iter().any(|r| r.waste_id == child_id),
            ChildKind::SortingOutput => self.outputs.iter().any(|r| r.output_id == child_id),
            ChildKind::ReworkedLot => self.reworks.iter().any(|r| r.rework_id == child_id),
            ChildKind::WeightCheck => self.weight_checks.iter().any(|r| r.check_id == child_id),
            ChildKind::MetalCheckAttempt => {
                self.metal_attempts.iter().any(|r| r.attempt_id == child_id)
            }
            ChildKind::PackEntry => self.find_pack_entry(child_id).is_some(),
            ChildKind::RemainderUsage => {
                self.remainder_usages_in.iter().any(|r| r.usage_id == child_id)
            }
            ChildKind::StorageAllocation => self
                .storage_allocations
                .iter()
                .any(|r| r.allocation_id == child_id),
            ChildKind::QcCheck => self.qc_checks.iter().any(|r| r.qc_id == child_id),
        }
    }
}
