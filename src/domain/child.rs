// ==========================================
// 食品加工追溯系统 - 子记录统一封装
// ==========================================
// 用途: StepRecordStore::add_child 的入参/出参
// ==========================================

use crate::domain::metal::{MetalCheckAttempt, NewMetalCheckAttempt};
use crate::domain::packaging::{
    NewPackEntry, NewRemainderUsage, NewStorageAllocation, PackEntry, RemainderUsage,
    StorageAllocation,
};
use crate::domain::qc::{NewQcCheck, QcCheck};
use crate::domain::sorting::{NewReworkedLot, NewSortingOutput, ReworkedLot, SortingOutput};
use crate::domain::types::ChildKind;
use crate::domain::waste::{NewWasteRecord, NewWeightCheck, WasteRecord, WeightCheck};
use serde::{Deserialize, Serialize};

/// 待创建的子记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewChild {
    Waste(NewWasteRecord),
    SortingOutput(NewSortingOutput),
    ReworkedLot(NewReworkedLot),
    WeightCheck(NewWeightCheck),
    MetalCheckAttempt(NewMetalCheckAttempt),
    PackEntry(NewPackEntry),
    RemainderUsage(NewRemainderUsage),
    StorageAllocation(NewStorageAllocation),
    QcCheck(NewQcCheck),
}

impl NewChild {
    pub fn kind(&self) -> ChildKind {
        match self {
            NewChild::Waste(_) => ChildKind::Waste,
            NewChild::SortingOutput(_) => ChildKind::SortingOutput,
            NewChild::ReworkedLot(_) => ChildKind::ReworkedLot,
            NewChild::WeightCheck(_) => ChildKind::WeightCheck,
            NewChild::MetalCheckAttempt(_) => ChildKind::MetalCheckAttempt,
            NewChild::PackEntry(_) => ChildKind::PackEntry,
            NewChild::RemainderUsage(_) => ChildKind::RemainderUsage,
            NewChild::StorageAllocation(_) => ChildKind::StorageAllocation,
            NewChild::QcCheck(_) => ChildKind::QcCheck,
        }
    }
}

/// 已保存的子记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildRecord {
    Waste(WasteRecord),
    SortingOutput(SortingOutput),
    ReworkedLot(ReworkedLot),
    WeightCheck(WeightCheck),
    MetalCheckAttempt(MetalCheckAttempt),
    PackEntry(PackEntry),
    RemainderUsage(RemainderUsage),
    StorageAllocation(StorageAllocation),
    QcCheck(QcCheck),
}

impl ChildRecord {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildRecord::Waste(_) => ChildKind::Waste,
            ChildRecord::SortingOutput(_) => ChildKind::SortingOutput,
            ChildRecord::ReworkedLot(_) => ChildKind::ReworkedLot,
            ChildRecord::WeightCheck(_) => ChildKind::WeightCheck,
            ChildRecord::MetalCheckAttempt(_) => ChildKind::MetalCheckAttempt,
            ChildRecord::PackEntry(_) => ChildKind::PackEntry,
            ChildRecord::RemainderUsage(_) => ChildKind::RemainderUsage,
            ChildRecord::StorageAllocation(_) => ChildKind::StorageAllocation,
            ChildRecord::QcCheck(_) => ChildKind::QcCheck,
        }
    }

    /// 子记录主键
    pub fn id(&self) -> &str {
        match self {
            ChildRecord::Waste(r) => &r.waste_id,
            ChildRecord::SortingOutput(r) => &r.output_id,
            ChildRecord::ReworkedLot(r) => &r.rework_id,
            ChildRecord::WeightCheck(r) => &r.check_id,
            ChildRecord::MetalCheckAttempt(r) => &r.attempt_id,
            ChildRecord::PackEntry(r) => &r.pack_entry_id,
            ChildRecord::RemainderUsage(r) => &r.usage_id,
            ChildRecord::StorageAllocation(r) => &r.allocation_id,
            ChildRecord::QcCheck(r) => &r.qc_id,
        }
    }
}
