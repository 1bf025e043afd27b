// ==========================================
// 食品加工追溯系统 - 工序台账配置
// ==========================================
// 职责: 按工序确定台账类别顺序, 由工序详情构建分配台账
// 依据: 同一台账实现, 通过工序配置参数化
// ==========================================

use crate::domain::step_run::StepRunDetail;
use crate::domain::types::{LedgerCategory, StepKind};
use crate::engine::allocation::{AllocationError, AllocationLedger, Tolerance};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ==========================================
// StepLedgerProfile - 工序台账配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLedgerProfile {
    pub step_kind: StepKind,
    pub category_order: Vec<LedgerCategory>,
}

impl StepLedgerProfile {
    /// 默认类别顺序
    pub fn default_order(kind: StepKind) -> &'static [LedgerCategory] {
        use LedgerCategory::*;
        match kind {
            StepKind::Washing | StepKind::Drying => &[Waste],
            StepKind::MetalDetection => &[Rejections],
            StepKind::Sorting => &[Outputs, Reworks, Waste],
            StepKind::Packaging => &[Packed, Remainder, Waste],
            StepKind::QcCheck => &[],
        }
    }

    pub fn for_step(kind: StepKind) -> Self {
        Self {
            step_kind: kind,
            category_order: Self::default_order(kind).to_vec(),
        }
    }

    /// 应用顺序覆盖
    ///
    /// 覆盖必须是默认类别集合的一个排列, 否则记录告警并保留默认顺序
    pub fn with_order_override(mut self, order: Option<&[LedgerCategory]>) -> Self {
        let Some(order) = order else {
            return self;
        };

        if is_permutation(order, &self.category_order) {
            self.category_order = order.to_vec();
        } else {
            warn!(
                step_kind = %self.step_kind,
                requested = ?order,
                default = ?self.category_order,
                "类别顺序覆盖无效, 使用默认顺序"
            );
        }
        self
    }

    /// 该工序是否有数量台账
    pub fn has_ledger(&self) -> bool {
        !self.category_order.is_empty()
    }
}

fn is_permutation(candidate: &[LedgerCategory], base: &[LedgerCategory]) -> bool {
    candidate.len() == base.len()
        && base.iter().all(|c| candidate.contains(c))
        && candidate.iter().all(|c| base.contains(c))
}

// ==========================================
// 台账构建
// ==========================================

/// 单个类别在工序详情中的合计
pub fn category_total(detail: &StepRunDetail, category: LedgerCategory) -> f64 {
    match category {
        LedgerCategory::Outputs => detail.outputs_total(),
        LedgerCategory::Reworks => detail.reworks_total(),
        LedgerCategory::Waste => detail.waste_total(),
        LedgerCategory::Rejections => detail.rejections_total(),
        LedgerCategory::Packed => detail.packed_total(),
        LedgerCategory::Remainder => detail.remainder_total(),
    }
}

/// 台账可用量 (包装工序额外计入复用进来的余料)
pub fn ledger_available(detail: &StepRunDetail) -> f64 {
    match detail.run.step_kind {
        StepKind::Packaging => detail.run.available_qty + detail.reused_remainder_total(),
        _ => detail.run.available_qty,
    }
}

/// 由工序详情构建分配台账
pub fn build_ledger(
    detail: &StepRunDetail,
    profile: &StepLedgerProfile,
    tolerance: Tolerance,
) -> Result<AllocationLedger, AllocationError> {
    let categories: Vec<(LedgerCategory, f64)> = profile
        .category_order
        .iter()
        .map(|c| (*c, category_total(detail, *c)))
        .collect();

    let ledger = AllocationLedger::new(ledger_available(detail), categories, tolerance)?;

    debug!(
        step_run_id = %detail.run.step_run_id,
        step_kind = %detail.run.step_kind,
        available = ledger.available_qty(),
        final_remaining = ledger.final_remaining(),
        "台账重算完成"
    );

    if ledger.is_over_budget() {
        warn!(
            step_run_id = %detail.run.step_run_id,
            final_remaining = ledger.final_remaining(),
            "已存在数据超出可用量"
        );
    }

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::packaging::{PackEntry, RemainderUsage};
    use crate::domain::sorting::{ReworkedLot, SortingOutput};
    use crate::domain::step_run::{FieldMap, StepRun};
    use crate::domain::types::{StepRunStatus, WasteType};
    use crate::domain::waste::WasteRecord;
    use chrono::NaiveDateTime;

    fn ts() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn run(kind: StepKind, available: f64) -> StepRun {
        StepRun {
            step_run_id: "R1".to_string(),
            step_kind: kind,
            lot_id: "LOT-1".to_string(),
            available_qty: available,
            status: StepRunStatus::InProgress,
            fields: FieldMap::new(),
            revision: 1,
            updated_by: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn sorting_detail() -> StepRunDetail {
        let mut detail = StepRunDetail::empty(run(StepKind::Sorting, 100.0));
        detail.outputs.push(SortingOutput {
            output_id: "O1".to_string(),
            step_run_id: "R1".to_string(),
            product_id: "P1".to_string(),
            grade: None,
            quantity: 40.0,
            created_at: ts(),
        });
        detail.reworks.push(ReworkedLot {
            rework_id: "RW1".to_string(),
            step_run_id: "R1".to_string(),
            new_lot_id: "LOT-2".to_string(),
            target_step: StepKind::Washing,
            quantity: 20.0,
            reason: None,
            created_at: ts(),
        });
        detail.waste.push(WasteRecord {
            waste_id: "W1".to_string(),
            step_run_id: "R1".to_string(),
            waste_type: WasteType::Trimming,
            quantity: 10.0,
            remarks: None,
            created_at: ts(),
        });
        detail
    }

    #[test]
    fn test_sorting_ledger() {
        let profile = StepLedgerProfile::for_step(StepKind::Sorting);
        let ledger = build_ledger(&sorting_detail(), &profile, Tolerance::default()).unwrap();

        let snapshot = ledger.snapshot();
        let remaining: Vec<f64> = snapshot.rows.iter().map(|r| r.remaining).collect();
        assert_eq!(remaining, vec![60.0, 40.0, 30.0]);

        match ledger.validate_addition(LedgerCategory::Outputs, 35.0) {
            Err(AllocationError::OverAllocation { shortfall, .. }) => {
                assert!((shortfall - 5.0).abs() < 1e-9)
            }
            other => panic!("expected OverAllocation, got {:?}", other),
        }
    }

    #[test]
    fn test_order_override() {
        let order = [
            LedgerCategory::Waste,
            LedgerCategory::Outputs,
            LedgerCategory::Reworks,
        ];
        let profile = StepLedgerProfile::for_step(StepKind::Sorting).with_order_override(Some(&order));
        assert_eq!(profile.category_order, order.to_vec());

        let ledger = build_ledger(&sorting_detail(), &profile, Tolerance::default()).unwrap();
        assert_eq!(ledger.slots()[0].remaining, 90.0);
    }

    #[test]
    fn test_invalid_override_keeps_default() {
        let bad = [LedgerCategory::Outputs, LedgerCategory::Packed];
        let profile = StepLedgerProfile::for_step(StepKind::Sorting).with_order_override(Some(&bad));
        assert_eq!(
            profile.category_order,
            StepLedgerProfile::default_order(StepKind::Sorting).to_vec()
        );

        let dup = [
            LedgerCategory::Outputs,
            LedgerCategory::Outputs,
            LedgerCategory::Waste,
        ];
        let profile = StepLedgerProfile::for_step(StepKind::Sorting).with_order_override(Some(&dup));
        assert_eq!(profile.category_order[1], LedgerCategory::Reworks);
    }

    #[test]
    fn test_packaging_adds_reused_remainder() {
        let mut detail = StepRunDetail::empty(run(StepKind::Packaging, 50.0));
        detail.pack_entries.push(PackEntry {
            pack_entry_id: "PE1".to_string(),
            step_run_id: "R1".to_string(),
            product_id: "P1".to_string(),
            packaging_unit_id: "U500".to_string(),
            pack_count: 100,
            unit_weight: 0.5,
            remainder_qty: 1.5,
            created_at: ts(),
        });
        detail.remainder_usages_in.push(RemainderUsage {
            usage_id: "U1".to_string(),
            step_run_id: "R1".to_string(),
            source_pack_entry_id: "PE0".to_string(),
            target_pack_entry_id: "PE1".to_string(),
            quantity: 2.0,
            created_at: ts(),
        });

        let profile = StepLedgerProfile::for_step(StepKind::Packaging);
        let ledger = build_ledger(&detail, &profile, Tolerance::default()).unwrap();
        assert_eq!(ledger.available_qty(), 52.0);
        assert!((ledger.final_remaining() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_qc_has_no_ledger() {
        let profile = StepLedgerProfile::for_step(StepKind::QcCheck);
        assert!(!profile.has_ledger());
        let detail = StepRunDetail::empty(run(StepKind::QcCheck, 10.0));
        let ledger = build_ledger(&detail, &profile, Tolerance::default()).unwrap();
        assert!(ledger.snapshot().rows.is_empty());
        assert_eq!(ledger.final_remaining(), 10.0);
    }
}
