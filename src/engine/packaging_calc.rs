// ==========================================
// 食品加工追溯系统 - 包装计算
// ==========================================
// 职责: 装箱拆分, 余料复用上限, 入库箱数上限
// ==========================================

use crate::domain::packaging::{
    BoxBreakdown, BoxPackRule, NewPackEntry, PackEntry, RemainderUsage, StorageAllocation,
};
use crate::engine::allocation::{validate_entry, AllocationError, Tolerance};
use crate::engine::error::{EngineResult, ValidationError};
use crate::engine::field_validation::ensure_positive;

pub struct PackagingCalculator;

impl PackagingCalculator {
    /// 装箱拆分: 整箱数 + 散包数
    pub fn box_breakdown(pack_count: u32, rule: &BoxPackRule) -> EngineResult<BoxBreakdown> {
        if rule.packs_per_box == 0 {
            return Err(ValidationError::Rule(format!(
                "装箱规则 {} 的每箱包数为 0",
                rule.rule_id
            ))
            .into());
        }

        Ok(BoxBreakdown {
            full_boxes: pack_count / rule.packs_per_box,
            loose_packs: pack_count % rule.packs_per_box,
        })
    }

    /// 校验包装条目
    pub fn validate_pack_entry(entry: &NewPackEntry) -> EngineResult<()> {
        if entry.product_id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "product_id".to_string(),
            }
            .into());
        }
        if entry.packaging_unit_id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "packaging_unit_id".to_string(),
            }
            .into());
        }
        ensure_positive("unit_weight", entry.unit_weight)?;
        if !entry.remainder_qty.is_finite() || entry.remainder_qty < 0.0 {
            return Err(AllocationError::NegativeInput {
                field: "remainder_qty".to_string(),
                value: entry.remainder_qty,
            }
            .into());
        }
        if entry.pack_count == 0 && entry.remainder_qty == 0.0 {
            return Err(ValidationError::Rule("包数与余料不能同时为 0".to_string()).into());
        }
        Ok(())
    }

    /// 源条目尚可复用的余料
    pub fn remainder_available(source: &PackEntry, usages: &[RemainderUsage]) -> f64 {
        let used: f64 = usages
            .iter()
            .filter(|u| u.source_pack_entry_id == source.pack_entry_id)
            .map(|u| u.quantity)
            .sum();
        source.remainder_qty - used
    }

    /// 校验余料复用: 累计复用量不得超过源条目余料
    pub fn validate_remainder_usage(
        source: &PackEntry,
        usages: &[RemainderUsage],
        quantity: f64,
        tolerance: Tolerance,
    ) -> EngineResult<()> {
        ensure_positive("quantity", quantity)?;
        let already_used = source.remainder_qty - Self::remainder_available(source, usages);
        validate_entry(already_used + quantity, source.remainder_qty, tolerance)?;
        Ok(())
    }

    /// 校验入库分配: 累计箱数不得超过条目占用箱数
    pub fn validate_storage_allocation(
        entry: &PackEntry,
        rule: &BoxPackRule,
        allocations: &[StorageAllocation],
        box_count: u32,
    ) -> EngineResult<BoxBreakdown> {
        if box_count == 0 {
            return Err(ValidationError::NotPositive {
                field: "box_count".to_string(),
                value: 0.0,
            }
            .into());
        }

        let breakdown = Self::box_breakdown(entry.pack_count, rule)?;
        // u64 累加, 箱数来自调用方输入
        let allocated: u64 = allocations
            .iter()
            .filter(|a| a.pack_entry_id == entry.pack_entry_id)
            .map(|a| u64::from(a.box_count))
            .sum();

        validate_entry(
            (allocated + u64::from(box_count)) as f64,
            f64::from(breakdown.total_boxes()),
            Tolerance::new(0.0),
        )?;
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::EngineError;

    fn ts() -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn rule(packs_per_box: u32) -> BoxPackRule {
        BoxPackRule {
            rule_id: "BR1".to_string(),
            packaging_unit_id: "U500".to_string(),
            packs_per_box,
        }
    }

    fn entry(pack_count: u32, remainder_qty: f64) -> PackEntry {
        PackEntry {
            pack_entry_id: "PE1".to_string(),
            step_run_id: "R1".to_string(),
            product_id: "P1".to_string(),
            packaging_unit_id: "U500".to_string(),
            pack_count,
            unit_weight: 0.5,
            remainder_qty,
            created_at: ts(),
        }
    }

    #[test]
    fn test_box_breakdown() {
        let b = PackagingCalculator::box_breakdown(25, &rule(12)).unwrap();
        assert_eq!(b, BoxBreakdown { full_boxes: 2, loose_packs: 1 });
        assert_eq!(b.total_boxes(), 3);

        let b = PackagingCalculator::box_breakdown(24, &rule(12)).unwrap();
        assert_eq!(b.total_boxes(), 2);

        assert!(PackagingCalculator::box_breakdown(24, &rule(0)).is_err());
    }

    #[test]
    fn test_remainder_usage_limit() {
        let source = entry(10, 1.2);
        let usages = vec![RemainderUsage {
            usage_id: "RU1".to_string(),
            step_run_id: "R2".to_string(),
            source_pack_entry_id: "PE1".to_string(),
            target_pack_entry_id: "PE9".to_string(),
            quantity: 0.7,
            created_at: ts(),
        }];

        assert!((PackagingCalculator::remainder_available(&source, &usages) - 0.5).abs() < 1e-9);
        assert!(PackagingCalculator::validate_remainder_usage(
            &source,
            &usages,
            0.5,
            Tolerance::default()
        )
        .is_ok());

        match PackagingCalculator::validate_remainder_usage(&source, &usages, 0.6, Tolerance::default()) {
            Err(EngineError::Allocation(AllocationError::OverAllocation { shortfall, .. })) => {
                assert!((shortfall - 0.1).abs() < 1e-9)
            }
            other => panic!("expected OverAllocation, got {:?}", other),
        }
    }

    #[test]
    fn test_storage_allocation_limit() {
        let pe = entry(25, 0.0);
        let existing = vec![StorageAllocation {
            allocation_id: "SA1".to_string(),
            step_run_id: "R1".to_string(),
            pack_entry_id: "PE1".to_string(),
            location: "A-01".to_string(),
            box_count: 2,
            created_at: ts(),
        }];

        assert!(PackagingCalculator::validate_storage_allocation(&pe, &rule(12), &existing, 1).is_ok());
        assert!(PackagingCalculator::validate_storage_allocation(&pe, &rule(12), &existing, 2).is_err());
        assert!(PackagingCalculator::validate_storage_allocation(&pe, &rule(12), &existing, 0).is_err());
    }

    #[test]
    fn test_storage_allocation_huge_box_count() {
        let pe = entry(25, 0.0);
        let existing = vec![StorageAllocation {
            allocation_id: "SA1".to_string(),
            step_run_id: "R1".to_string(),
            pack_entry_id: "PE1".to_string(),
            location: "A-01".to_string(),
            box_count: 1,
            created_at: ts(),
        }];

        match PackagingCalculator::validate_storage_allocation(&pe, &rule(12), &existing, u32::MAX) {
            Err(EngineError::Allocation(AllocationError::OverAllocation { cap, .. })) => {
                assert_eq!(cap, 3.0)
            }
            other => panic!("expected OverAllocation, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_pack_entry() {
        let mut e = NewPackEntry {
            product_id: "P1".to_string(),
            packaging_unit_id: "U500".to_string(),
            pack_count: 10,
            unit_weight: 0.5,
            remainder_qty: 0.0,
        };
        assert!(PackagingCalculator::validate_pack_entry(&e).is_ok());

        e.unit_weight = 0.0;
        assert!(PackagingCalculator::validate_pack_entry(&e).is_err());

        e.unit_weight = 0.5;
        e.pack_count = 0;
        assert!(PackagingCalculator::validate_pack_entry(&e).is_err());

        e.remainder_qty = -1.0;
        assert!(PackagingCalculator::validate_pack_entry(&e).is_err());
    }
}
