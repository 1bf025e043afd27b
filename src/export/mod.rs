// ==========================================
// 食品加工追溯系统 - 追溯报表导出
// ==========================================
// 格式: CSV, 固定五列 (区段, 记录ID, 项目, 数量, 说明)
// 区段: RUN / FIELD / 子记录类型 / LEDGER
// ==========================================

use crate::domain::step_run::StepRunDetail;
use crate::engine::allocation::LedgerSnapshot;
use crate::repository::row_util::format_ts;
use csv::Writer;
use serde_json::Value as JsonValue;
use std::io::Write;
use thiserror::Error;

pub const REPORT_HEADER: &[&str] = &["section", "record_id", "item", "quantity", "detail"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

struct ReportWriter<W: Write> {
    wtr: Writer<W>,
    rows: usize,
}

impl<W: Write> ReportWriter<W> {
    fn row(
        &mut self,
        section: &str,
        record_id: &str,
        item: &str,
        quantity: Option<f64>,
        detail: &str,
    ) -> Result<(), ExportError> {
        let qty = quantity.map(|q| format!("{:.3}", q)).unwrap_or_default();
        self.wtr
            .write_record([section, record_id, item, qty.as_str(), detail])?;
        self.rows += 1;
        Ok(())
    }
}

fn field_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// 导出工序记录追溯报表
///
/// # 返回
/// - 写入的数据行数 (不含表头)
pub fn export_step_run_report<W: Write>(
    detail: &StepRunDetail,
    ledger: Option<&LedgerSnapshot>,
    writer: W,
) -> Result<usize, ExportError> {
    let mut out = ReportWriter {
        wtr: Writer::from_writer(writer),
        rows: 0,
    };
    out.wtr.write_record(REPORT_HEADER)?;

    let run = &detail.run;
    let id = run.step_run_id.as_str();
    out.row("RUN", id, "step_kind", None, run.step_kind.as_str())?;
    out.row("RUN", id, "lot_id", None, &run.lot_id)?;
    out.row("RUN", id, "status", None, run.status.as_str())?;
    out.row("RUN", id, "available_qty", Some(run.available_qty), "")?;
    out.row("RUN", id, "revision", None, &run.revision.to_string())?;
    out.row("RUN", id, "updated_at", None, &format_ts(&run.updated_at))?;

    for (key, value) in &run.fields {
        out.row("FIELD", id, key, None, &field_text(value))?;
    }

    for w in &detail.waste {
        let remarks = w.remarks.as_deref().unwrap_or("");
        out.row("WASTE", &w.waste_id, w.waste_type.as_str(), Some(w.quantity), remarks)?;
    }
    for o in &detail.outputs {
        let grade = o.grade.as_deref().unwrap_or("");
        out.row("SORTING_OUTPUT", &o.output_id, &o.product_id, Some(o.quantity), grade)?;
    }
    for r in &detail.reworks {
        let note = format!("{} → {}", r.new_lot_id, r.target_step);
        out.row("REWORKED_LOT", &r.rework_id, &r.new_lot_id, Some(r.quantity), &note)?;
    }
    for c in &detail.weight_checks {
        let note = format!(
            "target={:.3} within_tolerance={}",
            c.target_weight, c.within_tolerance
        );
        out.row("WEIGHT_CHECK", &c.check_id, &c.check_no.to_string(), Some(c.actual_weight), &note)?;
    }
    for a in &detail.metal_attempts {
        out.row(
            "METAL_CHECK",
            &a.attempt_id,
            &a.check_no.to_string(),
            Some(a.rejected_weight()),
            a.status.as_str(),
        )?;
        for r in &a.rejections {
            out.row("METAL_REJECTION", &r.rejection_id, &r.object_type, Some(r.weight), &a.attempt_id)?;
        }
    }
    for p in &detail.pack_entries {
        let note = format!(
            "{} × {:.3} remainder={:.3}",
            p.pack_count, p.unit_weight, p.remainder_qty
        );
        out.row("PACK_ENTRY", &p.pack_entry_id, &p.product_id, Some(p.packed_qty()), &note)?;
    }
    for u in &detail.remainder_usages_in {
        let note = format!("{} → {}", u.source_pack_entry_id, u.target_pack_entry_id);
        out.row("REMAINDER_USAGE", &u.usage_id, &u.source_pack_entry_id, Some(u.quantity), &note)?;
    }
    for s in &detail.storage_allocations {
        out.row(
            "STORAGE_ALLOCATION",
            &s.allocation_id,
            &s.location,
            Some(f64::from(s.box_count)),
            &s.pack_entry_id,
        )?;
    }
    for q in &detail.qc_checks {
        let failed: Vec<&str> = q.failed_parameters.iter().map(|p| p.code.as_str()).collect();
        out.row("QC_CHECK", &q.qc_id, q.result.as_str(), None, &failed.join("|"))?;
    }

    if let Some(snapshot) = ledger {
        for row in &snapshot.rows {
            let note = format!("cap={:.3} remaining={:.3}", row.cap, row.remaining);
            out.row("LEDGER", id, row.category.as_str(), Some(row.total), &note)?;
        }
        let note = if snapshot.over_budget { "OVER_BUDGET" } else { "" };
        out.row("LEDGER", id, "final_remaining", Some(snapshot.final_remaining), note)?;
    }

    out.wtr.flush()?;
    Ok(out.rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step_run::{FieldMap, StepRun};
    use crate::domain::types::{StepKind, StepRunStatus, WasteType};
    use crate::domain::waste::WasteRecord;
    use crate::engine::allocation::{AllocationLedger, Tolerance};
    use crate::domain::types::LedgerCategory;
    use chrono::NaiveDate;

    fn ts() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_export_contains_run_children_and_ledger() {
        let mut fields = FieldMap::new();
        fields.insert("chlorine_ppm".to_string(), serde_json::json!(50));
        let run = StepRun {
            step_run_id: "SR-1".to_string(),
            step_kind: StepKind::Washing,
            lot_id: "LOT-1".to_string(),
            available_qty: 100.0,
            status: StepRunStatus::Draft,
            fields,
            revision: 2,
            updated_by: None,
            created_at: ts(),
            updated_at: ts(),
        };
        let mut detail = StepRunDetail::empty(run);
        detail.waste.push(WasteRecord {
            waste_id: "W-1".to_string(),
            step_run_id: "SR-1".to_string(),
            waste_type: WasteType::Trimming,
            quantity: 12.5,
            remarks: None,
            created_at: ts(),
        });

        let ledger = AllocationLedger::new(100.0, vec![(LedgerCategory::Waste, 12.5)], Tolerance::default())
            .unwrap()
            .snapshot();

        let mut buf = Vec::new();
        let rows = export_step_run_report(&detail, Some(&ledger), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(rows, 6 + 1 + 1 + 2);
        assert!(text.starts_with("section,record_id,item,quantity,detail"));
        assert!(text.contains("FIELD,SR-1,chlorine_ppm,,50"));
        assert!(text.contains("WASTE,W-1"));
        assert!(text.contains("LEDGER,SR-1,final_remaining,87.500,"));
    }
}
