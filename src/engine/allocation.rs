// ==========================================
// 食品加工追溯系统 - 数量分配台账
// ==========================================
// 职责: 给定可用量与有序类别合计, 计算各类别上限与剩余
// 红线: 纯函数, 无副作用; 同样输入必得同样输出
// ==========================================
// 规则:
// - cap[i]       = available - sum(totals[0..i])
// - remaining[i] = cap[i] - totals[i]
// - 新增条目超出上限即拒绝 (容差 epsilon 吸收浮点误差)
// - 已存在数据超出预算只产生告警, 不改写数据
// ==========================================

use crate::domain::types::LedgerCategory;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 默认容差 (吸收十进制字符串往返带来的浮点误差)
pub const DEFAULT_TOLERANCE_EPSILON: f64 = 1e-6;

// ==========================================
// Tolerance - 比较容差
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub epsilon: f64,
}

impl Tolerance {
    /// 负数取绝对值, 非有限数回退默认值
    pub fn new(epsilon: f64) -> Self {
        if epsilon.is_finite() {
            Self {
                epsilon: epsilon.abs(),
            }
        } else {
            Self::default()
        }
    }

    /// value 是否超出 limit (超出量大于 epsilon)
    pub fn exceeds(&self, value: f64, limit: f64) -> bool {
        value - limit > self.epsilon
    }

    /// value 是否低于 0 (超出容差)
    pub fn is_negative(&self, value: f64) -> bool {
        value < -self.epsilon
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_TOLERANCE_EPSILON,
        }
    }
}

// ==========================================
// AllocationError - 台账错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("数量超出可分配上限: 申请合计={candidate}, 上限={cap}, 超出={shortfall}")]
    OverAllocation {
        candidate: f64,
        cap: f64,
        shortfall: f64,
    },

    #[error("数量必须为非负有限数: {field}={value}")]
    NegativeInput { field: String, value: f64 },

    #[error("类别不在台账中: {0}")]
    UnknownCategory(LedgerCategory),
}

fn ensure_non_negative(field: &str, value: f64) -> Result<(), AllocationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AllocationError::NegativeInput {
            field: field.to_string(),
            value,
        })
    }
}

// ==========================================
// AllocationSlot - 单类别结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlot {
    /// 处理该类别前的上限 (可能为负)
    pub cap: f64,
    /// 扣除该类别后的剩余 (可能为负, 作为告警信号)
    pub remaining: f64,
}

impl AllocationSlot {
    /// 展示用上限, 下限截断为 0
    pub fn display_cap(&self) -> f64 {
        self.cap.max(0.0)
    }
}

/// 计算各类别的 (上限, 剩余)
///
/// # 参数
/// - available_qty: 可用量 (>= 0)
/// - category_totals: 按顺序排列的类别合计 (每项 >= 0)
///
/// # 返回
/// - 与输入同序的 AllocationSlot 列表
pub fn compute_remaining(
    available_qty: f64,
    category_totals: &[f64],
) -> Result<Vec<AllocationSlot>, AllocationError> {
    ensure_non_negative("available_qty", available_qty)?;

    let mut consumed = 0.0;
    let mut slots = Vec::with_capacity(category_totals.len());
    for (i, total) in category_totals.iter().copied().enumerate() {
        ensure_non_negative(&format!("category_totals[{}]", i), total)?;
        let cap = available_qty - consumed;
        slots.push(AllocationSlot {
            cap,
            remaining: cap - total,
        });
        consumed += total;
    }
    Ok(slots)
}

/// 校验单次录入是否超出上限
///
/// candidate == cap 时永远通过
pub fn validate_entry(
    candidate_qty: f64,
    cap: f64,
    tolerance: Tolerance,
) -> Result<(), AllocationError> {
    if tolerance.exceeds(candidate_qty, cap) {
        return Err(AllocationError::OverAllocation {
            candidate: candidate_qty,
            cap,
            shortfall: candidate_qty - cap,
        });
    }
    Ok(())
}

// ==========================================
// AllocationLedger - 分配台账
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: LedgerCategory,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLedger {
    available_qty: f64,
    categories: Vec<CategoryTotal>,
    tolerance: Tolerance,
}

impl AllocationLedger {
    /// 创建台账
    ///
    /// # 参数
    /// - available_qty: 可用量
    /// - categories: 有序的 (类别, 合计)
    /// - tolerance: 比较容差
    pub fn new(
        available_qty: f64,
        categories: Vec<(LedgerCategory, f64)>,
        tolerance: Tolerance,
    ) -> Result<Self, AllocationError> {
        ensure_non_negative("available_qty", available_qty)?;
        for (category, total) in &categories {
            ensure_non_negative(category.as_str(), *total)?;
        }

        Ok(Self {
            available_qty,
            categories: categories
                .into_iter()
                .map(|(category, total)| CategoryTotal { category, total })
                .collect(),
            tolerance,
        })
    }

    pub fn available_qty(&self) -> f64 {
        self.available_qty
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn categories(&self) -> &[CategoryTotal] {
        &self.categories
    }

    /// 按顺序计算各类别的上限/剩余
    pub fn slots(&self) -> Vec<AllocationSlot> {
        let totals: Vec<f64> = self.categories.iter().map(|c| c.total).collect();
        // 构造时已校验非负, 这里不会失败
        compute_remaining(self.available_qty, &totals).unwrap_or_default()
    }

    pub fn total_of(&self, category: LedgerCategory) -> Result<f64, AllocationError> {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.total)
            .ok_or(AllocationError::UnknownCategory(category))
    }

    pub fn total_allocated(&self) -> f64 {
        self.categories.iter().map(|c| c.total).sum()
    }

    pub fn final_remaining(&self) -> f64 {
        self.available_qty - self.total_allocated()
    }

    /// 该类别合计允许达到的上限 = 可用量 - 其他类别合计
    pub fn cap_for(&self, category: LedgerCategory) -> Result<f64, AllocationError> {
        let own = self.total_of(category)?;
        let others = self.total_allocated() - own;
        Ok(self.available_qty - others)
    }

    /// 该类别还能再接收的量 (可能为负)
    pub fn headroom_for(&self, category: LedgerCategory) -> Result<f64, AllocationError> {
        Ok(self.cap_for(category)? - self.total_of(category)?)
    }

    /// 校验追加一条记录
    pub fn validate_addition(
        &self,
        category: LedgerCategory,
        candidate_qty: f64,
    ) -> Result<(), AllocationError> {
        ensure_non_negative(category.as_str(), candidate_qty)?;
        let new_total = self.total_of(category)? + candidate_qty;
        validate_entry(new_total, self.cap_for(category)?, self.tolerance)
    }

    /// 校验修改一条已有记录 (old → new)
    pub fn validate_replacement(
        &self,
        category: LedgerCategory,
        old_qty: f64,
        new_qty: f64,
    ) -> Result<(), AllocationError> {
        ensure_non_negative(category.as_str(), new_qty)?;
        let new_total = self.total_of(category)? - old_qty + new_qty;
        validate_entry(new_total, self.cap_for(category)?, self.tolerance)
    }

    /// 已超出预算 (数据已存在, 仅告警)
    pub fn is_over_budget(&self) -> bool {
        self.tolerance.is_negative(self.final_remaining())
    }

    /// 剩余为负的类别
    pub fn warnings(&self) -> Vec<LedgerWarning> {
        self.categories
            .iter()
            .zip(self.slots())
            .filter(|(_, slot)| self.tolerance.is_negative(slot.remaining))
            .map(|(c, slot)| LedgerWarning {
                category: c.category,
                remaining: slot.remaining,
            })
            .collect()
    }

    /// 展示用快照
    pub fn snapshot(&self) -> LedgerSnapshot {
        let rows = self
            .categories
            .iter()
            .zip(self.slots())
            .map(|(c, slot)| LedgerRow {
                category: c.category,
                total: c.total,
                cap: slot.cap,
                display_cap: slot.display_cap(),
                remaining: slot.remaining,
            })
            .collect();

        LedgerSnapshot {
            available_qty: self.available_qty,
            rows,
            total_allocated: self.total_allocated(),
            final_remaining: self.final_remaining(),
            over_budget: self.is_over_budget(),
            warnings: self.warnings(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerWarning {
    pub category: LedgerCategory,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub category: LedgerCategory,
    pub total: f64,
    pub cap: f64,
    pub display_cap: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub available_qty: f64,
    pub rows: Vec<LedgerRow>,
    pub total_allocated: f64,
    pub final_remaining: f64,
    pub over_budget: bool,
    pub warnings: Vec<LedgerWarning>,
}
