// ==========================================
// 食品加工追溯系统 - 领域类型定义
// ==========================================
// 职责: 工序/状态/类别等封闭枚举
// 约束: 字符串只在边界处解析, 未知取值直接拒绝, 不做默认兜底
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ==========================================
// 枚举解析错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("无效的{type_name}取值: '{value}'")]
pub struct ParseEnumError {
    pub type_name: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(type_name: &'static str, value: &str) -> Self {
        Self {
            type_name,
            value: value.to_string(),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_uppercase().replace(['-', ' '], "_")
}

// ==========================================
// 工序类型 (Step Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    Washing,        // 清洗
    Drying,         // 干燥
    MetalDetection, // 金属检测
    Sorting,        // 分选
    Packaging,      // 包装
    QcCheck,        // 质检
}

impl StepKind {
    pub const ALL: [StepKind; 6] = [
        StepKind::Washing,
        StepKind::Drying,
        StepKind::MetalDetection,
        StepKind::Sorting,
        StepKind::Packaging,
        StepKind::QcCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Washing => "WASHING",
            StepKind::Drying => "DRYING",
            StepKind::MetalDetection => "METAL_DETECTION",
            StepKind::Sorting => "SORTING",
            StepKind::Packaging => "PACKAGING",
            StepKind::QcCheck => "QC_CHECK",
        }
    }

    /// 该工序允许挂载的子记录类型
    pub fn allowed_children(&self) -> &'static [ChildKind] {
        match self {
            StepKind::Washing | StepKind::Drying => &[ChildKind::Waste, ChildKind::WeightCheck],
            StepKind::MetalDetection => &[ChildKind::MetalCheckAttempt],
            StepKind::Sorting => &[
                ChildKind::SortingOutput,
                ChildKind::ReworkedLot,
                ChildKind::Waste,
            ],
            StepKind::Packaging => &[
                ChildKind::PackEntry,
                ChildKind::RemainderUsage,
                ChildKind::StorageAllocation,
                ChildKind::Waste,
                ChildKind::WeightCheck,
            ],
            StepKind::QcCheck => &[ChildKind::QcCheck],
        }
    }

    pub fn accepts(&self, child: ChildKind) -> bool {
        self.allowed_children().contains(&child)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "WASHING" => Ok(StepKind::Washing),
            "DRYING" => Ok(StepKind::Drying),
            "METAL_DETECTION" => Ok(StepKind::MetalDetection),
            "SORTING" => Ok(StepKind::Sorting),
            "PACKAGING" => Ok(StepKind::Packaging),
            "QC_CHECK" => Ok(StepKind::QcCheck),
            _ => Err(ParseEnumError::new("工序类型", s)),
        }
    }
}

// ==========================================
// 工序记录状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepRunStatus {
    Draft,      // 草稿
    InProgress, // 进行中
    Completed,  // 已完成
}

impl StepRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepRunStatus::Draft => "DRAFT",
            StepRunStatus::InProgress => "IN_PROGRESS",
            StepRunStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for StepRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StepRunStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "DRAFT" => Ok(StepRunStatus::Draft),
            "IN_PROGRESS" => Ok(StepRunStatus::InProgress),
            "COMPLETED" => Ok(StepRunStatus::Completed),
            _ => Err(ParseEnumError::new("工序记录状态", s)),
        }
    }
}

// ==========================================
// 是/否/不适用
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNoNa {
    #[serde(rename = "Yes")]
    Yes,
    #[serde(rename = "No")]
    No,
    #[serde(rename = "NA")]
    Na,
}

impl YesNoNa {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNoNa::Yes => "Yes",
            YesNoNa::No => "No",
            YesNoNa::Na => "NA",
        }
    }
}

impl fmt::Display for YesNoNa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for YesNoNa {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "YES" | "Y" => Ok(YesNoNa::Yes),
            "NO" | "N" => Ok(YesNoNa::No),
            "NA" | "N/A" => Ok(YesNoNa::Na),
            _ => Err(ParseEnumError::new("是/否/不适用", s)),
        }
    }
}

// ==========================================
// 目视/虫害/霉变检查结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContaminationStatus {
    Absent,     // 未发现
    Present,    // 发现
    NotChecked, // 未检查
}

impl ContaminationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContaminationStatus::Absent => "ABSENT",
            ContaminationStatus::Present => "PRESENT",
            ContaminationStatus::NotChecked => "NOT_CHECKED",
        }
    }
}

impl fmt::Display for ContaminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContaminationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "ABSENT" | "OK" | "CLEAN" => Ok(ContaminationStatus::Absent),
            "PRESENT" | "FOUND" => Ok(ContaminationStatus::Present),
            "NOT_CHECKED" => Ok(ContaminationStatus::NotChecked),
            _ => Err(ParseEnumError::new("污染检查结果", s)),
        }
    }
}

// ==========================================
// 检查结论 (金属检测 / 质检)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// 质检总体结论与检查结论同构
pub type QcResult = CheckStatus;

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CheckStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "PASS" => Ok(CheckStatus::Pass),
            "FAIL" => Ok(CheckStatus::Fail),
            _ => Err(ParseEnumError::new("检查结论", s)),
        }
    }
}

// ==========================================
// 质检参数 (固定 5 项)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QcParameter {
    Appearance,    // 外观
    Colour,        // 色泽
    Odour,         // 气味
    Texture,       // 质地
    ForeignMatter, // 异物
}

impl QcParameter {
    pub const ALL: [QcParameter; 5] = [
        QcParameter::Appearance,
        QcParameter::Colour,
        QcParameter::Odour,
        QcParameter::Texture,
        QcParameter::ForeignMatter,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            QcParameter::Appearance => "QC01",
            QcParameter::Colour => "QC02",
            QcParameter::Odour => "QC03",
            QcParameter::Texture => "QC04",
            QcParameter::ForeignMatter => "QC05",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QcParameter::Appearance => "Appearance",
            QcParameter::Colour => "Colour",
            QcParameter::Odour => "Odour",
            QcParameter::Texture => "Texture",
            QcParameter::ForeignMatter => "Foreign matter",
        }
    }
}

impl fmt::Display for QcParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for QcParameter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        QcParameter::ALL
            .iter()
            .copied()
            .find(|p| p.code() == key || normalize(p.name()) == key)
            .or(match key.as_str() {
                "COLOR" => Some(QcParameter::Colour),
                "ODOR" => Some(QcParameter::Odour),
                _ => None,
            })
            .ok_or_else(|| ParseEnumError::new("质检参数", s))
    }
}

// ==========================================
// 数量台账类别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerCategory {
    Outputs,    // 产出
    Reworks,    // 返工
    Waste,      // 损耗/废料
    Rejections, // 金属检测剔除
    Packed,     // 已包装
    Remainder,  // 包装余料
}

impl LedgerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerCategory::Outputs => "OUTPUTS",
            LedgerCategory::Reworks => "REWORKS",
            LedgerCategory::Waste => "WASTE",
            LedgerCategory::Rejections => "REJECTIONS",
            LedgerCategory::Packed => "PACKED",
            LedgerCategory::Remainder => "REMAINDER",
        }
    }
}

impl fmt::Display for LedgerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LedgerCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "OUTPUTS" => Ok(LedgerCategory::Outputs),
            "REWORKS" => Ok(LedgerCategory::Reworks),
            "WASTE" => Ok(LedgerCategory::Waste),
            "REJECTIONS" => Ok(LedgerCategory::Rejections),
            "PACKED" => Ok(LedgerCategory::Packed),
            "REMAINDER" => Ok(LedgerCategory::Remainder),
            _ => Err(ParseEnumError::new("台账类别", s)),
        }
    }
}

// ==========================================
// 子记录类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildKind {
    Waste,
    SortingOutput,
    ReworkedLot,
    WeightCheck,
    MetalCheckAttempt,
    PackEntry,
    RemainderUsage,
    StorageAllocation,
    QcCheck,
}

impl ChildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::Waste => "WASTE",
            ChildKind::SortingOutput => "SORTING_OUTPUT",
            ChildKind::ReworkedLot => "REWORKED_LOT",
            ChildKind::WeightCheck => "WEIGHT_CHECK",
            ChildKind::MetalCheckAttempt => "METAL_CHECK_ATTEMPT",
            ChildKind::PackEntry => "PACK_ENTRY",
            ChildKind::RemainderUsage => "REMAINDER_USAGE",
            ChildKind::StorageAllocation => "STORAGE_ALLOCATION",
            ChildKind::QcCheck => "QC_CHECK",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChildKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "WASTE" => Ok(ChildKind::Waste),
            "SORTING_OUTPUT" => Ok(ChildKind::SortingOutput),
            "REWORKED_LOT" => Ok(ChildKind::ReworkedLot),
            "WEIGHT_CHECK" => Ok(ChildKind::WeightCheck),
            "METAL_CHECK_ATTEMPT" => Ok(ChildKind::MetalCheckAttempt),
            "PACK_ENTRY" => Ok(ChildKind::PackEntry),
            "REMAINDER_USAGE" => Ok(ChildKind::RemainderUsage),
            "STORAGE_ALLOCATION" => Ok(ChildKind::StorageAllocation),
            "QC_CHECK" => Ok(ChildKind::QcCheck),
            _ => Err(ParseEnumError::new("子记录类型", s)),
        }
    }
}

// ==========================================
// 损耗类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WasteType {
    Trimming,     // 修整
    Spillage,     // 洒落
    Spoilage,     // 腐坏
    MoistureLoss, // 失水
    Other,        // 其他
}

impl WasteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteType::Trimming => "TRIMMING",
            WasteType::Spillage => "SPILLAGE",
            WasteType::Spoilage => "SPOILAGE",
            WasteType::MoistureLoss => "MOISTURE_LOSS",
            WasteType::Other => "OTHER",
        }
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WasteType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "TRIMMING" => Ok(WasteType::Trimming),
            "SPILLAGE" => Ok(WasteType::Spillage),
            "SPOILAGE" => Ok(WasteType::Spoilage),
            "MOISTURE_LOSS" => Ok(WasteType::MoistureLoss),
            "OTHER" => Ok(WasteType::Other),
            _ => Err(ParseEnumError::new("损耗类型", s)),
        }
    }
}
