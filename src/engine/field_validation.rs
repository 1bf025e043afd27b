// ==========================================
// 食品加工追溯系统 - 字段校验
// ==========================================
// 职责: 表单字段解析 (十进制字符串/数字/枚举) 与范围校验
// 红线: 校验失败不得触发任何存储调用
// ==========================================

use crate::domain::forms::{field_keys, DryingForm, WashingForm};
use crate::domain::step_run::FieldMap;
use crate::domain::types::ParseEnumError;
use crate::domain::waste::{NewWeightCheck, WeightCheck};
use crate::engine::error::ValidationError;
use serde_json::Value as JsonValue;
use std::str::FromStr;

// ==========================================
// 基础解析
// ==========================================

/// 解析数量字符串 (非负有限数)
///
/// # 示例
/// - "12.5" → 12.5
/// - "" → MissingField
/// - "abc" → NotANumber
/// - "-1" → OutOfRange
pub fn parse_quantity(field: &str, raw: &str) -> Result<f64, ValidationError> {
    let value = parse_number(field, raw)?;
    if value < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min: 0.0,
            max: f64::MAX,
        });
    }
    Ok(value)
}

fn parse_number(field: &str, raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::NotANumber {
            field: field.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// 读取数字字段 (兼容 JSON 数字与数字字符串)
pub fn read_number(fields: &FieldMap, key: &str) -> Result<f64, ValidationError> {
    match fields.get(key) {
        None | Some(JsonValue::Null) => Err(ValidationError::MissingField {
            field: key.to_string(),
        }),
        Some(JsonValue::Number(n)) => n.as_f64().ok_or_else(|| ValidationError::NotANumber {
            field: key.to_string(),
            value: n.to_string(),
        }),
        Some(JsonValue::String(s)) => parse_number(key, s),
        Some(other) => Err(ValidationError::NotANumber {
            field: key.to_string(),
            value: other.to_string(),
        }),
    }
}

/// 读取枚举字段
pub fn read_enum<T>(fields: &FieldMap, key: &str) -> Result<T, ValidationError>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw = match fields.get(key) {
        Some(JsonValue::String(s)) if !s.trim().is_empty() => s.as_str(),
        None | Some(JsonValue::Null) | Some(JsonValue::String(_)) => {
            return Err(ValidationError::MissingField {
                field: key.to_string(),
            })
        }
        Some(other) => {
            return Err(ValidationError::InvalidEnum {
                field: key.to_string(),
                source: ParseEnumError {
                    type_name: "字符串",
                    value: other.to_string(),
                },
            })
        }
    };

    raw.parse::<T>()
        .map_err(|source| ValidationError::InvalidEnum {
            field: key.to_string(),
            source,
        })
}

/// 读取可选文本字段 (空白视为未填)
pub fn read_optional_text(fields: &FieldMap, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn ensure_range(field: &str, value: f64, min: f64, max: f64) -> Result<f64, ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(value)
}

pub fn ensure_positive(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value <= 0.0 {
        return Err(ValidationError::NotPositive {
            field: field.to_string(),
            value,
        });
    }
    Ok(value)
}

// ==========================================
// 表单校验
// ==========================================

/// 校验清洗表单
pub fn validate_washing_fields(fields: &FieldMap) -> Result<WashingForm, ValidationError> {
    let chlorine_ppm = ensure_range(
        field_keys::CHLORINE_PPM,
        read_number(fields, field_keys::CHLORINE_PPM)?,
        0.0,
        200.0,
    )?;
    let wash_duration_min = ensure_positive(
        field_keys::WASH_DURATION_MIN,
        read_number(fields, field_keys::WASH_DURATION_MIN)?,
    )?;

    Ok(WashingForm {
        chlorine_ppm,
        wash_duration_min,
        visual_status: read_enum(fields, field_keys::VISUAL_STATUS)?,
        pest_status: read_enum(fields, field_keys::PEST_STATUS)?,
        mould_status: read_enum(fields, field_keys::MOULD_STATUS)?,
        foreign_matter_removed: read_enum(fields, field_keys::FOREIGN_MATTER_REMOVED)?,
        remarks: read_optional_text(fields, field_keys::REMARKS),
    })
}

/// 校验干燥表单
pub fn validate_drying_fields(fields: &FieldMap) -> Result<DryingForm, ValidationError> {
    let inlet_temp_c = ensure_range(
        field_keys::INLET_TEMP_C,
        read_number(fields, field_keys::INLET_TEMP_C)?,
        0.0,
        150.0,
    )?;
    let drying_duration_min = ensure_positive(
        field_keys::DRYING_DURATION_MIN,
        read_number(fields, field_keys::DRYING_DURATION_MIN)?,
    )?;
    let final_moisture_pct = ensure_range(
        field_keys::FINAL_MOISTURE_PCT,
        read_number(fields, field_keys::FINAL_MOISTURE_PCT)?,
        0.0,
        100.0,
    )?;

    Ok(DryingForm {
        inlet_temp_c,
        drying_duration_min,
        final_moisture_pct,
        visual_status: read_enum(fields, field_keys::VISUAL_STATUS)?,
        remarks: read_optional_text(fields, field_keys::REMARKS),
    })
}

// ==========================================
// 检查编号
// ==========================================

/// 检查编号必须为正且在工序记录内唯一
pub fn ensure_unique_check_no<I>(check_no: i32, existing: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = i32>,
{
    if check_no <= 0 {
        return Err(ValidationError::NotPositive {
            field: "check_no".to_string(),
            value: check_no as f64,
        });
    }
    if existing.into_iter().any(|n| n == check_no) {
        return Err(ValidationError::DuplicateCheckNumber(check_no));
    }
    Ok(())
}

/// 校验称重复核并计算是否在容差内
///
/// # 参数
/// - tolerance_pct: 允许偏差比例 (如 0.02 = 2%)
pub fn validate_weight_check(
    check: &NewWeightCheck,
    existing: &[WeightCheck],
    tolerance_pct: f64,
) -> Result<NewWeightCheck, ValidationError> {
    ensure_unique_check_no(check.check_no, existing.iter().map(|c| c.check_no))?;
    ensure_positive("target_weight", check.target_weight)?;
    ensure_positive("actual_weight", check.actual_weight)?;

    let allowed = check.target_weight * tolerance_pct.abs();
    let deviation = (check.actual_weight - check.target_weight).abs();

    Ok(NewWeightCheck {
        within_tolerance: deviation <= allowed + f64::EPSILON,
        ..check.clone()
    })
}
