// ==========================================
// 食品加工追溯系统 - 行映射工具
// ==========================================
// 约定: 时间统一存为 "%Y-%m-%d %H:%M:%S" 文本, 主键为 uuid v4
// ==========================================

use crate::domain::types::ParseEnumError;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use std::str::FromStr;

pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// 解析时间列, 失败映射为 FromSqlConversionFailure
pub fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 解析枚举列, 未知取值直接报错
pub fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 解析 JSON 列
pub fn parse_json<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::StepKind;

    #[test]
    fn test_ts_round_trip_truncates_subseconds() {
        let ts = chrono::NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_milli_opt(10, 20, 30, 999)
            .unwrap();
        let parsed = parse_ts(0, &format_ts(&ts)).unwrap();
        assert_eq!(parsed.format(TS_FORMAT).to_string(), "2026-05-04 10:20:30");
    }

    #[test]
    fn test_parse_enum_rejects_unknown() {
        assert_eq!(parse_enum::<StepKind>(1, "SORTING").unwrap(), StepKind::Sorting);
        assert!(parse_enum::<StepKind>(1, "FRYING").is_err());
    }
}
