// ==========================================
// 食品加工追溯系统 - 金属检测校验
// ==========================================
// 规则:
// - FAIL: 至少一条剔除记录 (类型非空且重量 > 0)
// - PASS: 不允许有剔除记录
// - 完全空白的行忽略; 半填的行视为错误
// - check_no 为正且在工序记录内唯一
// ==========================================

use crate::domain::metal::{MetalCheckAttempt, NewMetalCheckAttempt, NewMetalRejection};
use crate::domain::types::CheckStatus;
use crate::engine::error::ValidationError;
use crate::engine::field_validation::ensure_unique_check_no;

pub struct MetalCheckValidator;

impl MetalCheckValidator {
    /// 校验并清理一次检测尝试
    ///
    /// # 返回
    /// - 去除空白行后的检测尝试
    pub fn validate(
        attempt: &NewMetalCheckAttempt,
        existing: &[MetalCheckAttempt],
    ) -> Result<NewMetalCheckAttempt, ValidationError> {
        ensure_unique_check_no(attempt.check_no, existing.iter().map(|a| a.check_no))?;

        let mut rejections = Vec::with_capacity(attempt.rejections.len());
        for (idx, row) in attempt.rejections.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            rejections.push(Self::clean_row(idx, row)?);
        }

        match attempt.status {
            CheckStatus::Fail if rejections.is_empty() => {
                Err(ValidationError::MetalCheckInconsistent(
                    "结论为 FAIL 时至少需要一条剔除记录".to_string(),
                ))
            }
            CheckStatus::Pass if !rejections.is_empty() => {
                Err(ValidationError::MetalCheckInconsistent(format!(
                    "结论为 PASS 时不应有剔除记录 (实际 {} 条)",
                    rejections.len()
                )))
            }
            _ => Ok(NewMetalCheckAttempt {
                rejections,
                ..attempt.clone()
            }),
        }
    }

    fn clean_row(idx: usize, row: &NewMetalRejection) -> Result<NewMetalRejection, ValidationError> {
        let object_type = row.object_type.trim();
        if object_type.is_empty() {
            return Err(ValidationError::MetalCheckInconsistent(format!(
                "第 {} 行剔除物类型为空",
                idx + 1
            )));
        }

        match row.weight {
            Some(w) if w.is_finite() && w > 0.0 => Ok(NewMetalRejection::new(object_type, w)),
            Some(w) => Err(ValidationError::MetalCheckInconsistent(format!(
                "第 {} 行剔除重量必须大于 0: {}",
                idx + 1,
                w
            ))),
            None => Err(ValidationError::MetalCheckInconsistent(format!(
                "第 {} 行缺少剔除重量",
                idx + 1
            ))),
        }
    }
}
