// ==========================================
// 食品加工追溯系统 - 质检评估
// ==========================================
// 规则:
// - 五个固定参数, 每项评分一次, 分值 1~3
// - 任一项 < 3 → FAIL, 并列出不合格项
// - 全部 == 3 → PASS, 不合格列表为空
// ==========================================

use crate::domain::qc::{FailedParameter, QcOutcome, QcScore, QC_MAX_SCORE, QC_MIN_SCORE};
use crate::domain::types::{CheckStatus, QcParameter};
use crate::engine::error::ValidationError;

pub struct QcEvaluator;

impl QcEvaluator {
    /// 评估一组质检评分
    ///
    /// 不合格项按参数固定顺序输出, 与录入顺序无关
    pub fn evaluate(scores: &[QcScore]) -> Result<QcOutcome, ValidationError> {
        Self::check_completeness(scores)?;

        let mut ordered: Vec<&QcScore> = scores.iter().collect();
        ordered.sort_by_key(|s| s.parameter);

        let failed_parameters: Vec<FailedParameter> = ordered
            .into_iter()
            .filter(|s| s.score < QC_MAX_SCORE)
            .map(|s| FailedParameter {
                code: s.parameter.code().to_string(),
                name: s.parameter.name().to_string(),
                remarks: s.remarks.clone(),
            })
            .collect();

        let result = if failed_parameters.is_empty() {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };

        Ok(QcOutcome {
            result,
            failed_parameters,
        })
    }

    fn check_completeness(scores: &[QcScore]) -> Result<(), ValidationError> {
        for score in scores {
            if !(QC_MIN_SCORE..=QC_MAX_SCORE).contains(&score.score) {
                return Err(ValidationError::InvalidQcScores(format!(
                    "{} 分值 {} 不在 {}~{} 之间",
                    score.parameter.code(),
                    score.score,
                    QC_MIN_SCORE,
                    QC_MAX_SCORE
                )));
            }
        }

        for parameter in QcParameter::ALL {
            let count = scores.iter().filter(|s| s.parameter == parameter).count();
            match count {
                1 => {}
                0 => {
                    return Err(ValidationError::InvalidQcScores(format!(
                        "缺少参数 {} ({})",
                        parameter.code(),
                        parameter.name()
                    )))
                }
                _ => {
                    return Err(ValidationError::InvalidQcScores(format!(
                        "参数 {} 重复评分",
                        parameter.code()
                    )))
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_scores(score: u8) -> Vec<QcScore> {
        QcParameter::ALL
            .iter()
            .map(|p| QcScore::new(*p, score))
            .collect()
    }

    #[test]
    fn test_all_full_marks_pass() {
        let outcome = QcEvaluator::evaluate(&all_scores(3)).unwrap();
        assert_eq!(outcome.result, CheckStatus::Pass);
        assert!(outcome.failed_parameters.is_empty());
    }

    #[test]
    fn test_any_low_score_fails() {
        for parameter in QcParameter::ALL {
            let mut scores = all_scores(3);
            for s in scores.iter_mut().filter(|s| s.parameter == parameter) {
                s.score = 2;
            }
            let outcome = QcEvaluator::evaluate(&scores).unwrap();
            assert_eq!(outcome.result, CheckStatus::Fail);
            assert_eq!(outcome.failed_parameters.len(), 1);
            assert_eq!(outcome.failed_parameters[0].code, parameter.code());
        }
    }

    #[test]
    fn test_failed_list_in_parameter_order() {
        let scores = vec![
            QcScore::new(QcParameter::ForeignMatter, 1).with_remarks("发现毛发"),
            QcScore::new(QcParameter::Texture, 3),
            QcScore::new(QcParameter::Odour, 3),
            QcScore::new(QcParameter::Colour, 2),
            QcScore::new(QcParameter::Appearance, 3),
        ];
        let outcome = QcEvaluator::evaluate(&scores).unwrap();
        let codes: Vec<&str> = outcome
            .failed_parameters
            .iter()
            .map(|f| f.code.as_str())
            .collect();
        assert_eq!(codes, vec!["QC02", "QC05"]);
        assert_eq!(
            outcome.failed_parameters[1].remarks.as_deref(),
            Some("发现毛发")
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let mut missing = all_scores(3);
        missing.pop();
        assert!(QcEvaluator::evaluate(&missing).is_err());

        let mut duplicate = all_scores(3);
        duplicate.push(QcScore::new(QcParameter::Appearance, 3));
        assert!(QcEvaluator::evaluate(&duplicate).is_err());

        let mut out_of_range = all_scores(3);
        out_of_range[0].score = 0;
        assert!(QcEvaluator::evaluate(&out_of_range).is_err());
        out_of_range[0].score = 4;
        assert!(QcEvaluator::evaluate(&out_of_range).is_err());
    }
}
