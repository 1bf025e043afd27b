// ==========================================
// 食品加工追溯系统 - 质检 API
// ==========================================

use crate::api::context::{StepApiContext, StepMutation};
use crate::api::error::ApiResult;
use crate::domain::child::NewChild;
use crate::domain::qc::{NewQcCheck, QcOutcome, QcScore};
use crate::domain::types::{CheckStatus, StepKind};
use crate::engine::qc_evaluator::QcEvaluator;
use crate::notify::Notification;
use tracing::instrument;

pub struct QcApi {
    ctx: StepApiContext,
}

impl QcApi {
    pub fn new(ctx: StepApiContext) -> Self {
        Self { ctx }
    }

    /// 预览评估结果 (不写入)
    pub fn evaluate(&self, scores: &[QcScore]) -> ApiResult<QcOutcome> {
        QcEvaluator::evaluate(scores).map_err(|e| self.ctx.report(e.into()))
    }

    /// 提交质检: 评估后连同结论一起保存
    #[instrument(skip(self, scores))]
    pub async fn submit_check(
        &self,
        step_run_id: &str,
        scores: Vec<QcScore>,
        checked_by: Option<String>,
    ) -> ApiResult<StepMutation> {
        let outcome = self.evaluate(&scores)?;
        self.ctx.load_kind(step_run_id, StepKind::QcCheck).await?;

        let failed: Vec<&str> = outcome
            .failed_parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        let failed_list = failed.join(", ");
        let result = outcome.result;

        let mutation = self
            .ctx
            .commit_child(
                step_run_id,
                NewChild::QcCheck(NewQcCheck {
                    scores,
                    outcome,
                    checked_by,
                }),
            )
            .await?;

        if result == CheckStatus::Fail {
            self.ctx.notify(Notification::warning(
                "qc.failed",
                &[("parameters", failed_list.as_str())],
            ));
        }
        Ok(mutation)
    }
}
