// ==========================================
// 食品加工追溯系统 - 金属检测 API
// ==========================================
// 检测结论与剔除记录必须一致:
// - FAIL 至少一条有效剔除 (类型非空, 重量 > 0)
// - PASS 不允许剔除
// 剔除重量计入金属检测台账
// ==========================================

use crate::api::context::{StepApiContext, StepMutation};
use crate::api::error::ApiResult;
use crate::domain::child::NewChild;
use crate::domain::metal::NewMetalCheckAttempt;
use crate::domain::types::{CheckStatus, LedgerCategory, StepKind};
use crate::engine::metal_check::MetalCheckValidator;
use crate::notify::Notification;
use tracing::instrument;

pub struct MetalDetectionApi {
    ctx: StepApiContext,
}

impl MetalDetectionApi {
    pub fn new(ctx: StepApiContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, attempt), fields(check_no = attempt.check_no))]
    pub async fn record_attempt(
        &self,
        step_run_id: &str,
        attempt: NewMetalCheckAttempt,
    ) -> ApiResult<StepMutation> {
        let detail = self
            .ctx
            .load_kind(step_run_id, StepKind::MetalDetection)
            .await?;

        let cleaned = MetalCheckValidator::validate(&attempt, &detail.metal_attempts)
            .map_err(|e| self.ctx.report(e.into()))?;

        let rejected: f64 = cleaned.rejections.iter().filter_map(|r| r.weight).sum();
        self.ctx
            .check_allocation(&detail, LedgerCategory::Rejections, rejected)
            .await?;

        let status = cleaned.status;
        let mutation = self
            .ctx
            .commit_child(step_run_id, NewChild::MetalCheckAttempt(cleaned))
            .await?;

        if status == CheckStatus::Fail {
            let weight = format!("{:.3}", rejected);
            self.ctx.notify(Notification::warning(
                "metal.rejected",
                &[("weight", weight.as_str())],
            ));
        }
        Ok(mutation)
    }
}
