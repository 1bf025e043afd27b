// ==========================================
// 食品加工追溯系统 - 分选 API
// ==========================================
// 台账顺序: 产出 → 返工 → 损耗
// 新增记录超过该类别上限时拒绝, 返回超出量
// ==========================================

use crate::api::context::{StepApiContext, StepMutation};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::child::NewChild;
use crate::domain::sorting::{NewReworkedLot, NewSortingOutput};
use crate::domain::types::{LedgerCategory, StepKind};
use crate::engine::field_validation::parse_quantity;
use tracing::instrument;

pub struct SortingApi {
    ctx: StepApiContext,
}

impl SortingApi {
    pub fn new(ctx: StepApiContext) -> Self {
        Self { ctx }
    }

    fn positive_quantity(&self, raw: &str) -> ApiResult<f64> {
        let quantity = parse_quantity("quantity", raw).map_err(|e| self.ctx.report(e.into()))?;
        if quantity <= 0.0 {
            return Err(self.ctx.report(ApiError::InvalidInput("数量必须大于 0".to_string())));
        }
        Ok(quantity)
    }

    #[instrument(skip(self))]
    pub async fn add_output(
        &self,
        step_run_id: &str,
        product_id: &str,
        grade: Option<String>,
        quantity_raw: &str,
    ) -> ApiResult<StepMutation> {
        if product_id.trim().is_empty() {
            return Err(self.ctx.report(ApiError::InvalidInput("产品不能为空".to_string())));
        }
        let quantity = self.positive_quantity(quantity_raw)?;

        let detail = self.ctx.load_kind(step_run_id, StepKind::Sorting).await?;
        self.ctx
            .check_allocation(&detail, LedgerCategory::Outputs, quantity)
            .await?;

        self.ctx
            .commit_child(
                step_run_id,
                NewChild::SortingOutput(NewSortingOutput {
                    product_id: product_id.trim().to_string(),
                    grade,
                    quantity,
                }),
            )
            .await
    }

    /// 返工: 生成新批次号, 送往目标工序
    #[instrument(skip(self))]
    pub async fn add_rework(
        &self,
        step_run_id: &str,
        target_step: StepKind,
        quantity_raw: &str,
        reason: Option<String>,
    ) -> ApiResult<StepMutation> {
        let quantity = self.positive_quantity(quantity_raw)?;

        let detail = self.ctx.load_kind(step_run_id, StepKind::Sorting).await?;
        self.ctx
            .check_allocation(&detail, LedgerCategory::Reworks, quantity)
            .await?;

        self.ctx
            .commit_child(
                step_run_id,
                NewChild::ReworkedLot(NewReworkedLot {
                    target_step,
                    quantity,
                    reason,
                }),
            )
            .await
    }
}
