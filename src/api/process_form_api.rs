// ==========================================
// 食品加工追溯系统 - 清洗 / 干燥表单 API
// ==========================================
// 职责: 表单字段校验、提交, 称重复核
// 说明: 草稿字段由自动保存写入; 提交时完整校验并置为已完成
// ==========================================

use crate::api::context::{StepApiContext, StepMutation};
use crate::api::error::ApiResult;
use crate::domain::child::NewChild;
use crate::domain::forms::{DryingForm, WashingForm};
use crate::domain::step_run::{FieldMap, StepRun, StepRunUpsert};
use crate::domain::types::{StepKind, StepRunStatus};
use crate::domain::waste::NewWeightCheck;
use crate::engine::field_validation::{
    validate_drying_fields, validate_washing_fields, validate_weight_check,
};
use crate::notify::Notification;
use tracing::instrument;

/// 称重复核 (清洗/干燥/包装共用)
pub(crate) async fn record_weight_check(
    ctx: &StepApiContext,
    step_run_id: &str,
    expected: StepKind,
    check: NewWeightCheck,
) -> ApiResult<StepMutation> {
    let detail = ctx.load_kind(step_run_id, expected).await?;
    let tolerance_pct = ctx.weight_tolerance_pct().await;

    let checked = validate_weight_check(&check, &detail.weight_checks, tolerance_pct)
        .map_err(|e| ctx.report(e.into()))?;
    let within = checked.within_tolerance;

    let mutation = ctx
        .commit_child(step_run_id, NewChild::WeightCheck(checked))
        .await?;
    if !within {
        let no = check.check_no.to_string();
        ctx.notify(Notification::warning(
            "weight_check.out_of_tolerance",
            &[("check_no", no.as_str())],
        ));
    }
    Ok(mutation)
}

/// 已保存字段组与本次提交合并, 同名字段以本次提交为准
fn merged_fields(stored: &FieldMap, submitted: &FieldMap) -> FieldMap {
    let mut merged = stored.clone();
    merged.extend(submitted.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// 提交表单: 写入字段组并置为已完成
async fn submit_fields(
    ctx: &StepApiContext,
    step_run_id: &str,
    fields: FieldMap,
    actor: &str,
) -> ApiResult<StepRun> {
    let upsert = StepRunUpsert {
        status: Some(StepRunStatus::Completed),
        fields,
        ..Default::default()
    }
    .with_actor(actor);

    let run = ctx
        .store()
        .upsert(step_run_id, upsert)
        .await
        .map_err(|e| ctx.report(e.into()))?;
    ctx.notify(Notification::success("notify.submitted", &[]));
    Ok(run)
}

// ==========================================
// WashingApi
// ==========================================
pub struct WashingApi {
    ctx: StepApiContext,
}

impl WashingApi {
    pub fn new(ctx: StepApiContext) -> Self {
        Self { ctx }
    }

    /// 仅校验, 不写入
    pub fn validate_form(&self, fields: &FieldMap) -> ApiResult<WashingForm> {
        validate_washing_fields(fields).map_err(|e| self.ctx.report(e.into()))
    }

    #[instrument(skip(self, fields))]
    pub async fn submit_form(
        &self,
        step_run_id: &str,
        fields: FieldMap,
        actor: &str,
    ) -> ApiResult<StepRun> {
        let detail = self.ctx.load_kind(step_run_id, StepKind::Washing).await?;
        self.validate_form(&merged_fields(&detail.run.fields, &fields))?;
        submit_fields(&self.ctx, step_run_id, fields, actor).await
    }

    #[instrument(skip(self, check), fields(check_no = check.check_no))]
    pub async fn add_weight_check(
        &self,
        step_run_id: &str,
        check: NewWeightCheck,
    ) -> ApiResult<StepMutation> {
        record_weight_check(&self.ctx, step_run_id, StepKind::Washing, check).await
    }
}

// ==========================================
// DryingApi
// ==========================================
pub struct DryingApi {
    ctx: StepApiContext,
}

impl DryingApi {
    pub fn new(ctx: StepApiContext) -> Self {
        Self { ctx }
    }

    pub fn validate_form(&self, fields: &FieldMap) -> ApiResult<DryingForm> {
        validate_drying_fields(fields).map_err(|e| self.ctx.report(e.into()))
    }

    #[instrument(skip(self, fields))]
    pub async fn submit_form(
        &self,
        step_run_id: &str,
        fields: FieldMap,
        actor: &str,
    ) -> ApiResult<StepRun> {
        let detail = self.ctx.load_kind(step_run_id, StepKind::Drying).await?;
        self.validate_form(&merged_fields(&detail.run.fields, &fields))?;
        submit_fields(&self.ctx, step_run_id, fields, actor).await
    }

    #[instrument(skip(self, check), fields(check_no = check.check_no))]
    pub async fn add_weight_check(
        &self,
        step_run_id: &str,
        check: NewWeightCheck,
    ) -> ApiResult<StepMutation> {
        record_weight_check(&self.ctx, step_run_id, StepKind::Drying, check).await
    }
}
