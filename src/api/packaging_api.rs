// ==========================================
// 食品加工追溯系统 - 包装 API
// ==========================================
// 职责:
// 1. 包装条目 (包数 × 单包净重 + 余料), 受包装台账约束
// 2. 余料复用 (不得超过源条目剩余余料)
// 3. 入库分配 (不得超过条目占用箱数, 箱规取自 box_pack_rule)
// 4. 称重复核
// 5. 照片上传 (未接入存储, 仅提示)
// ==========================================

use crate::api::context::{StepApiContext, StepMutation};
use crate::api::error::{ApiError, ApiResult};
use crate::api::process_form_api::record_weight_check;
use crate::domain::child::NewChild;
use crate::domain::packaging::{
    BoxBreakdown, BoxPackRule, NewPackEntry, NewRemainderUsage, NewStorageAllocation,
    PackagingUnit,
};
use crate::domain::types::{LedgerCategory, StepKind};
use crate::domain::waste::NewWeightCheck;
use crate::engine::packaging_calc::PackagingCalculator;
use crate::notify::Notification;
use crate::repository::PackagingRepository;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct PackagingApi {
    ctx: StepApiContext,
    packaging_repo: Arc<PackagingRepository>,
}

impl PackagingApi {
    pub fn new(ctx: StepApiContext, packaging_repo: Arc<PackagingRepository>) -> Self {
        Self {
            ctx,
            packaging_repo,
        }
    }

    pub fn list_packaging_units(&self) -> ApiResult<Vec<PackagingUnit>> {
        self.packaging_repo
            .list_packaging_units()
            .map_err(|e| self.ctx.report(e.into()))
    }

    /// 查询箱规
    pub fn lookup_box_rule(&self, packaging_unit_id: &str) -> ApiResult<BoxPackRule> {
        self.packaging_repo
            .lookup_box_rule(packaging_unit_id)
            .map_err(|e| self.ctx.report(e.into()))?
            .ok_or_else(|| {
                self.ctx.report(ApiError::NotFound(format!(
                    "包装规格{}未配置箱规",
                    packaging_unit_id
                )))
            })
    }

    /// 按箱规计算整箱数 / 散包数
    pub fn box_breakdown(&self, packaging_unit_id: &str, pack_count: u32) -> ApiResult<BoxBreakdown> {
        let rule = self.lookup_box_rule(packaging_unit_id)?;
        PackagingCalculator::box_breakdown(pack_count, &rule).map_err(|e| self.ctx.report(e.into()))
    }

    #[instrument(skip(self, entry), fields(pack_count = entry.pack_count))]
    pub async fn add_pack_entry(
        &self,
        step_run_id: &str,
        entry: NewPackEntry,
    ) -> ApiResult<StepMutation> {
        PackagingCalculator::validate_pack_entry(&entry).map_err(|e| self.ctx.report(e.into()))?;

        let detail = self.ctx.load_kind(step_run_id, StepKind::Packaging).await?;
        // 包装量与余料同时增加, 合并后按总量校验
        let added = entry.pack_count as f64 * entry.unit_weight + entry.remainder_qty;
        self.ctx
            .check_allocation(&detail, LedgerCategory::Packed, added)
            .await?;

        self.ctx
            .commit_child(step_run_id, NewChild::PackEntry(entry))
            .await
    }

    /// 复用前序包装条目的余料到本工序条目
    #[instrument(skip(self, usage), fields(source = %usage.source_pack_entry_id))]
    pub async fn add_remainder_usage(
        &self,
        step_run_id: &str,
        usage: NewRemainderUsage,
    ) -> ApiResult<StepMutation> {
        let detail = self.ctx.load_kind(step_run_id, StepKind::Packaging).await?;
        if detail.find_pack_entry(&usage.target_pack_entry_id).is_none() {
            return Err(self.ctx.report(ApiError::InvalidInput(format!(
                "目标包装条目{}不属于工序记录{}",
                usage.target_pack_entry_id, step_run_id
            ))));
        }
        if usage.source_pack_entry_id == usage.target_pack_entry_id {
            return Err(self
                .ctx
                .report(ApiError::InvalidInput("余料不能复用到自身".to_string())));
        }

        let source = self
            .packaging_repo
            .find_pack_entry(&usage.source_pack_entry_id)
            .map_err(|e| self.ctx.report(e.into()))?
            .ok_or_else(|| {
                self.ctx.report(ApiError::NotFound(format!(
                    "源包装条目{}不存在",
                    usage.source_pack_entry_id
                )))
            })?;
        let usages = self
            .packaging_repo
            .list_usages_by_source(&source.pack_entry_id)
            .map_err(|e| self.ctx.report(e.into()))?;

        let profile = self.ctx.profile(StepKind::Packaging).await;
        PackagingCalculator::validate_remainder_usage(
            &source,
            &usages,
            usage.quantity,
            profile.tolerance(),
        )
        .map_err(|e| self.ctx.report(e.into()))?;

        self.ctx
            .commit_child(step_run_id, NewChild::RemainderUsage(usage))
            .await
    }

    #[instrument(skip(self, allocation), fields(pack_entry_id = %allocation.pack_entry_id))]
    pub async fn add_storage_allocation(
        &self,
        step_run_id: &str,
        allocation: NewStorageAllocation,
    ) -> ApiResult<StepMutation> {
        if allocation.location.trim().is_empty() {
            return Err(self.ctx.report(ApiError::InvalidInput("库位不能为空".to_string())));
        }

        let detail = self.ctx.load_kind(step_run_id, StepKind::Packaging).await?;
        let entry = detail
            .find_pack_entry(&allocation.pack_entry_id)
            .cloned()
            .ok_or_else(|| {
                self.ctx.report(ApiError::InvalidInput(format!(
                    "包装条目{}不属于工序记录{}",
                    allocation.pack_entry_id, step_run_id
                )))
            })?;
        let rule = self.lookup_box_rule(&entry.packaging_unit_id)?;

        PackagingCalculator::validate_storage_allocation(
            &entry,
            &rule,
            &detail.storage_allocations,
            allocation.box_count,
        )
        .map_err(|e| self.ctx.report(e.into()))?;

        self.ctx
            .commit_child(step_run_id, NewChild::StorageAllocation(allocation))
            .await
    }

    pub async fn add_weight_check(
        &self,
        step_run_id: &str,
        check: NewWeightCheck,
    ) -> ApiResult<StepMutation> {
        record_weight_check(&self.ctx, step_run_id, StepKind::Packaging, check).await
    }

    /// 照片上传 (未接入文件存储)
    pub fn upload_photo(&self, step_run_id: &str, file_name: &str) -> ApiResult<()> {
        info!(step_run_id = %step_run_id, file_name = %file_name, "照片上传未接入, 已忽略");
        self.ctx.notify(Notification::info(
            "packaging.photo_upload_unavailable",
            &[("file", file_name)],
        ));
        Ok(())
    }
}
