// ==========================================
// 食品加工追溯系统 - 工序记录 API
// ==========================================
// 职责: 工序记录新建/查询/状态变更, 通用损耗记录, 子记录删除, 自动保存
// ==========================================

use crate::api::context::{StepApiContext, StepMutation, StepRunView};
use crate::api::error::{ApiError, ApiResult};
use crate::autosave::{AutosaveConfig, AutosaveHandle};
use crate::domain::child::NewChild;
use crate::domain::step_run::{StepRun, StepRunUpsert};
use crate::domain::types::{ChildKind, LedgerCategory, StepKind, StepRunStatus, WasteType};
use crate::domain::waste::NewWasteRecord;
use crate::engine::allocation::LedgerSnapshot;
use crate::engine::field_validation::parse_quantity;
use crate::notify::Notification;
use tracing::instrument;
use uuid::Uuid;

pub struct StepRunApi {
    ctx: StepApiContext,
}

impl StepRunApi {
    pub fn new(ctx: StepApiContext) -> Self {
        Self { ctx }
    }

    /// 新建工序记录
    ///
    /// # 参数
    /// - available_qty_raw: 上游可用量 (表单原始字符串)
    ///
    /// # 返回
    /// - 新记录 (step_run_id 为 uuid v4)
    #[instrument(skip(self))]
    pub async fn create_step_run(
        &self,
        step_kind: StepKind,
        lot_id: &str,
        available_qty_raw: &str,
        actor: &str,
    ) -> ApiResult<StepRun> {
        if lot_id.trim().is_empty() {
            return Err(self.ctx.report(ApiError::InvalidInput("批次号不能为空".to_string())));
        }
        let available = parse_quantity("available_qty", available_qty_raw)
            .map_err(|e| self.ctx.report(e.into()))?;

        let step_run_id = Uuid::new_v4().to_string();
        let upsert = StepRunUpsert::create(step_kind, lot_id.trim(), available).with_actor(actor);
        let run = self
            .ctx
            .store()
            .upsert(&step_run_id, upsert)
            .await
            .map_err(|e| self.ctx.report(e.into()))?;

        self.ctx.notify(Notification::success("notify.saved", &[]));
        Ok(run)
    }

    /// 查询工序记录 + 子记录 + 台账快照
    #[instrument(skip(self))]
    pub async fn fetch_step_run(&self, step_run_id: &str) -> ApiResult<StepRunView> {
        self.ctx.view(step_run_id).await
    }

    pub async fn list_by_lot(&self, lot_id: &str) -> ApiResult<Vec<StepRun>> {
        self.ctx
            .store()
            .list_by_lot(lot_id)
            .await
            .map_err(|e| self.ctx.report(e.into()))
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        step_run_id: &str,
        status: StepRunStatus,
        actor: &str,
    ) -> ApiResult<StepRun> {
        self.ctx.load(step_run_id).await?;
        let upsert = StepRunUpsert {
            status: Some(status),
            ..Default::default()
        }
        .with_actor(actor);

        self.ctx
            .store()
            .upsert(step_run_id, upsert)
            .await
            .map_err(|e| self.ctx.report(e.into()))
    }

    /// 修改上游可用量
    ///
    /// 新可用量小于已分配合计时仍允许保存, 台账以告警形式展示超额
    #[instrument(skip(self))]
    pub async fn set_available_qty(
        &self,
        step_run_id: &str,
        available_qty_raw: &str,
        actor: &str,
    ) -> ApiResult<StepRunView> {
        let available = parse_quantity("available_qty", available_qty_raw)
            .map_err(|e| self.ctx.report(e.into()))?;
        self.ctx.load(step_run_id).await?;

        let upsert = StepRunUpsert {
            available_qty: Some(available),
            ..Default::default()
        }
        .with_actor(actor);
        self.ctx
            .store()
            .upsert(step_run_id, upsert)
            .await
            .map_err(|e| self.ctx.report(e.into()))?;

        let view = self.ctx.view(step_run_id).await?;
        if view.ledger.as_ref().map(|l| l.over_budget).unwrap_or(false) {
            self.ctx.notify(Notification::warning("ledger.over_budget", &[]));
        }
        Ok(view)
    }

    /// 记录损耗 (所有带损耗类别的工序共用)
    #[instrument(skip(self))]
    pub async fn add_waste(
        &self,
        step_run_id: &str,
        waste_type: WasteType,
        quantity_raw: &str,
        remarks: Option<String>,
    ) -> ApiResult<StepMutation> {
        let quantity =
            parse_quantity("quantity", quantity_raw).map_err(|e| self.ctx.report(e.into()))?;
        if quantity <= 0.0 {
            return Err(self.ctx.report(ApiError::InvalidInput("损耗数量必须大于 0".to_string())));
        }

        let detail = self.ctx.load(step_run_id).await?;
        if !detail.run.step_kind.accepts(ChildKind::Waste) {
            return Err(self.ctx.report(ApiError::InvalidInput(format!(
                "工序{}不记录损耗",
                detail.run.step_kind
            ))));
        }
        self.ctx
            .check_allocation(&detail, LedgerCategory::Waste, quantity)
            .await?;

        self.ctx
            .commit_child(
                step_run_id,
                NewChild::Waste(NewWasteRecord {
                    waste_type,
                    quantity,
                    remarks,
                }),
            )
            .await
    }

    /// 删除子记录并返回重算后的台账
    ///
    /// 子记录必须属于 step_run_id 指定的工序记录
    #[instrument(skip(self))]
    pub async fn delete_child(
        &self,
        step_run_id: &str,
        kind: ChildKind,
        child_id: &str,
    ) -> ApiResult<Option<LedgerSnapshot>> {
        let owner = self.ctx.load(step_run_id).await?;
        if !owner.contains_child(kind, child_id) {
            return Err(self.ctx.report(ApiError::InvalidInput(format!(
                "{}(id={})不属于工序记录{}",
                kind, child_id, step_run_id
            ))));
        }

        self.ctx
            .store()
            .delete_child(kind, child_id)
            .await
            .map_err(|e| self.ctx.report(e.into()))?;

        let detail = self.ctx.load(step_run_id).await?;
        let ledger = self.ctx.snapshot_for(&detail).await?;
        self.ctx.notify(Notification::success("notify.deleted", &[]));
        Ok(ledger)
    }

    /// 为表单字段组启动自动保存 (防抖窗口取自工序配置)
    pub async fn open_autosave(&self, step_run_id: &str, actor: &str) -> ApiResult<AutosaveHandle> {
        let detail = self.ctx.load(step_run_id).await?;
        let profile = self.ctx.profile(detail.run.step_kind).await;
        let config = AutosaveConfig::from_profile(step_run_id, &profile).with_actor(actor);

        Ok(AutosaveHandle::spawn(
            config,
            self.ctx.store().clone(),
            self.ctx.notifier().clone(),
        ))
    }
}
