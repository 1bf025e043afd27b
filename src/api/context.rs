// ==========================================
// 食品加工追溯系统 - 工序 API 公共上下文
// ==========================================
// 职责: 各工序 API 共享的流程
//   校验 → 存储调用 → 台账重算 → 通知
// 约束:
// - 校验失败: 警告通知, 不调用存储
// - 存储失败: error 日志 + 错误通知, 本地状态不变
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{FormProfile, FormProfileReader};
use crate::domain::child::{ChildRecord, NewChild};
use crate::domain::step_run::StepRunDetail;
use crate::domain::types::{LedgerCategory, StepKind};
use crate::engine::allocation::{AllocationLedger, LedgerSnapshot};
use crate::engine::step_ledger::build_ledger;
use crate::notify::{Notification, NotificationSink};
use crate::repository::StepRecordStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

/// 默认称重复核偏差比例
const DEFAULT_WEIGHT_TOLERANCE_PCT: f64 = 0.02;

/// 子记录写入结果 (含重算后的台账)
#[derive(Debug, Clone, Serialize)]
pub struct StepMutation {
    pub record: ChildRecord,
    pub ledger: Option<LedgerSnapshot>,
}

/// 工序记录视图
#[derive(Debug, Clone, Serialize)]
pub struct StepRunView {
    pub detail: StepRunDetail,
    pub ledger: Option<LedgerSnapshot>,
}

#[derive(Clone)]
pub struct StepApiContext {
    store: Arc<dyn StepRecordStore>,
    profiles: Arc<dyn FormProfileReader>,
    notifier: Arc<dyn NotificationSink>,
}

impl StepApiContext {
    pub fn new(
        store: Arc<dyn StepRecordStore>,
        profiles: Arc<dyn FormProfileReader>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            profiles,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<dyn StepRecordStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    pub fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    /// 记录并通知错误, 原样返回便于 `map_err` 链式使用
    pub fn report(&self, err: ApiError) -> ApiError {
        let reason = err.to_string();
        if err.is_validation() {
            warn!(error = %reason, "校验未通过");
            self.notify(Notification::warning(
                "notify.validation_failed",
                &[("reason", reason.as_str())],
            ));
        } else {
            error!(error = %reason, "存储调用失败");
            self.notify(Notification::error(
                "notify.save_failed",
                &[("reason", reason.as_str())],
            ));
        }
        err
    }

    /// 生效的表单配置; 读取失败时使用默认值
    pub async fn profile(&self, kind: StepKind) -> FormProfile {
        match self.profiles.get_form_profile(kind).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(step_kind = %kind, error = %e, "表单配置读取失败, 使用默认值");
                FormProfile::defaults(kind)
            }
        }
    }

    pub async fn weight_tolerance_pct(&self) -> f64 {
        match self.profiles.get_weight_check_tolerance_pct().await {
            Ok(pct) => pct,
            Err(e) => {
                warn!(error = %e, "称重容差读取失败, 使用默认值");
                DEFAULT_WEIGHT_TOLERANCE_PCT
            }
        }
    }

    pub async fn load(&self, step_run_id: &str) -> ApiResult<StepRunDetail> {
        if step_run_id.trim().is_empty() {
            return Err(self.report(ApiError::InvalidInput("工序记录ID不能为空".to_string())));
        }
        self.store
            .fetch(step_run_id)
            .await
            .map_err(|e| self.report(e.into()))
    }

    /// 加载并确认工序类型
    pub async fn load_kind(&self, step_run_id: &str, expected: StepKind) -> ApiResult<StepRunDetail> {
        let detail = self.load(step_run_id).await?;
        if detail.run.step_kind != expected {
            return Err(self.report(ApiError::InvalidInput(format!(
                "工序记录{}的类型为{}, 不是{}",
                step_run_id, detail.run.step_kind, expected
            ))));
        }
        Ok(detail)
    }

    /// 按工序配置构建台账; 无台账的工序返回 None
    pub async fn ledger_for(&self, detail: &StepRunDetail) -> ApiResult<Option<AllocationLedger>> {
        let profile = self.profile(detail.run.step_kind).await;
        let ledger_profile = profile.ledger_profile();
        if !ledger_profile.has_ledger() {
            return Ok(None);
        }
        build_ledger(detail, &ledger_profile, profile.tolerance())
            .map(Some)
            .map_err(|e| self.report(e.into()))
    }

    pub async fn snapshot_for(&self, detail: &StepRunDetail) -> ApiResult<Option<LedgerSnapshot>> {
        Ok(self.ledger_for(detail).await?.map(|l| l.snapshot()))
    }

    pub async fn view(&self, step_run_id: &str) -> ApiResult<StepRunView> {
        let detail = self.load(step_run_id).await?;
        let ledger = self.snapshot_for(&detail).await?;
        Ok(StepRunView { detail, ledger })
    }

    /// 校验台账余量 (工序台账不含该类别时跳过)
    ///
    /// 零增量不改变台账, 已超出可用量的存量数据不阻止其写入
    pub async fn check_allocation(
        &self,
        detail: &StepRunDetail,
        category: LedgerCategory,
        quantity: f64,
    ) -> ApiResult<()> {
        if quantity == 0.0 {
            return Ok(());
        }
        let Some(ledger) = self.ledger_for(detail).await? else {
            return Ok(());
        };
        if ledger.total_of(category).is_err() {
            return Ok(());
        }
        ledger
            .validate_addition(category, quantity)
            .map_err(|e| self.report(e.into()))
    }

    /// 写入子记录并重算台账
    ///
    /// 调用方负责写入前的全部校验
    pub async fn commit_child(&self, step_run_id: &str, child: NewChild) -> ApiResult<StepMutation> {
        let record = self
            .store
            .add_child(step_run_id, child)
            .await
            .map_err(|e| self.report(e.into()))?;

        let detail = self.load(step_run_id).await?;
        let ledger = self.snapshot_for(&detail).await?;
        self.notify(Notification::success("notify.saved", &[]));

        Ok(StepMutation { record, ledger })
    }
}
