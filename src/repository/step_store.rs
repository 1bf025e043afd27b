// ==========================================
// 食品加工追溯系统 - 工序记录存储接口
// ==========================================
// 职责: 工序记录及子记录的 CRUD 门面 (系统唯一数据源)
// 红线: 每次写入记录 ActionLog 并发布 StepEvent
// 说明: 事件发布失败只记录日志, 不回滚已完成的写入
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::child::{ChildRecord, NewChild};
use crate::domain::step_run::{StepRun, StepRunDetail, StepRunUpsert};
use crate::domain::types::{ChildKind, StepKind};
use crate::engine::events::{OptionalEventPublisher, StepEvent, StepEventType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{
    ActionLogRepository, MetalCheckRepository, PackagingRepository, QcRepository,
    SortingRepository, StepRunRepository, WasteRepository,
};
use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const SYSTEM_ACTOR: &str = "system";

// ==========================================
// StepRecordStore Trait
// ==========================================
// 实现者: SqliteStepStore (rusqlite)
#[async_trait]
pub trait StepRecordStore: Send + Sync {
    /// 查询工序记录及全部子记录
    async fn fetch(&self, step_run_id: &str) -> RepositoryResult<StepRunDetail>;

    /// 新建或更新工序记录 (更新时 revision + 1)
    async fn upsert(&self, step_run_id: &str, upsert: StepRunUpsert) -> RepositoryResult<StepRun>;

    /// 新增子记录
    async fn add_child(&self, parent_id: &str, child: NewChild) -> RepositoryResult<ChildRecord>;

    /// 删除子记录
    async fn delete_child(&self, kind: ChildKind, child_id: &str) -> RepositoryResult<()>;

    /// 查询批次下的工序记录
    async fn list_by_lot(&self, lot_id: &str) -> RepositoryResult<Vec<StepRun>>;
}

// ==========================================
// StepStoreRepositories - 仓储集合
// ==========================================
#[derive(Clone)]
pub struct StepStoreRepositories {
    pub step_run_repo: Arc<StepRunRepository>,
    pub waste_repo: Arc<WasteRepository>,
    pub sorting_repo: Arc<SortingRepository>,
    pub metal_repo: Arc<MetalCheckRepository>,
    pub packaging_repo: Arc<PackagingRepository>,
    pub qc_repo: Arc<QcRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl StepStoreRepositories {
    /// 基于同一连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            step_run_repo: Arc::new(StepRunRepository::new(conn.clone())),
            waste_repo: Arc::new(WasteRepository::new(conn.clone())),
            sorting_repo: Arc::new(SortingRepository::new(conn.clone())),
            metal_repo: Arc::new(MetalCheckRepository::new(conn.clone())),
            packaging_repo: Arc::new(PackagingRepository::new(conn.clone())),
            qc_repo: Arc::new(QcRepository::new(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
        }
    }
}

// ==========================================
// SqliteStepStore
// ==========================================
pub struct SqliteStepStore {
    repos: StepStoreRepositories,
    publisher: OptionalEventPublisher,
}

impl SqliteStepStore {
    pub fn new(repos: StepStoreRepositories, publisher: OptionalEventPublisher) -> Self {
        Self { repos, publisher }
    }

    pub fn repositories(&self) -> &StepStoreRepositories {
        &self.repos
    }

    fn require_run(&self, step_run_id: &str) -> RepositoryResult<StepRun> {
        self.repos
            .step_run_repo
            .find_by_id(step_run_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "StepRun".to_string(),
                id: step_run_id.to_string(),
            })
    }

    fn publish(&self, event: StepEvent) {
        let event_type = event.event_type.as_str().to_string();
        if let Err(e) = self.publisher.publish(event.with_source("SqliteStepStore")) {
            warn!(event_type = %event_type, error = %e, "工序事件发布失败");
        }
    }

    fn log_action(&self, log: ActionLog) -> RepositoryResult<()> {
        self.repos.action_log_repo.insert(&log)?;
        Ok(())
    }

    fn insert_child(&self, parent_id: &str, child: &NewChild) -> RepositoryResult<ChildRecord> {
        let r = &self.repos;
        let record = match child {
            NewChild::Waste(c) => ChildRecord::Waste(r.waste_repo.insert_waste(parent_id, c)?),
            NewChild::SortingOutput(c) => {
                ChildRecord::SortingOutput(r.sorting_repo.insert_output(parent_id, c)?)
            }
            NewChild::ReworkedLot(c) => {
                ChildRecord::ReworkedLot(r.sorting_repo.insert_rework(parent_id, c)?)
            }
            NewChild::WeightCheck(c) => {
                ChildRecord::WeightCheck(r.waste_repo.insert_weight_check(parent_id, c)?)
            }
            NewChild::MetalCheckAttempt(c) => {
                ChildRecord::MetalCheckAttempt(r.metal_repo.insert_attempt(parent_id, c)?)
            }
            NewChild::PackEntry(c) => {
                ChildRecord::PackEntry(r.packaging_repo.insert_pack_entry(parent_id, c)?)
            }
            NewChild::RemainderUsage(c) => {
                ChildRecord::RemainderUsage(r.packaging_repo.insert_remainder_usage(parent_id, c)?)
            }
            NewChild::StorageAllocation(c) => ChildRecord::StorageAllocation(
                r.packaging_repo.insert_storage_allocation(parent_id, c)?,
            ),
            NewChild::QcCheck(c) => ChildRecord::QcCheck(r.qc_repo.insert(parent_id, c)?),
        };
        Ok(record)
    }

    fn remove_child(&self, kind: ChildKind, child_id: &str) -> RepositoryResult<String> {
        let r = &self.repos;
        match kind {
            ChildKind::Waste => r.waste_repo.delete_waste(child_id),
            ChildKind::SortingOutput => r.sorting_repo.delete_output(child_id),
            ChildKind::ReworkedLot => r.sorting_repo.delete_rework(child_id),
            ChildKind::WeightCheck => r.waste_repo.delete_weight_check(child_id),
            ChildKind::MetalCheckAttempt => r.metal_repo.delete_attempt(child_id),
            ChildKind::PackEntry => r.packaging_repo.delete_pack_entry(child_id),
            ChildKind::RemainderUsage => r.packaging_repo.delete_remainder_usage(child_id),
            ChildKind::StorageAllocation => r.packaging_repo.delete_storage_allocation(child_id),
            ChildKind::QcCheck => r.qc_repo.delete(child_id),
        }
    }
}

/// 子记录操作人 (检测/质检记录自带, 其余为系统)
fn child_actor(child: &NewChild) -> &str {
    match child {
        NewChild::MetalCheckAttempt(c) => c.checked_by.as_deref().unwrap_or(SYSTEM_ACTOR),
        NewChild::QcCheck(c) => c.checked_by.as_deref().unwrap_or(SYSTEM_ACTOR),
        _ => SYSTEM_ACTOR,
    }
}

/// 子记录涉及库存的产品
fn stock_products(record: &ChildRecord) -> Vec<String> {
    match record {
        ChildRecord::PackEntry(e) => vec![e.product_id.clone()],
        _ => Vec::new(),
    }
}

#[async_trait]
impl StepRecordStore for SqliteStepStore {
    async fn fetch(&self, step_run_id: &str) -> RepositoryResult<StepRunDetail> {
        let run = self.require_run(step_run_id)?;
        let r = &self.repos;

        let mut detail = StepRunDetail::empty(run);
        detail.waste = r.waste_repo.list_waste(step_run_id)?;
        detail.weight_checks = r.waste_repo.list_weight_checks(step_run_id)?;

        match detail.run.step_kind {
            StepKind::Sorting => {
                detail.outputs = r.sorting_repo.list_outputs(step_run_id)?;
                detail.reworks = r.sorting_repo.list_reworks(step_run_id)?;
            }
            StepKind::MetalDetection => {
                detail.metal_attempts = r.metal_repo.list_attempts(step_run_id)?;
            }
            StepKind::Packaging => {
                detail.pack_entries = r.packaging_repo.list_pack_entries(step_run_id)?;
                detail.remainder_usages_in = r.packaging_repo.list_usages_by_step_run(step_run_id)?;
                detail.storage_allocations =
                    r.packaging_repo.list_storage_allocations(step_run_id)?;
            }
            StepKind::QcCheck => {
                detail.qc_checks = r.qc_repo.list_by_step_run(step_run_id)?;
            }
            StepKind::Washing | StepKind::Drying => {}
        }

        Ok(detail)
    }

    async fn upsert(&self, step_run_id: &str, upsert: StepRunUpsert) -> RepositoryResult<StepRun> {
        let (run, created) = self.repos.step_run_repo.upsert(step_run_id, &upsert)?;

        let actor = upsert.actor.as_deref().unwrap_or(SYSTEM_ACTOR);
        let (action_type, event_type) = if created {
            (ActionType::CreateStepRun, StepEventType::StepRunCreated)
        } else {
            (ActionType::UpdateStepRun, StepEventType::StepRunUpdated)
        };

        let field_keys: Vec<&String> = upsert.fields.keys().collect();
        self.log_action(
            ActionLog::new(Some(step_run_id), action_type, actor).with_payload(json!({
                "revision": run.revision,
                "fields": field_keys,
                "status": upsert.status.map(|s| s.as_str()),
            })),
        )?;

        info!(
            step_run_id = %step_run_id,
            step_kind = %run.step_kind,
            revision = run.revision,
            created,
            "工序记录已保存"
        );
        self.publish(StepEvent::step_run(step_run_id, run.step_kind, event_type));
        Ok(run)
    }

    async fn add_child(&self, parent_id: &str, child: NewChild) -> RepositoryResult<ChildRecord> {
        let run = self.require_run(parent_id)?;
        let kind = child.kind();
        if !run.step_kind.accepts(kind) {
            return Err(RepositoryError::ChildKindMismatch {
                step_kind: run.step_kind.to_string(),
                child_kind: kind.to_string(),
            });
        }

        let record = self.insert_child(parent_id, &child)?;

        self.log_action(
            ActionLog::new(Some(parent_id), ActionType::AddChild, child_actor(&child))
                .with_payload(serde_json::to_value(&record)?)
                .with_detail(kind.as_str()),
        )?;

        info!(
            step_run_id = %parent_id,
            child_kind = %kind,
            child_id = %record.id(),
            "子记录已新增"
        );
        self.publish(
            StepEvent::child(parent_id, StepEventType::ChildAdded, kind)
                .with_products(stock_products(&record)),
        );
        Ok(record)
    }

    async fn delete_child(&self, kind: ChildKind, child_id: &str) -> RepositoryResult<()> {
        let products = match kind {
            ChildKind::PackEntry => self
                .repos
                .packaging_repo
                .find_pack_entry(child_id)?
                .map(|e| vec![e.product_id])
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let parent_id = self.remove_child(kind, child_id)?;

        self.log_action(
            ActionLog::new(Some(&parent_id), ActionType::DeleteChild, SYSTEM_ACTOR)
                .with_payload(json!({ "kind": kind.as_str(), "child_id": child_id })),
        )?;

        info!(
            step_run_id = %parent_id,
            child_kind = %kind,
            child_id = %child_id,
            "子记录已删除"
        );
        self.publish(
            StepEvent::child(&parent_id, StepEventType::ChildDeleted, kind).with_products(products),
        );
        Ok(())
    }

    async fn list_by_lot(&self, lot_id: &str) -> RepositoryResult<Vec<StepRun>> {
        self.repos.step_run_repo.list_by_lot(lot_id)
    }
}
