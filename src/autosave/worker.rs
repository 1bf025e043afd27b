// ==========================================
// 食品加工追溯系统 - 自动保存后台任务
// ==========================================
// 职责: 合并表单编辑, 防抖后通过 StepRecordStore::upsert 写入
// 约束:
// - 每次编辑重置防抖窗口
// - 写入内容为刷新时刻每个字段的最后值
// - 失败记录日志并通知, 不重试
// - close() 刷新并等待; 句柄直接释放时后台尽力刷新
// ==========================================

use crate::autosave::state::{AutosaveAction, AutosaveMachine, AutosaveState};
use crate::config::FormProfile;
use crate::domain::step_run::{FieldMap, StepRun, StepRunUpsert};
use crate::notify::{Notification, NotificationSink};
use crate::repository::{RepositoryResult, StepRecordStore};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AutosaveError {
    #[error("自动保存任务已关闭: {step_run_id}")]
    Closed { step_run_id: String },
}

#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    pub step_run_id: String,
    pub debounce: Duration,
    pub actor: Option<String>,
}

impl AutosaveConfig {
    pub fn new(step_run_id: &str, debounce: Duration) -> Self {
        Self {
            step_run_id: step_run_id.to_string(),
            debounce,
            actor: None,
        }
    }

    pub fn from_profile(step_run_id: &str, profile: &FormProfile) -> Self {
        Self::new(step_run_id, profile.debounce())
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }
}

/// 任务生命周期内的保存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AutosaveStats {
    pub saves: u32,
    pub failures: u32,
    pub last_revision: Option<i32>,
}

enum Command {
    Edit(FieldMap),
    Flush(oneshot::Sender<AutosaveStats>),
    Close(oneshot::Sender<AutosaveStats>),
}

// ==========================================
// AutosaveHandle - 表单侧句柄
// ==========================================
pub struct AutosaveHandle {
    step_run_id: String,
    tx: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<AutosaveStats>>,
}

impl AutosaveHandle {
    /// 启动后台任务 (需在 tokio runtime 内调用)
    pub fn spawn(
        config: AutosaveConfig,
        store: Arc<dyn StepRecordStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let step_run_id = config.step_run_id.clone();
        let worker = Worker::new(config, store, sink, done_tx);
        let task = tokio::spawn(worker.run(rx, done_rx));

        Self {
            step_run_id,
            tx,
            task: Some(task),
        }
    }

    pub fn step_run_id(&self) -> &str {
        &self.step_run_id
    }

    fn closed(&self) -> AutosaveError {
        AutosaveError::Closed {
            step_run_id: self.step_run_id.clone(),
        }
    }

    pub fn edit(&self, key: &str, value: JsonValue) -> Result<(), AutosaveError> {
        let mut fields = FieldMap::new();
        fields.insert(key.to_string(), value);
        self.edit_fields(fields)
    }

    pub fn edit_fields(&self, fields: FieldMap) -> Result<(), AutosaveError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Command::Edit(fields))
            .map_err(|_| self.closed())
    }

    /// 立即保存待写字段并等待完成, 任务继续运行
    pub async fn flush(&self) -> Result<AutosaveStats, AutosaveError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply))
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    /// 刷新并结束任务
    pub async fn close(mut self) -> Result<AutosaveStats, AutosaveError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Close(reply))
            .map_err(|_| self.closed())?;
        let stats = rx.await.map_err(|_| self.closed())?;

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(step_run_id = %self.step_run_id, error = %e, "自动保存任务异常结束");
            }
        }
        Ok(stats)
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            // 发送端释放后任务会强制刷新再退出
            debug!(step_run_id = %self.step_run_id, "自动保存句柄未关闭即释放");
        }
    }
}

// ==========================================
// Worker - 后台任务主体
// ==========================================
struct Worker {
    config: AutosaveConfig,
    store: Arc<dyn StepRecordStore>,
    sink: Arc<dyn NotificationSink>,
    machine: AutosaveMachine,
    pending: FieldMap,
    deadline: Option<Instant>,
    stats: AutosaveStats,
    done_tx: mpsc::UnboundedSender<RepositoryResult<StepRun>>,
}

type DoneReceiver = mpsc::UnboundedReceiver<RepositoryResult<StepRun>>;

impl Worker {
    fn new(
        config: AutosaveConfig,
        store: Arc<dyn StepRecordStore>,
        sink: Arc<dyn NotificationSink>,
        done_tx: mpsc::UnboundedSender<RepositoryResult<StepRun>>,
    ) -> Self {
        Self {
            config,
            store,
            sink,
            machine: AutosaveMachine::new(),
            pending: FieldMap::new(),
            deadline: None,
            stats: AutosaveStats::default(),
            done_tx,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Command>,
        mut done_rx: DoneReceiver,
    ) -> AutosaveStats {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Edit(fields)) => self.on_edit(fields),
                    Some(Command::Flush(reply)) => {
                        self.drain(&mut done_rx).await;
                        let _ = reply.send(self.stats);
                    }
                    Some(Command::Close(reply)) => {
                        self.drain(&mut done_rx).await;
                        let _ = reply.send(self.stats);
                        break;
                    }
                    None => {
                        self.drain(&mut done_rx).await;
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.deadline = None;
                    if self.machine.on_timer() == AutosaveAction::StartSave {
                        self.start_save();
                    }
                }
                Some(result) = done_rx.recv() => self.on_finished(result),
            }
        }

        debug!(
            step_run_id = %self.config.step_run_id,
            saves = self.stats.saves,
            failures = self.stats.failures,
            "自动保存任务结束"
        );
        self.stats
    }

    fn arm_timer(&mut self) {
        self.deadline = Some(Instant::now() + self.config.debounce);
    }

    fn on_edit(&mut self, fields: FieldMap) {
        for (k, v) in fields {
            self.pending.insert(k, v);
        }
        if self.machine.on_edit() == AutosaveAction::ArmTimer {
            self.arm_timer();
        }
    }

    fn start_save(&mut self) {
        let fields = std::mem::take(&mut self.pending);
        let store = self.store.clone();
        let step_run_id = self.config.step_run_id.clone();
        let actor = self.config.actor.clone();
        let done = self.done_tx.clone();

        debug!(step_run_id = %step_run_id, fields = fields.len(), "自动保存开始");
        tokio::spawn(async move {
            let result = store
                .upsert(&step_run_id, StepRunUpsert::fields_only(fields, actor))
                .await;
            let _ = done.send(result);
        });
    }

    fn on_finished(&mut self, result: RepositoryResult<StepRun>) {
        match result {
            Ok(run) => {
                self.stats.saves += 1;
                self.stats.last_revision = Some(run.revision);
                debug!(step_run_id = %run.step_run_id, revision = run.revision, "自动保存完成");
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!(step_run_id = %self.config.step_run_id, error = %e, "自动保存失败");
                let reason = e.to_string();
                self.sink.notify(Notification::error(
                    "autosave.failed",
                    &[("reason", reason.as_str())],
                ));
            }
        }

        if self.machine.on_save_finished() == AutosaveAction::ArmTimer {
            self.arm_timer();
        }
    }

    /// 等待进行中的保存并写完全部待写字段
    async fn drain(&mut self, done_rx: &mut DoneReceiver) {
        loop {
            match self.machine.state() {
                AutosaveState::Saving => match done_rx.recv().await {
                    Some(result) => self.on_finished(result),
                    None => break,
                },
                AutosaveState::Dirty => {
                    self.deadline = None;
                    if self.machine.on_teardown() == AutosaveAction::StartSave {
                        self.start_save();
                    }
                }
                AutosaveState::Idle => break,
            }
        }
    }
}
