// ==========================================
// 食品加工追溯系统 - 用户通知
// ==========================================
// 职责: 瞬时提示 (成功/警告/错误), 超过显示时长后自动丢弃
// 文案: 由 i18n key 渲染
// ==========================================

use crate::i18n;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 内存通知队列上限
pub const MAX_RETAINED_NOTIFICATIONS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "INFO",
            NotificationLevel::Success => "SUCCESS",
            NotificationLevel::Warning => "WARNING",
            NotificationLevel::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    /// i18n key, 便于前端/测试按类型判断
    pub key: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

impl Notification {
    /// 按 i18n key 渲染文案
    pub fn from_key(level: NotificationLevel, key: &str, args: &[(&str, &str)]) -> Self {
        Self {
            level,
            key: key.to_string(),
            message: i18n::t_with_args(key, args),
            created_at: Local::now().naive_local(),
        }
    }

    pub fn info(key: &str, args: &[(&str, &str)]) -> Self {
        Self::from_key(NotificationLevel::Info, key, args)
    }

    pub fn success(key: &str, args: &[(&str, &str)]) -> Self {
        Self::from_key(NotificationLevel::Success, key, args)
    }

    pub fn warning(key: &str, args: &[(&str, &str)]) -> Self {
        Self::from_key(NotificationLevel::Warning, key, args)
    }

    pub fn error(key: &str, args: &[(&str, &str)]) -> Self {
        Self::from_key(NotificationLevel::Error, key, args)
    }
}

// ==========================================
// NotificationSink Trait
// ==========================================
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// 仅写日志
#[derive(Debug, Default, Clone)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, n: Notification) {
        match n.level {
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(key = %n.key, "{}", n.message)
            }
            NotificationLevel::Warning => tracing::warn!(key = %n.key, "{}", n.message),
            NotificationLevel::Error => tracing::error!(key = %n.key, "{}", n.message),
        }
    }
}

/// 内存通知队列
///
/// `active()` 只返回仍在显示时长内的通知, 过期的在下一次写入或读取时丢弃.
#[derive(Debug, Clone)]
pub struct MemoryNotificationSink {
    ttl: Duration,
    items: Arc<Mutex<VecDeque<Notification>>>,
}

impl MemoryNotificationSink {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            items: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    fn cutoff(&self) -> NaiveDateTime {
        let ttl = ChronoDuration::from_std(self.ttl).unwrap_or_else(|_| ChronoDuration::zero());
        Local::now().naive_local() - ttl
    }

    fn prune(&self, items: &mut VecDeque<Notification>) {
        let cutoff = self.cutoff();
        items.retain(|n| n.created_at > cutoff);
        while items.len() > MAX_RETAINED_NOTIFICATIONS {
            items.pop_front();
        }
    }

    pub fn active(&self) -> Vec<Notification> {
        match self.items.lock() {
            Ok(mut items) => {
                self.prune(&mut items);
                items.iter().cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    /// 最近一条通知 (无论是否过期)
    pub fn last(&self) -> Option<Notification> {
        self.items.lock().ok().and_then(|i| i.back().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut items) = self.items.lock() {
            items.clear();
        }
    }
}

impl NotificationSink for MemoryNotificationSink {
    fn notify(&self, notification: Notification) {
        if let Ok(mut items) = self.items.lock() {
            items.push_back(notification);
            self.prune(&mut items);
        }
    }
}

/// 同时分发给多个 sink
#[derive(Clone, Default)]
pub struct FanoutNotificationSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl NotificationSink for FanoutNotificationSink {
    fn notify(&self, notification: Notification) {
        for sink in &self.sinks {
            sink.notify(notification.clone());
        }
    }
}
