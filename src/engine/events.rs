// ==========================================
// 食品加工追溯系统 - 工序事件发布
// ==========================================
// 职责: 定义工序事件发布 trait, 实现依赖倒置
// 说明: 存储层发布事件, 缓存等下游实现订阅适配器
// ==========================================

use crate::domain::types::{ChildKind, StepKind};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 工序事件类型
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepEventType {
    /// 工序记录新建
    StepRunCreated,
    /// 字段组写入
    StepRunUpdated,
    /// 子记录新增
    ChildAdded,
    /// 子记录删除
    ChildDeleted,
    /// 手动触发
    ManualTrigger,
}

impl StepEventType {
    pub fn as_str(&self) -> &str {
        match self {
            StepEventType::StepRunCreated => "StepRunCreated",
            StepEventType::StepRunUpdated => "StepRunUpdated",
            StepEventType::ChildAdded => "ChildAdded",
            StepEventType::ChildDeleted => "ChildDeleted",
            StepEventType::ManualTrigger => "ManualTrigger",
        }
    }
}

/// 工序事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub step_run_id: String,
    pub step_kind: Option<StepKind>,
    pub event_type: StepEventType,
    /// 子记录类型 (仅子记录事件)
    pub child_kind: Option<ChildKind>,
    /// 库存受影响的产品 (包装消耗库存)
    pub affected_products: Vec<String>,
    /// 事件来源描述
    pub source: Option<String>,
}

impl StepEvent {
    pub fn step_run(step_run_id: &str, step_kind: StepKind, event_type: StepEventType) -> Self {
        Self {
            step_run_id: step_run_id.to_string(),
            step_kind: Some(step_kind),
            event_type,
            child_kind: None,
            affected_products: Vec::new(),
            source: None,
        }
    }

    pub fn child(step_run_id: &str, event_type: StepEventType, child_kind: ChildKind) -> Self {
        Self {
            step_run_id: step_run_id.to_string(),
            step_kind: None,
            event_type,
            child_kind: Some(child_kind),
            affected_products: Vec::new(),
            source: None,
        }
    }

    pub fn with_products(mut self, products: Vec<String>) -> Self {
        self.affected_products = products;
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// 是否影响库存计数
    pub fn affects_stock(&self) -> bool {
        !self.affected_products.is_empty()
            || matches!(
                self.child_kind,
                Some(ChildKind::PackEntry) | Some(ChildKind::RemainderUsage)
            )
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 工序事件发布者
///
/// # 返回
/// - `Ok(task_id)`: 任务 ID (如果支持) 或空字符串
/// - `Err`: 发布失败 (调用方只记录日志, 不回滚写入)
pub trait StepEventPublisher: Send + Sync {
    fn publish(&self, event: StepEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl StepEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: StepEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - step_run_id={}, event_type={}",
            event.step_run_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn StepEventPublisher>> 的使用
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn StepEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn StepEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (如果有发布者)
    pub fn publish(&self, event: StepEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者, 跳过事件 - step_run_id={}, event_type={}",
                    event.step_run_id,
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<StepEvent>>,
    }

    impl StepEventPublisher for RecordingPublisher {
        fn publish(&self, event: StepEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.events.lock().unwrap().push(event);
            Ok("T1".to_string())
        }
    }

    #[test]
    fn test_affects_stock() {
        let e = StepEvent::child("R1", StepEventType::ChildAdded, ChildKind::PackEntry);
        assert!(e.affects_stock());

        let e = StepEvent::child("R1", StepEventType::ChildAdded, ChildKind::Waste);
        assert!(!e.affects_stock());

        let e = StepEvent::step_run("R1", StepKind::Sorting, StepEventType::StepRunUpdated)
            .with_products(vec!["P1".to_string()]);
        assert!(e.affects_stock());
    }

    #[test]
    fn test_noop_publisher() {
        let event = StepEvent::step_run("R1", StepKind::Washing, StepEventType::ManualTrigger);
        let result = NoOpEventPublisher.publish(event);
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_optional_publisher() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        let event = StepEvent::step_run("R1", StepKind::Washing, StepEventType::StepRunCreated);
        assert!(publisher.publish(event).is_ok());

        let recorder = Arc::new(RecordingPublisher::default());
        let publisher = OptionalEventPublisher::with_publisher(recorder.clone());
        assert!(publisher.is_configured());

        let event = StepEvent::child("R1", StepEventType::ChildDeleted, ChildKind::QcCheck)
            .with_source("SqliteStepStore");
        assert_eq!(publisher.publish(event).unwrap(), "T1");

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].child_kind, Some(ChildKind::QcCheck));
        assert_eq!(events[0].source.as_deref(), Some("SqliteStepStore"));
    }
}
