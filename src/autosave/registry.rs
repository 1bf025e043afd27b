// ==========================================
// 食品加工追溯系统 - 自动保存注册表
// ==========================================
// 一个页面可能同时编辑多个字段组, 页面卸载时并发刷新全部
// ==========================================

use crate::autosave::worker::{AutosaveError, AutosaveHandle, AutosaveStats};
use futures::future::join_all;
use std::collections::HashMap;

#[derive(Default)]
pub struct AutosaveRegistry {
    handles: HashMap<String, AutosaveHandle>,
}

impl AutosaveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册字段组; 返回被替换的旧句柄 (释放即后台刷新)
    pub fn register(&mut self, group: &str, handle: AutosaveHandle) -> Option<AutosaveHandle> {
        self.handles.insert(group.to_string(), handle)
    }

    pub fn get(&self, group: &str) -> Option<&AutosaveHandle> {
        self.handles.get(group)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub async fn flush_all(&self) -> Vec<(String, Result<AutosaveStats, AutosaveError>)> {
        let futures = self
            .handles
            .iter()
            .map(|(group, handle)| async move { (group.clone(), handle.flush().await) });
        join_all(futures).await
    }

    /// 页面卸载: 关闭并刷新全部字段组
    pub async fn close_all(&mut self) -> Vec<(String, Result<AutosaveStats, AutosaveError>)> {
        let handles: Vec<(String, AutosaveHandle)> = self.handles.drain().collect();
        tracing::debug!(groups = handles.len(), "关闭全部自动保存任务");

        let futures = handles
            .into_iter()
            .map(|(group, handle)| async move { (group, handle.close().await) });
        join_all(futures).await
    }
}
