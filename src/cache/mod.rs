// ==========================================
// 食品加工追溯系统 - 作用域缓存
// ==========================================
// 职责: 带 TTL 的显式缓存 (用户显示名 / 产品库存)
// 说明: 缓存归属 AppState, 可随时 refresh 全部失效
// ==========================================

pub mod reference;

pub use reference::{StockCacheInvalidator, StockCountCache, UserNameCache};

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// 带 TTL 的键值缓存
///
/// 锁中毒时退化为未命中, 不向调用方传播
#[derive(Debug, Clone)]
pub struct ScopedCache<K, V> {
    name: &'static str,
    ttl: Duration,
    store: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
}

impl<K, V> ScopedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        {
            let store = self.store.read().ok()?;
            match store.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // 已过期, 顺手清理
        if let Ok(mut store) = self.store.write() {
            if store.get(key).map(|e| e.is_expired()).unwrap_or(false) {
                store.remove(key);
            }
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        match self.store.write() {
            Ok(mut store) => {
                store.insert(key, CacheEntry::new(value, self.ttl));
            }
            Err(e) => tracing::warn!(cache = self.name, error = %e, "缓存写锁获取失败"),
        }
    }

    /// 命中直接返回, 未命中时调用 loader 并写入缓存
    ///
    /// loader 失败时不写入缓存, 错误原样返回
    pub async fn get_or_load<F, Fut, E>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }

        tracing::debug!(cache = self.name, "缓存未命中, 加载");
        let value = loader().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &K) {
        if let Ok(mut store) = self.store.write() {
            store.remove(key);
        }
    }

    /// 清空全部条目
    pub fn refresh(&self) {
        if let Ok(mut store) = self.store.write() {
            store.clear();
        }
        tracing::debug!(cache = self.name, "缓存已清空");
    }

    /// 未过期条目数
    pub fn len(&self) -> usize {
        self.store
            .read()
            .map(|s| s.values().filter(|e| !e.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
