// ==========================================
// 食品加工追溯系统 - 参考数据缓存
// ==========================================
// UserNameCache: 用户 ID → 显示名
// StockCountCache: 产品 ID → 可用库存
// StockCacheInvalidator: 包装类事件到达时使库存缓存失效
// ==========================================

use crate::cache::ScopedCache;
use crate::engine::events::{StepEvent, StepEventPublisher};
use crate::repository::{ReferenceRepository, RepositoryError, RepositoryResult};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct UserNameCache {
    cache: ScopedCache<String, String>,
    repo: Arc<ReferenceRepository>,
}

impl UserNameCache {
    pub fn new(repo: Arc<ReferenceRepository>, ttl: Duration) -> Self {
        Self {
            cache: ScopedCache::new("user_name", ttl),
            repo,
        }
    }

    /// 显示名; 未登记的用户回退为用户 ID 本身
    pub async fn display_name(&self, user_id: &str) -> RepositoryResult<String> {
        let repo = self.repo.clone();
        let id = user_id.to_string();
        self.cache
            .get_or_load(user_id.to_string(), || async move {
                let user = repo.find_user(&id)?;
                Ok::<_, RepositoryError>(user.map(|u| u.display_name).unwrap_or(id))
            })
            .await
    }

    pub fn refresh(&self) {
        self.cache.refresh();
    }
}

#[derive(Clone)]
pub struct StockCountCache {
    cache: ScopedCache<String, f64>,
    repo: Arc<ReferenceRepository>,
}

impl StockCountCache {
    pub fn new(repo: Arc<ReferenceRepository>, ttl: Duration) -> Self {
        Self {
            cache: ScopedCache::new("stock_count", ttl),
            repo,
        }
    }

    pub async fn stock_count(&self, product_id: &str) -> RepositoryResult<f64> {
        let repo = self.repo.clone();
        let id = product_id.to_string();
        self.cache
            .get_or_load(product_id.to_string(), || async move { repo.stock_count(&id) })
            .await
    }

    pub fn invalidate(&self, product_id: &str) {
        self.cache.invalidate(&product_id.to_string());
    }

    pub fn refresh(&self) {
        self.cache.refresh();
    }
}

/// 事件订阅: 影响库存的工序事件使对应缓存失效
pub struct StockCacheInvalidator {
    stock: StockCountCache,
}

impl StockCacheInvalidator {
    pub fn new(stock: StockCountCache) -> Self {
        Self { stock }
    }
}

impl StepEventPublisher for StockCacheInvalidator {
    fn publish(&self, event: StepEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        if !event.affects_stock() {
            return Ok(String::new());
        }

        if event.affected_products.is_empty() {
            // 删除时无法确定产品, 整体失效
            self.stock.refresh();
        } else {
            for product_id in &event.affected_products {
                self.stock.invalidate(product_id);
            }
        }

        tracing::debug!(
            step_run_id = %event.step_run_id,
            products = ?event.affected_products,
            "库存缓存已失效"
        );
        Ok(String::new())
    }
}
