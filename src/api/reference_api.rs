// ==========================================
// 食品加工追溯系统 - 基础资料 API
// ==========================================
// 职责: 产品/到货/用户查询, 库存与显示名经作用域缓存读取
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::cache::{StockCountCache, UserNameCache};
use crate::domain::reference::{Product, Supply, UserProfile};
use crate::engine::field_validation::parse_quantity;
use crate::repository::row_util::{new_id, now};
use crate::repository::ReferenceRepository;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct ReferenceApi {
    reference_repo: Arc<ReferenceRepository>,
    user_names: UserNameCache,
    stock_counts: StockCountCache,
}

impl ReferenceApi {
    pub fn new(
        reference_repo: Arc<ReferenceRepository>,
        user_names: UserNameCache,
        stock_counts: StockCountCache,
    ) -> Self {
        Self {
            reference_repo,
            user_names,
            stock_counts,
        }
    }

    pub fn list_products(&self) -> ApiResult<Vec<Product>> {
        Ok(self.reference_repo.list_products()?)
    }

    pub fn save_product(&self, product: &Product) -> ApiResult<()> {
        if product.product_id.trim().is_empty() || product.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("产品ID和名称不能为空".to_string()));
        }
        Ok(self.reference_repo.upsert_product(product)?)
    }

    /// 登记原料到货, 并使该产品库存缓存失效
    #[instrument(skip(self))]
    pub fn record_supply(&self, product_id: &str, quantity_raw: &str) -> ApiResult<Supply> {
        let quantity = parse_quantity("quantity", quantity_raw)?;
        if quantity <= 0.0 {
            return Err(ApiError::InvalidInput("到货数量必须大于 0".to_string()));
        }

        let supply = Supply {
            supply_id: new_id(),
            product_id: product_id.to_string(),
            quantity,
            received_at: now(),
        };
        self.reference_repo.insert_supply(&supply)?;
        self.stock_counts.invalidate(product_id);

        info!(product_id = %product_id, quantity, "原料到货已登记");
        Ok(supply)
    }

    pub async fn stock_count(&self, product_id: &str) -> ApiResult<f64> {
        Ok(self.stock_counts.stock_count(product_id).await?)
    }

    pub fn save_user(&self, user: &UserProfile) -> ApiResult<()> {
        Ok(self.reference_repo.upsert_user(user)?)
    }

    pub async fn display_name(&self, user_id: &str) -> ApiResult<String> {
        Ok(self.user_names.display_name(user_id).await?)
    }

    /// 丢弃全部缓存
    pub fn refresh_caches(&self) {
        self.user_names.refresh();
        self.stock_counts.refresh();
    }
}
