// ==========================================
// 食品加工追溯系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 全部仓储共享同一 SQLite 连接; 缓存归属 AppState
// ==========================================

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{
    ConfigApi, DryingApi, MetalDetectionApi, PackagingApi, QcApi, ReferenceApi, SortingApi,
    StepApiContext, StepRunApi, WashingApi,
};
use crate::cache::{StockCacheInvalidator, StockCountCache, UserNameCache};
use crate::config::{ConfigManager, FormProfileReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::events::OptionalEventPublisher;
use crate::notify::{FanoutNotificationSink, MemoryNotificationSink, TracingNotificationSink};
use crate::repository::{
    ActionLogRepository, ReferenceRepository, SqliteStepStore, StepRecordStore,
    StepStoreRepositories,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub step_run_api: Arc<StepRunApi>,
    pub washing_api: Arc<WashingApi>,
    pub drying_api: Arc<DryingApi>,
    pub metal_detection_api: Arc<MetalDetectionApi>,
    pub sorting_api: Arc<SortingApi>,
    pub packaging_api: Arc<PackagingApi>,
    pub qc_api: Arc<QcApi>,
    pub reference_api: Arc<ReferenceApi>,
    pub config_api: Arc<ConfigApi>,

    /// 工序记录存储 (自动保存直接使用)
    pub store: Arc<dyn StepRecordStore>,

    /// 前端展示的瞬时通知
    pub notifications: MemoryNotificationSink,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化表结构
    /// 2. 初始化所有Repository和缓存
    /// 3. 创建所有API实例
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库表结构初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let cache_ttl = Duration::from_secs(
            config_manager
                .get_cache_ttl_secs()
                .await
                .map_err(|e| format!("读取缓存配置失败: {}", e))?,
        );
        let notification_ttl = Duration::from_secs(
            config_manager
                .get_notification_ttl_secs()
                .await
                .map_err(|e| format!("读取通知配置失败: {}", e))?,
        );

        // ==========================================
        // 缓存 + 事件订阅
        // ==========================================
        let reference_repo = Arc::new(ReferenceRepository::new(conn.clone()));
        let user_names = UserNameCache::new(reference_repo.clone(), cache_ttl);
        let stock_counts = StockCountCache::new(reference_repo.clone(), cache_ttl);
        let publisher = OptionalEventPublisher::with_publisher(Arc::new(
            StockCacheInvalidator::new(stock_counts.clone()),
        ));

        // ==========================================
        // 存储 + 通知
        // ==========================================
        let repos = StepStoreRepositories::from_connection(conn.clone());
        let packaging_repo = repos.packaging_repo.clone();
        let action_log_repo = repos.action_log_repo.clone();
        let store: Arc<dyn StepRecordStore> = Arc::new(SqliteStepStore::new(repos, publisher));

        let notifications = MemoryNotificationSink::new(notification_ttl);
        let notifier = Arc::new(
            FanoutNotificationSink::new()
                .with_sink(Arc::new(notifications.clone()))
                .with_sink(Arc::new(TracingNotificationSink)),
        );

        // ==========================================
        // API
        // ==========================================
        let ctx = StepApiContext::new(
            store.clone(),
            config_manager.clone() as Arc<dyn FormProfileReader>,
            notifier,
        );

        let state = Self {
            db_path,
            step_run_api: Arc::new(StepRunApi::new(ctx.clone())),
            washing_api: Arc::new(WashingApi::new(ctx.clone())),
            drying_api: Arc::new(DryingApi::new(ctx.clone())),
            metal_detection_api: Arc::new(MetalDetectionApi::new(ctx.clone())),
            sorting_api: Arc::new(SortingApi::new(ctx.clone())),
            packaging_api: Arc::new(PackagingApi::new(ctx.clone(), packaging_repo)),
            qc_api: Arc::new(QcApi::new(ctx)),
            reference_api: Arc::new(ReferenceApi::new(reference_repo, user_names, stock_counts)),
            config_api: Arc::new(ConfigApi::new(config_manager)),
            store,
            notifications,
            action_log_repo,
        };

        tracing::info!("AppState初始化完成");
        Ok(state)
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 FOOD_TRACE_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("FOOD_TRACE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./food_trace.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("food-trace-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("food-trace");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("food_trace.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }
}
