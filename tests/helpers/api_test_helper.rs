// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 基于临时数据库构建完整 AppState
// ==========================================

#![allow(dead_code)]

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::error::Error;

use food_trace::app::AppState;
use food_trace::logging;
use food_trace::domain::reference::Product;
use food_trace::domain::types::StepKind;
use food_trace::domain::StepRun;
use food_trace::notify::Notification;
use tempfile::NamedTempFile;

pub use test_helpers::{create_test_db, packaging_repo, seed_packaging_unit};

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// AppState 与临时数据库文件同生命周期
pub struct ApiTestEnv {
    pub db_path: String,
    pub state: AppState,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    pub async fn new() -> Result<Self, Box<dyn Error>> {
        logging::init_test();
        let (temp_file, db_path) = create_test_db()?;
        let state = AppState::new(db_path.clone()).await?;
        Ok(Self {
            db_path,
            state,
            _temp_file: temp_file,
        })
    }

    /// 新建工序记录
    pub async fn create_run(&self, kind: StepKind, lot_id: &str, available: &str) -> StepRun {
        self.state
            .step_run_api
            .create_step_run(kind, lot_id, available, "tester")
            .await
            .expect("创建工序记录失败")
    }

    pub fn seed_product(&self, product_id: &str) {
        self.state
            .reference_api
            .save_product(&Product {
                product_id: product_id.to_string(),
                name: format!("产品{}", product_id),
                unit: "kg".to_string(),
            })
            .expect("产品写入失败");
    }

    /// 当前有效通知的 i18n 键
    pub fn notification_keys(&self) -> Vec<String> {
        self.state
            .notifications
            .active()
            .into_iter()
            .map(|n: Notification| n.key)
            .collect()
    }
}
