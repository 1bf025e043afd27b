// ==========================================
// 食品加工追溯系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口, 屏蔽数据库细节
// 约束: 所有查询使用参数化, 防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod metal_check_repo;
pub mod packaging_repo;
pub mod qc_repo;
pub mod reference_repo;
pub mod row_util;
pub mod sorting_repo;
pub mod step_run_repo;
pub mod step_store;
pub mod waste_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use metal_check_repo::MetalCheckRepository;
pub use packaging_repo::PackagingRepository;
pub use qc_repo::QcRepository;
pub use reference_repo::ReferenceRepository;
pub use sorting_repo::SortingRepository;
pub use step_run_repo::StepRunRepository;
pub use step_store::{SqliteStepStore, StepRecordStore, StepStoreRepositories};
pub use waste_repo::WasteRepository;
