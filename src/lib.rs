// ==========================================
// 食品加工追溯系统 - 核心库
// ==========================================
// 范围: 清洗 / 干燥 / 金属检测 / 分选 / 包装 / 质检 工序记录
// 技术栈: Rust + SQLite
// 核心: 数量分配台账 + 防抖自动保存
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 用户通知
pub mod notify;

// 作用域缓存
pub mod cache;

// 自动保存
pub mod autosave;

// 报表导出
pub mod export;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CheckStatus, ChildKind, ContaminationStatus, LedgerCategory, QcParameter, StepKind,
    StepRunStatus, WasteType, YesNoNa,
};

// 领域实体
pub use domain::{ActionLog, ActionType, StepRun, StepRunDetail, StepRunUpsert};

// 引擎
pub use engine::{
    compute_remaining, validate_entry, AllocationError, AllocationLedger, LedgerSnapshot,
    MetalCheckValidator, PackagingCalculator, QcEvaluator, Tolerance,
};

// API
pub use api::{ApiError, ApiResult, SortingApi, StepRunApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "食品加工追溯系统";
