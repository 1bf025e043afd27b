// ==========================================
// 食品加工追溯系统 - 命令行入口
// ==========================================
// 用法: food-trace [db_path] [step_run_id]
// - 无 step_run_id: 初始化数据库并列出表结构版本
// - 有 step_run_id: 输出台账快照 (JSON) 和追溯报表 (CSV)
// ==========================================

use anyhow::{anyhow, Context};
use food_trace::app::{get_default_db_path, AppState};
use food_trace::export::export_step_run_report;
use food_trace::{db, i18n, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_from_env();
    i18n::init_from_env();

    tracing::info!("==================================================");
    tracing::info!("{}", food_trace::APP_NAME);
    tracing::info!("系统版本: {}", food_trace::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let step_run_id = args.next();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path.clone())
        .await
        .map_err(|e| anyhow!(e))
        .context("无法初始化AppState")?;

    let Some(step_run_id) = step_run_id else {
        let conn = db::open_sqlite_connection(&db_path)?;
        let version = db::read_schema_version(&conn)?;
        println!("schema_version = {}", version.unwrap_or_default());
        return Ok(());
    };

    let view = state
        .step_run_api
        .fetch_step_run(&step_run_id)
        .await
        .with_context(|| format!("工序记录读取失败: {}", step_run_id))?;

    println!("{}", serde_json::to_string_pretty(&view.ledger)?);

    let stdout = std::io::stdout();
    let rows = export_step_run_report(&view.detail, view.ledger.as_ref(), stdout.lock())?;
    tracing::info!(rows, "追溯报表已导出");

    Ok(())
}
