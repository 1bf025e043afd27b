// ==========================================
// 食品加工追溯系统 - 日志初始化
// ==========================================
// 使用 tracing + tracing-subscriber
// RUST_LOG 控制级别, FOOD_TRACE_LOG_FORMAT 控制输出格式
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "FOOD_TRACE_LOG_FORMAT";

/// 未设置 RUST_LOG 时的过滤器
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人读格式 (终端)
    Pretty,
    /// 每行一个 JSON 对象 (日志采集)
    Json,
}

impl LogFormat {
    /// 解析格式名, 无法识别时使用 Pretty
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }

    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or(LogFormat::Pretty)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器 (默认 info), 例如 RUST_LOG=food_trace::autosave=debug
///
/// ```no_run
/// food_trace::logging::init(food_trace::logging::LogFormat::Pretty);
/// ```
pub fn init(format: LogFormat) {
    let builder = fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true);

    match format {
        LogFormat::Pretty => builder.with_thread_ids(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// 按 FOOD_TRACE_LOG_FORMAT 选择格式并初始化
pub fn init_from_env() {
    init(LogFormat::from_env());
}

/// 测试用日志: debug 级别, 输出到测试捕获, 可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
    }

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        tracing::debug!("测试日志已初始化");
    }
}
