// ==========================================
// 食品加工追溯系统 - 通知文案国际化
// ==========================================
// 文案文件: locales/zh-CN.yml, locales/en.yml
// 占位符格式: %{name}
// rust_i18n::i18n! 宏在 lib.rs 中初始化
// ==========================================

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 已提供文案的语言
pub const SUPPORTED_LOCALES: &[&str] = &["zh-CN", "en"];

/// 语言环境变量
pub const LOCALE_ENV: &str = "FOOD_TRACE_LOCALE";

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 切换界面语言
///
/// 未提供文案的语言保持当前设置, 返回 false
pub fn set_locale(locale: &str) -> bool {
    let Some(supported) = SUPPORTED_LOCALES
        .iter()
        .find(|l| l.eq_ignore_ascii_case(locale.trim()))
    else {
        tracing::warn!(locale = %locale, "不支持的语言, 保持当前设置");
        return false;
    };
    rust_i18n::set_locale(supported);
    true
}

/// 按环境变量 FOOD_TRACE_LOCALE 设置语言, 未设置时使用默认语言
pub fn init_from_env() {
    let requested = std::env::var(LOCALE_ENV).unwrap_or_default();
    if requested.trim().is_empty() || !set_locale(&requested) {
        rust_i18n::set_locale(DEFAULT_LOCALE);
    }
}

/// 翻译文案键
///
/// ```no_run
/// let msg = food_trace::i18n::t("notify.saved");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译并填充占位符
///
/// ```no_run
/// use food_trace::i18n::t_with_args;
/// let msg = t_with_args("metal.rejected", &[("weight", "1.250")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(t(key), |text, (name, value)| {
        text.replace(&format!("%{{{}}}", name), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为进程级全局状态
    static LOCALE_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale_rejects_unknown() {
        let _guard = LOCALE_LOCK.lock().unwrap();
        assert!(set_locale("en"));
        assert_eq!(current_locale(), "en");

        assert!(!set_locale("fr"));
        assert_eq!(current_locale(), "en");

        assert!(set_locale("ZH-cn"));
        assert_eq!(current_locale(), DEFAULT_LOCALE);
    }

    #[test]
    fn test_notification_texts() {
        let _guard = LOCALE_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(t("notify.saved"), "已保存");
        let msg = t_with_args("notify.save_failed", &[("reason", "disk full")]);
        assert!(msg.contains("保存失败"));
        assert!(msg.contains("disk full"));

        set_locale("en");
        assert_eq!(t("notify.saved"), "Saved");
        let msg = t_with_args("qc.failed", &[("parameters", "Colour, Odour")]);
        assert_eq!(msg, "QC check failed: Colour, Odour");

        set_locale(DEFAULT_LOCALE);
    }

    #[test]
    fn test_every_key_translated_in_both_locales() {
        let _guard = LOCALE_LOCK.lock().unwrap();
        let keys = [
            "notify.submitted",
            "notify.deleted",
            "autosave.failed",
            "ledger.over_budget",
            "metal.rejected",
            "weight_check.out_of_tolerance",
            "packaging.photo_upload_unavailable",
        ];
        for locale in SUPPORTED_LOCALES {
            set_locale(locale);
            for key in keys {
                // 缺失文案时 rust-i18n 原样返回带语言前缀的键
                assert!(!t(key).contains(key), "{} 缺少 {}", locale, key);
            }
        }
        set_locale(DEFAULT_LOCALE);
    }
}
