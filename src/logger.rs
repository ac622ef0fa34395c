//! 日志初始化
//!
//! `RUST_LOG` 优先；未设置时按 `VERBOSE_LOGGING` 选择 debug 或 info。
//! 在读取配置之前调用，配置解析中的警告也能输出。

use tracing_subscriber::EnvFilter;

pub fn init() {
    let verbose = std::env::var("VERBOSE_LOGGING")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), default_level))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
