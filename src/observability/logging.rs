//! # Logging
//!
//! Installs the global `tracing` subscriber.
//!
//! `RUST_LOG` wins when set; otherwise the filter is built from `LOG_LEVEL`
//! for this crate and `warn` for everything else.

use crate::config::ControllerConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Default filter directive for a configured log level
fn default_directive(level: &str) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        l @ ("error" | "warn" | "info" | "debug" | "trace") => l.to_string(),
        _ => "info".to_string(),
    };
    format!("warn,externalsecret_operator={level}")
}

pub fn init_tracing(config: &ControllerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.log_format.eq_ignore_ascii_case("text") {
        builder.with_ansi(config.log_enable_color).try_init()
    } else {
        builder.json().with_current_span(true).try_init()
    };

    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
