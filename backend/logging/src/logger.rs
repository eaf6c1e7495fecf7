//! Structured Logger
//!
//! Console output (plain or JSON) plus an optional daily-rotated NDJSON file,
//! with `RUST_LOG` taking precedence over the configured level.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber. Calling it again is a no-op.
pub fn init_logger(level: &str, log_dir: Option<&Path>, json_console: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Writes `cardscan.log.YYYY-MM-DD` under the log dir.
    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "cardscan.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let plain_console = (!json_console).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
    });
    let json_console_layer =
        json_console.then(|| fmt::layer().json().with_writer(std::io::stderr));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(plain_console)
        .with(json_console_layer)
        .with(file_layer)
        .try_init();
}
