//! Logging Infrastructure
//!
//! Structured logging setup for development (pretty, stdout) and production
//! (JSON, daily rolling file).

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` wins over `log_level` when set. Calling this twice is harmless;
/// the second subscriber is ignored.
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = json.unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // Add file output if log_dir is provided
    if let Some(dir) = log_dir.filter(|d| Path::new(d).exists()) {
        let file_appender = tracing_appender::rolling::daily(dir, "dine-server");
        let builder = builder.with_ansi(false).with_writer(file_appender);
        let _ = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        return;
    }

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
