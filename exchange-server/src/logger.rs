//! Logging Infrastructure
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate and to request tracing. Output goes to stdout, or to a daily rolling
//! file when a log directory is configured.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// stops the file writer.
pub fn init_logger(log_level: &str, json: bool, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    let file_writer = log_dir.map(Path::new).and_then(|path| {
        if let Err(e) = std::fs::create_dir_all(path) {
            eprintln!("Log directory {} unusable, logging to stdout: {e}", path.display());
            return None;
        }
        let appender = tracing_appender::rolling::daily(path, "exchange-server");
        Some(tracing_appender::non_blocking(appender))
    });

    match (file_writer, json) {
        (Some((writer, guard)), true) => {
            builder.json().with_ansi(false).with_writer(writer).init();
            Some(guard)
        }
        (Some((writer, guard)), false) => {
            builder.with_ansi(false).with_writer(writer).init();
            Some(guard)
        }
        (None, true) => {
            builder.json().init();
            None
        }
        (None, false) => {
            builder.init();
            None
        }
    }
}

fn default_directives(level: &str) -> String {
    format!("exchange_server={level},tower_http={level}")
}
