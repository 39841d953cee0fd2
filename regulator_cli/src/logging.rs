//! Tracing subscriber setup: console layer plus an optional JSON log file.

use std::path::Path;

use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::FILE_GUARD;

/// Filter precedence: `RUST_LOG`, then `--log-level`, then `[logging].level`, then "info".
fn build_filter(cli_level: Option<&str>, cfg: &regulator_config::Logging) -> EnvFilter {
    if let Ok(f) = EnvFilter::try_from_default_env() {
        return f;
    }
    let level = cli_level.or(cfg.level.as_deref()).unwrap_or("info");
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(json: bool, cli_level: Option<&str>, cfg: &regulator_config::Logging) -> eyre::Result<()> {
    let filter = build_filter(cli_level, cfg);

    // Console output goes to stderr; stdout carries command results.
    let pretty = (!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));
    let json_console = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    let file_layer = match cfg.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match cfg.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json_console)
        .with(file_layer)
        .try_init()
        .wrap_err("init tracing")
}
