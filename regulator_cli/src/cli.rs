//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "regulator", version, about = "Leak-valve pressure regulator")]
pub struct Cli {
    /// Path to config TOML; built-in bench defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Regulate toward `<pressure>E-<exponent>` until Ctrl-C or --duration-ms
    Run {
        /// Whole-number mantissa of the setpoint (e.g. 5 for 5E-8)
        #[arg(long, value_name = "WHOLE")]
        pressure: String,
        /// Digits of the negative exponent (e.g. 8 for 5E-8)
        #[arg(long, value_name = "DIGITS")]
        exponent: String,
        /// Stop the session after this many milliseconds
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
    },
    /// Print one pressure reading
    Read,
    /// Close the leak valve
    Close,
    /// Quick health check (gauge answers, valve accepts a close)
    SelfCheck,
}
