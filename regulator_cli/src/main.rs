mod cli;
mod devices;
mod error_fmt;
mod logging;
mod session;

use clap::Parser;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let cfg = match &cli.config {
        Some(path) => regulator_config::load_file(path)?,
        None => regulator_config::Config::default(),
    };
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::Run {
            pressure,
            exponent,
            duration_ms,
        } => session::run(&cfg, &pressure, &exponent, duration_ms, cli.json),
        Commands::Read => session::read(&cfg, cli.json),
        Commands::Close => session::close(&cfg, cli.json),
        Commands::SelfCheck => session::self_check(&cfg, cli.json),
    }
}
