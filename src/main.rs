//! Shipwright CLI
//!
//! Usage: shipwright [ENVIRONMENT] [--config PATH] [--state-dir PATH] [--json] [-v]
//!
//! ENVIRONMENT is a configured environment name or `all`.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shipwright::presentation::Cli;

mod commands;
mod ui;

use ui::context::UiContext;

fn init_tracing(ui: &UiContext) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(ui.log_level()));
    // Logs always go to stderr; stdout carries the summary or NDJSON events
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(ui.color)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ui = UiContext::new(cli.json, cli.verbose, cli.color);
    init_tracing(&ui);

    match commands::deploy::cmd_deploy(&cli, &ui) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            tracing::debug!(error = ?err, "deploy aborted");
            if ui.json {
                println!("{}", ui::error::format_error(&err, &ui));
            } else {
                eprintln!("{}", ui::error::format_error(&err, &ui));
            }
            ExitCode::FAILURE
        }
    }
}
