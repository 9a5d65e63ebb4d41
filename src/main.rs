mod availability;
mod cli;
mod command;
mod config;
mod context;
mod error;
mod upload;
mod utils;

use std::{io::IsTerminal, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use command::Command;
use config::{config_path, Config};
use context::Context;
use error::ConfigError;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(use_ansi(&std::io::stderr()))
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print()?;
            return Ok(ExitCode::from(cli::parse_error_code(&err)));
        }
    };

    let config = match Config::load(config_path(cli.config.as_deref())) {
        Ok(config) => config,
        // Already reported to the user by the loader.
        Err(ConfigError::Created(_) | ConfigError::MissingSecret(_)) => {
            return Ok(ExitCode::FAILURE)
        }
        Err(e) => return Err(e.into()),
    };

    let mut context = Context::new(config, &cli.endpoint);
    context.cancel_on_ctrl_c();

    cli.upload.run(&mut context).await
}

/// Colour the logs only when they go to a terminal.
fn use_ansi<W: IsTerminal>(stream: &W) -> bool {
    stream.is_terminal()
}
