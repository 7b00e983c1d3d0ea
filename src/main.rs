use anyhow::Context;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use calendar_events::storage::Config;
use calendar_events::storage::config::LoggingConfig;

mod cli;
use cli::{Cli, run};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_create().context("Failed to load configuration")?;
    let _guard = setup_logging(&config.logging);

    if let Err(e) = run(cli.command, &config) {
        tracing::error!("Command failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

fn setup_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(&logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let guard = match &logging.directory {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).ok();

            let file_appender = tracing_appender::rolling::daily(log_dir, "calendar-events.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            None
        }
    };

    tracing::info!("calendar-events started");
    guard
}
