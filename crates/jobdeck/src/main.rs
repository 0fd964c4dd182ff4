//! # jobdeck
//!
//! Terminal dashboard for a distributed job-queue platform. Pages poll the
//! platform's dashboard HTTP API, pause while the terminal is unfocused, and
//! share one auto-refresh rate.
//!
//! ## Usage
//!
//! ```bash
//! jobdeck --url http://queue.internal:5555
//! jobdeck --route '/jobs?status=failed'
//! jobdeck --self-check
//! ```

mod app;
mod cli;
mod config;
mod messages;
mod pages;
mod routes;
mod sample;
mod self_check;

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use jobdeck_api::ApiClient;
use pagekit::{AppContext, Program};

use crate::app::Dashboard;
use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.self_check {
        return self_check::run(&mut std::io::stdout());
    }

    let config = cli.into_config()?;
    init_logging(&config)?;

    let api = Arc::new(ApiClient::new(&config.url)?);
    let ctx = Arc::new(AppContext::new(config.refresh_interval()));
    let dashboard = Dashboard::new(api, ctx, &config);

    Program::new(dashboard).with_fps(config.fps).run().await?;
    Ok(())
}

/// File logging only; the terminal belongs to the dashboard. Without a log
/// file, logging stays off entirely.
fn init_logging(config: &Config) -> anyhow::Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("bad log filter {:?}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
