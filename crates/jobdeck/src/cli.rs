//! Command-line interface.
//!
//! Every flag has an environment fallback so the dashboard can be pointed at
//! a deployment without retyping the URL. CLI values override the config
//! file, which overrides the built-in defaults.
//!
//! ```bash
//! # Watch a remote deployment, refreshing every 5 seconds
//! jobdeck --url http://queue.internal:5555 --refresh 5
//!
//! # Jump straight to failed jobs
//! jobdeck --route '/jobs?status=failed'
//!
//! # Headless render of every page (for CI)
//! jobdeck --self-check
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, ConfigError};

/// Terminal dashboard for a distributed job-queue platform.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "jobdeck",
    version,
    about = "Terminal dashboard for a distributed job-queue platform",
    long_about = "Watch queues, workers, jobs and scheduled tasks of a running \
                  job-queue deployment from the terminal. Tables poll the \
                  dashboard HTTP API and pause while the terminal is unfocused."
)]
pub struct Cli {
    /// Dashboard base URL
    #[arg(long, short = 'u', env = "JOBDECK_URL")]
    pub url: Option<String>,

    /// Auto-refresh interval in seconds; 0 starts paused
    #[arg(long, short = 'r', env = "JOBDECK_REFRESH")]
    pub refresh: Option<u64>,

    /// Initial page, as a deep link like /jobs?status=failed
    #[arg(long, env = "JOBDECK_ROUTE")]
    pub route: Option<String>,

    /// Path to a TOML config file
    #[arg(long, short = 'c', env = "JOBDECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append logs to this file; without it logging stays off
    #[arg(long, env = "JOBDECK_LOG")]
    pub log_file: Option<PathBuf>,

    /// Log filter (tracing EnvFilter syntax, e.g. "jobdeck=debug")
    #[arg(long, env = "JOBDECK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Render cadence in frames per second
    #[arg(long, env = "JOBDECK_FPS")]
    pub fps: Option<u16>,

    /// Rows fetched per table window
    #[arg(long, env = "JOBDECK_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Render every page once with sample data and exit
    #[arg(long)]
    pub self_check: bool,
}

impl Cli {
    /// Parse from an iterator, for tests.
    ///
    /// # Errors
    ///
    /// Returns an error when argument parsing fails.
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Resolves the effective configuration: file under flags, then
    /// validation.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(url) = self.url {
            config.url = url;
        }
        if let Some(refresh) = self.refresh {
            config.refresh_secs = refresh;
        }
        if let Some(route) = self.route {
            config.route = route;
        }
        if let Some(log_file) = self.log_file {
            config.log_file = Some(log_file);
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        config.validate()?;
        Ok(config)
    }
}
