//! Runtime configuration: defaults, optional TOML file, CLI overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::routes::Route;

/// Default dashboard endpoint.
pub const DEFAULT_URL: &str = "http://localhost:5555";

/// Configuration errors, reported before the terminal is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("dashboard URL must start with http:// or https://, got {0:?}")]
    BadUrl(String),

    #[error("fps must be between 1 and 120, got {0}")]
    BadFps(u16),

    #[error("page size must be at least 1")]
    ZeroPageSize,

    #[error("unknown route {0:?}")]
    BadRoute(String),
}

/// Effective runtime settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Dashboard base URL.
    pub url: String,
    /// Auto-refresh interval in seconds; 0 pauses polling.
    pub refresh_secs: u64,
    /// Rows fetched per table window.
    pub page_size: usize,
    /// Render cadence.
    pub fps: u16,
    /// Initial deep link, e.g. `/jobs?status=failed`.
    pub route: String,
    /// Log destination; logging stays off without one.
    pub log_file: Option<PathBuf>,
    /// Log filter in `tracing` `EnvFilter` syntax.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            refresh_secs: 10,
            page_size: pagekit::poll::DEFAULT_PAGE_SIZE,
            fps: 30,
            route: "/".to_owned(),
            log_file: None,
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    /// Loads settings from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Checks the settings that would otherwise fail deep inside the UI.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ConfigError::BadUrl(self.url.clone()));
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::BadFps(self.fps));
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if Route::parse(&self.route).is_none() {
            return Err(ConfigError::BadRoute(self.route.clone()));
        }
        Ok(())
    }

    /// The auto-refresh interval; zero means paused.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    /// The initial route and its parameters. Only valid after
    /// [`Config::validate`] passed.
    #[must_use]
    pub fn initial_route(&self) -> (Route, std::collections::BTreeMap<String, String>) {
        Route::parse(&self.route).unwrap_or((Route::Overview, std::collections::BTreeMap::new()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.refresh_secs, 10);
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
    }

    #[test]
    fn load_layers_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "url = \"http://queue.internal:5555\"").unwrap();
        writeln!(file, "refresh_secs = 30").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.url, "http://queue.internal:5555");
        assert_eq!(config.refresh_secs, 30);
        // Untouched keys keep their defaults.
        assert_eq!(config.page_size, pagekit::poll::DEFAULT_PAGE_SIZE);
        assert_eq!(config.fps, 30);
    }

    #[test]
    fn load_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "refresh = 30").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/jobdeck.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config {
            url: "ftp://x".to_owned(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BadUrl(_))));

        config.url = DEFAULT_URL.to_owned();
        config.fps = 0;
        assert!(matches!(config.validate(), Err(ConfigError::BadFps(0))));
        config.fps = 200;
        assert!(matches!(config.validate(), Err(ConfigError::BadFps(200))));

        config.fps = 30;
        config.page_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPageSize)));

        config.page_size = 25;
        config.route = "/nope".to_owned();
        assert!(matches!(config.validate(), Err(ConfigError::BadRoute(_))));
    }

    #[test]
    fn initial_route_parses_params() {
        let config = Config {
            route: "/jobs?queue=default".to_owned(),
            ..Config::default()
        };
        let (route, params) = config.initial_route();
        assert_eq!(route, Route::Jobs);
        assert_eq!(params.get("queue").map(String::as_str), Some("default"));
    }

    #[test]
    fn zero_refresh_means_paused() {
        let config = Config {
            refresh_secs: 0,
            ..Config::default()
        };
        config.validate().unwrap();
        assert!(config.refresh_interval().is_zero());
    }
}
