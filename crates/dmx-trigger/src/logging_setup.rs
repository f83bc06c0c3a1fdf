use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer,
};

/// Logging options taken from the command line
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level name: off, error, warn, info, debug or trace
    pub level: String,
    /// Write to stderr, off with `--quiet`
    pub console_output: bool,
    /// Also write to this file
    pub file: Option<PathBuf>,
}

impl LogConfig {
    /// Map the 0-4 verbosity scale (off, error, warn, info, debug).
    pub fn from_verbosity(verbosity: u8, file: Option<PathBuf>) -> Self {
        let level = match verbosity {
            0 => "off",
            1 => "error",
            2 => "warn",
            3 => "info",
            _ => "debug",
        };
        Self {
            level: level.to_string(),
            console_output: true,
            file,
        }
    }

    /// Parse the level name, defaulting to INFO if invalid
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }
}

/// Handle to keep the logging worker thread alive
pub struct LogGuard {
    // Kept alive until dropped
    _guard: WorkerGuard,
}

/// Initialize the logging system
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    // RUST_LOG env var takes precedence
    let config_filter = EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy();

    let console_layer = if config.console_output {
        Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(config_filter.clone()),
        )
    } else {
        None
    };

    let (file_layer, guard) = match &config.file {
        Some(log_path) => {
            let file = File::create(log_path)
                .with_context(|| format!("Failed to create log file: {:?}", log_path))?;

            let (non_blocking, worker_guard) = tracing_appender::non_blocking(file);

            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No colors in file
                .with_filter(config_filter);

            (
                Some(layer),
                Some(LogGuard {
                    _guard: worker_guard,
                }),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!("Logging initialized at level: {}", config.level);
    if let Some(path) = &config.file {
        tracing::info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_scale() {
        let expected = [
            LevelFilter::OFF,
            LevelFilter::ERROR,
            LevelFilter::WARN,
            LevelFilter::INFO,
            LevelFilter::DEBUG,
        ];
        for (verbosity, level) in (0u8..).zip(expected) {
            let config = LogConfig::from_verbosity(verbosity, None);
            assert_eq!(config.parse_level(), level);
            assert!(config.console_output);
        }
    }

    #[test]
    fn test_invalid_level_defaults_to_info() {
        let config = LogConfig {
            level: "loud".to_string(),
            console_output: true,
            file: None,
        };
        assert_eq!(config.parse_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.log");
        let config = LogConfig::from_verbosity(3, Some(path));
        assert!(init(&config).is_err());
    }

    #[test]
    fn test_quiet_logs_to_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dmx-trigger.log");
        let mut config = LogConfig::from_verbosity(3, Some(path.clone()));
        config.console_output = false;

        let guard = init(&config).unwrap();
        assert!(guard.is_some());
        tracing::warn!("written while quiet");
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("written while quiet"));
    }
}
