use std::{
    io::{self, IsTerminal},
    path::PathBuf,
};

use directories::ProjectDirs;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

const LOG_LEVEL_VAR: &str = "GITLAB_DOMAINS_LOG_LEVEL";
const LOG_DIR_VAR: &str = "GITLAB_DOMAINS_LOG_DIR";
const FILE_LOGS_VAR: &str = "GITLAB_DOMAINS_FILE_LOGS";
const JSON_LOGS_VAR: &str = "GITLAB_DOMAINS_JSON_LOGS";

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for console output
    pub console_level: Level,
    /// Log level for file output
    pub file_level: Level,
    /// Directory where log files should be written, `None` disables file logs
    pub log_dir: Option<PathBuf>,
    /// Whether to enable JSON formatted logs for structured output
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: Level::INFO,
            file_level: Level::DEBUG,
            log_dir: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Get the OS-appropriate default log directory
    pub fn default_log_dir() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "gitlab-domains") {
            proj_dirs.cache_dir().to_path_buf()
        } else {
            PathBuf::from("gitlab-domains-logs")
        }
    }

    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Override log levels from environment
        if let Ok(level) = std::env::var(LOG_LEVEL_VAR) {
            if let Ok(parsed_level) = level.parse::<Level>() {
                config.console_level = parsed_level;
                config.file_level = parsed_level;
            }
        }

        // File logs are opt-in for a one-shot command
        if let Ok(log_dir) = std::env::var(LOG_DIR_VAR) {
            config.log_dir = Some(PathBuf::from(log_dir));
        } else if std::env::var(FILE_LOGS_VAR).is_ok() {
            config.log_dir = Some(Self::default_log_dir());
        }

        // Enable JSON format for structured logging
        if std::env::var(JSON_LOGS_VAR).is_ok() {
            config.json_format = true;
        }

        config
    }

    /// Raise console output to debug level
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        if verbose && self.console_level < Level::DEBUG {
            self.console_level = Level::DEBUG;
        }
        self
    }
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Initialize the logging system with the given configuration.
///
/// The returned guard must be held until exit so buffered file logs are flushed.
pub fn init_logging(
    config: LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let mut layers = vec![];
    let mut guard = None;

    // Create file logging layer if log directory is specified
    if let Some(log_dir) = &config.log_dir {
        // Ensure log directory exists
        std::fs::create_dir_all(log_dir)?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "gitlab-domains.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(env_filter(config.file_level))
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(env_filter(config.file_level))
                .boxed()
        };

        layers.push(file_layer);
    }

    // Console output goes to stderr so stdout stays clean
    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter(config.console_level))
        .boxed();

    layers.push(console_layer);

    tracing_subscriber::registry().with(layers).try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_console_level() {
        let config = LoggingConfig::default().with_verbose(true);
        assert_eq!(config.console_level, Level::DEBUG);

        let config = LoggingConfig::default().with_verbose(false);
        assert_eq!(config.console_level, Level::INFO);
    }

    #[test]
    fn verbose_keeps_trace_level() {
        let config = LoggingConfig { console_level: Level::TRACE, ..Default::default() }
            .with_verbose(true);
        assert_eq!(config.console_level, Level::TRACE);
    }

    #[test]
    fn file_logs_are_off_by_default() {
        assert!(LoggingConfig::default().log_dir.is_none());
    }
}
