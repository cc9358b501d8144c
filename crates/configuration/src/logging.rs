//! Building blocks for the application's tracing setup.
//!
//! The binary owns the subscriber (it also wires in progress bars); this module
//! turns `LoggingSettings` into the filter and the file writer it needs.

use crate::error::ConfigError;
use crate::settings::LoggingSettings;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise the configured level is used.
pub fn env_filter(settings: &LoggingSettings) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level).map_err(|e| {
            ConfigError::ValidationError(format!(
                "invalid logging.level '{}': {}",
                settings.level, e
            ))
        }),
    }
}

/// A non-blocking writer to a daily-rolling log file.
///
/// The returned guard must be held for the lifetime of the program, otherwise
/// buffered lines are lost on exit.
pub fn file_writer(settings: &LoggingSettings) -> Result<(NonBlocking, WorkerGuard), ConfigError> {
    std::fs::create_dir_all(&settings.directory).map_err(|source| ConfigError::LogDirectory {
        path: settings.directory.display().to_string(),
        source,
    })?;
    let appender = tracing_appender::rolling::daily(&settings.directory, &settings.file_name);
    Ok(tracing_appender::non_blocking(appender))
}
