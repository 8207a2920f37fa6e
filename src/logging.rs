//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured filter. When a log directory is
//! configured, a daily rolling file layer is added next to the stderr layer;
//! keep the returned [`WorkerGuard`] alive for as long as logs should be
//! flushed.

use crate::config::LoggingConfig;
use crate::error::{ControlError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter from `RUST_LOG`, falling back to the configured directive
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stderr = tracing_subscriber::fmt::layer()
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr);

    let (file, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(stderr)
        .with(file)
        .try_init()
        .map_err(|e| ControlError::Config(format!("Failed to install logger: {}", e)))?;

    if let Some(dir) = &config.directory {
        tracing::info!("Logging to {:?}", dir);
    }
    Ok(guard)
}
