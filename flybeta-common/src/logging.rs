//! Tracing subscriber setup shared by FlyBeta binaries

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. When a log file is
/// configured, output goes there (appending, no ANSI colors) instead of stderr.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let (stderr_layer, file_layer) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::Config(format!("Cannot open log file {}: {}", path.display(), e))
                })?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Internal(format!("Tracing already initialized: {}", e)))
}
