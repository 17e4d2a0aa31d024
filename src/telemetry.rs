use std::error::Error;

use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Installs the global subscriber, filtered by `RUST_LOG` (default `info`).
/// Records from the `log` crate, such as actix's request logger, are picked
/// up as well. Fails when a global subscriber or logger is already set.
pub fn init(format: LogFormat) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(false)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
    };
    if let Err(err) = &installed {
        tracing::debug!(error = %err, "keeping the subscriber that is already installed");
    }
    installed
}
