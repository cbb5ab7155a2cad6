//! Log subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{DriverError, Result};

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter` when it is set.
pub fn init_logging(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| DriverError::Logging(format!("invalid log level: {e}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| DriverError::Logging("logging already initialized".into()))
}
