//! Tracing subscriber setup shared by the binaries.
//!
//! Events go to stderr; stdout is reserved for the completion report.

use anyhow::anyhow;
use ignite_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .map_err(|e| anyhow!("invalid log filter '{}': {e}", settings.filter))?;

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    // A subscriber installed earlier (tests, embedding) is left in place.
    if installed.is_ok() {
        tracing::debug!(
            target: "ignite-telemetry",
            format = ?settings.log_format,
            "telemetry initialized"
        );
    }

    Ok(())
}
