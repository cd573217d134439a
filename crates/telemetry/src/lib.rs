//! Tracing subscriber bootstrap.

use bookrev_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `telemetry.filter`. Calling this twice is
/// harmless: the second call reports that a subscriber is already set.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.filter)
            .map_err(|e| anyhow::anyhow!("invalid log filter '{}': {}", settings.filter, e))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if let Err(e) = installed {
        tracing::debug!(target: "bookrev-telemetry", error = %e, "subscriber already installed");
        return Ok(());
    }

    tracing::info!(
        target: "bookrev-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}
