//! Logging bootstrap and the request metrics collector.

pub mod metrics;

pub use metrics::{MetricsSnapshot, RequestMetrics};

use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing pipeline according to settings. Safe to call more
/// than once; later calls are no-ops.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match settings.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
    };

    // A subscriber set by a test harness is fine.
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    Ok(())
}
