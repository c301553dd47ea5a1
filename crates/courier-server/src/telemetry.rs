//! Logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,courier_server=debug,courier_hub=debug";

/// Initialize the global tracing subscriber.
///
/// # Configuration
///
/// Environment variables:
/// - `RUST_LOG`: log filter (default: `info,courier_server=debug,courier_hub=debug`)
/// - `COURIER_LOG_FORMAT`: `json` for one JSON object per line, anything else
///   for human readable output
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("COURIER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?;
    }

    tracing::debug!(json, "Telemetry initialized");
    Ok(())
}
