//! Tracing initialization for the `rowmodel` binary.
//!
//! Logs go to stderr so that standard output only carries the dumped JSON. The filter is
//! read from `RUST_LOG` when set, and otherwise from the configured `log_filter`.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the fmt subscriber.
///
/// Parameters:
/// - `default_filter`: filter directives used when `RUST_LOG` is not set (e.g. `info`,
///   `rowmodel=debug`)
pub fn init_telemetry(default_filter: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    info!("Telemetry initialized");
    Ok(())
}
