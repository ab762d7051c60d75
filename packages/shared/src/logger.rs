//! Tracing subscriber setup shared by every Hiroba binary.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence. Without it, the binary's own crate and
/// `tower_http` are logged at `default_level`.
///
/// # Arguments
///
/// * `bin_name` - Name of the running binary (`env!("CARGO_BIN_NAME")`)
/// * `default_level` - Level used when `RUST_LOG` is not set, e.g. `"debug"`
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let crate_name = bin_name.replace('-', "_");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{crate_name}={default_level},hiroba_server={default_level},tower_http={default_level}"
        ))
    });

    // try_init so that tests calling this more than once do not panic
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .try_init();
}
