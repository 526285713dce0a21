use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a stderr `tracing` subscriber. `RUST_LOG` wins over `filter`;
/// an unparsable `filter` falls back to `info`. Returns `false` when a
/// global subscriber was already installed, in which case nothing changes.
pub fn init_tracing(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("tracing initialized");
    } else {
        tracing::debug!("tracing already initialized");
    }

    installed
}
