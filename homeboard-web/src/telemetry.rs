use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber; `RUST_LOG` overrides the default `info` level.
pub(crate) fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();
}
