use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber for binaries and tests embedding the engine.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Returns false
/// when a global subscriber was already installed.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
