use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` narrows or widens the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed, e.g. when a test harness set one.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
