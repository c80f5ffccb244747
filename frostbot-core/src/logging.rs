use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber. Host binaries call this once
/// at startup; repeat calls (embedders, tests) are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
