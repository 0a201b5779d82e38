use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "cinematch=info,tower_http=info";

/// Installs the global fmt subscriber, honouring `RUST_LOG`
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
