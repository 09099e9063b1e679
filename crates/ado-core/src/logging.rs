//! Subscriber setup for binaries and tests embedding the library.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a formatted subscriber filtered by `RUST_LOG`.
///
/// Defaults to `ado_core=debug,info`. Safe to call more than once; only the
/// first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ado_core=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
