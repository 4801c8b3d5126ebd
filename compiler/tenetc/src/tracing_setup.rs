//! Tracing initialization for the compiler driver.
//!
//! Controlled by `TENET_LOG` (falling back to `RUST_LOG`); defaults to `warn`
//! when neither is set.

use std::sync::OnceLock;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

static INIT: OnceLock<()> = OnceLock::new();

/// Initializes the tracing subscriber. Safe to call more than once — only
/// the first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("TENET_LOG")
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        Registry::default()
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr).compact())
            .with(filter)
            .init();
    });
}
