//! Tracing subscriber setup for processes embedding the engine.
//!
//! Levels used by the engine:
//! - WARN: resource exhaustion, persistence failures
//! - INFO: lifecycle, interfaces coming and going, tunnels
//! - DEBUG: routing decisions, path updates, forwarded packets
//! - TRACE: dropped frames and why

use tracing_subscriber::EnvFilter;

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// `RUST_LOG` if set, otherwise `info`.
pub fn init() {
    init_with_level("info");
}

/// Like [`init`], but `level` is the fallback when `RUST_LOG` is unset.
pub fn init_with_level(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or(level))
        .try_init();
}

/// JSON lines, for collectors.
pub fn init_json() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter_or("info"))
        .try_init();
}

/// Safe to call from every test.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or("debug"))
        .with_test_writer()
        .try_init();
}
