//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Honors `RUST_LOG` and falls back to `info`. Library code only emits
/// through the `log` facade; binaries call this once at startup.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Initialize logging for tests, ignoring repeated initialization
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
