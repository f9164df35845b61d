//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with an explicit filter string (e.g. `"info"`
/// or `"spatial_engine::spatial=trace"`). `RUST_LOG` still wins when set.
///
/// Returns `false` if a logger was already installed.
pub fn init_with_filter(filter: &str) -> bool {
    let env = env_logger::Env::default().default_filter_or(filter);
    env_logger::Builder::from_env(env).try_init().is_ok()
}
