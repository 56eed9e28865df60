//! Process-wide log subscriber. `log` records emitted by this crate and its
//! dependencies are forwarded into the same subscriber.
use std::env;

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use config::Logging;

pub fn init(config: &Logging) {
    let filter = env::var("RUST_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(config.level.as_str()));

    if let Err(e) = fmt().with_env_filter(filter).with_target(true).try_init() {
        eprintln!("Logger is already initialized: {}", e);
    }
}
