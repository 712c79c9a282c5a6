//! Tracing subscriber setup
//!
//! The host process owns stdout/stderr, so the bridge installs a subscriber
//! only when asked to (`rtc_bridge_init`). A second initialisation is a no-op.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes priority over the configured level.
pub fn init_logging(config: &LogConfig) {
    let env_filter = env_filter(config);

    let result = if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_thread_names(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_thread_names(true))
            .try_init()
    };

    if let Err(err) = result {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| config.level.filter().into())
}
