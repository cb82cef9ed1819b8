use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Read the format from `RUST_LOG_FORMAT`, falling back to compact output.
    pub fn from_env() -> Self {
        let log_format = var("RUST_LOG_FORMAT")
            .inspect_err(|error| {
                warn!("Failed to read RUST_LOG_FORMAT, falling back to default: {error}")
            })
            .unwrap_or_default();

        Self::parse(&log_format)
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

pub fn init() {
    init_with_level(LevelFilter::INFO);
}

/// Initialize tracing with `level` as the default directive.
///
/// `RUST_LOG` still takes precedence over `level` for any target it names.
/// Calling this twice is harmless: the second subscriber is not installed.
pub fn init_with_level(level: LevelFilter) {
    initialize_tracing(level, LogFormat::from_env());
}

fn initialize_tracing(level: LevelFilter, format: LogFormat) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    let _ = tracing_subscriber::registry().with(log_layer).try_init();
}
