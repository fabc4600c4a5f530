use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output selected by `RUST_LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// `json` selects JSON lines, anything else the compact format
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") { LogFormat::Json } else { LogFormat::Compact }
    }

    fn from_env() -> Self {
        match var("RUST_LOG_FORMAT") {
            Ok(value) => Self::from_env_value(&value),
            Err(_) => LogFormat::default(),
        }
    }
}

/// Install the global subscriber at `info` unless `RUST_LOG` says otherwise
pub fn init_tracing() {
    init_tracing_with(LevelFilter::INFO);
}

/// Install the global subscriber with `level` as the default directive
///
/// A second call leaves the existing subscriber in place.
pub fn init_tracing_with(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    if let Err(error) = tracing_subscriber::registry().with(log_layer).try_init() {
        warn!("tracing subscriber already installed: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selection() {
        assert_eq!(LogFormat::from_env_value("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(""), LogFormat::Compact);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing_with(LevelFilter::DEBUG);
    }
}
