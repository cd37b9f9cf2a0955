//! Telemetry - explicit logger configuration
//!
//! Verbosity is a constructor-passed object, not ambient process state: the
//! glue decides a filter once and hands it here. `RUST_LOG` still wins when
//! no explicit filter is given, so operators keep their usual knob.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logger configuration passed at construction
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Explicit filter directive, e.g. `playword=debug`; `None` falls back
    /// to `RUST_LOG`, then to the default directive
    pub filter: Option<String>,
    /// Include event targets in output
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: None,
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create a configuration with an explicit filter directive
    #[must_use]
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }
}

/// Install the global subscriber for this configuration
///
/// Safe to call more than once; later calls are no-ops, which keeps test
/// binaries that initialize per-test from panicking.
pub fn init(config: &TelemetryConfig) {
    let filter = match &config.filter {
        Some(directive) => EnvFilter::new(directive.clone()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "playword=info".into()),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_filter_wins_over_env() {
        let config = TelemetryConfig::with_filter("playword=trace");
        assert_eq!(config.filter.as_deref(), Some("playword=trace"));
        // Double init must not panic.
        init(&config);
        init(&config);
    }
}
