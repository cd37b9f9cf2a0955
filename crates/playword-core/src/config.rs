//! Session construction contract
//!
//! Everything the surrounding glue (CLI, MCP server, test harness) decides
//! once and hands to the engine at construction time. Browser choice and
//! reasoner credentials stay with the actuator/reasoner implementations;
//! this struct only carries what the core itself consumes.

use std::path::PathBuf;
use std::time::Duration;

/// Default recording log location
pub const DEFAULT_RECORD_PATH: &str = ".playword/recordings.json";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where the step log lives; must end in `.json`
    pub record_path: PathBuf,
    /// Whether resolved steps are persisted
    pub record: bool,
    /// Whether matching recorded steps are replayed instead of resolved
    pub playback: bool,
    /// Whether a failed replay falls back to resolution ("retry policy")
    pub retries: bool,
    /// Pause between replayed actions
    pub settle_delay: Duration,
    /// Candidates kept after ranking
    pub top_k: usize,
    /// Observer gesture debounce
    pub debounce: Duration,
    /// Observer user-action poll interval
    pub poll_interval: Duration,
    /// Bound on the observer's decision wait; `None` waits until an
    /// explicit accept/cancel or teardown
    pub decision_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            record_path: PathBuf::from(DEFAULT_RECORD_PATH),
            record: true,
            playback: true,
            retries: false,
            settle_delay: Duration::from_millis(250),
            top_k: 10,
            debounce: Duration::from_millis(500),
            poll_interval: Duration::from_millis(200),
            decision_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recording log path
    #[must_use]
    pub fn with_record_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.record_path = path.into();
        self
    }

    /// Enable or disable recording
    #[must_use]
    pub fn with_record(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Enable or disable playback of matching recorded steps
    #[must_use]
    pub fn with_playback(mut self, playback: bool) -> Self {
        self.playback = playback;
        self
    }

    /// Enable or disable the replay-failure retry policy
    #[must_use]
    pub fn with_retries(mut self, retries: bool) -> Self {
        self.retries = retries;
        self
    }

    /// Set the inter-action settle delay
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set how many ranked candidates to keep
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Bound the observer's decision wait
    #[must_use]
    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = Some(timeout);
        self
    }
}
