//! Error types for the PlayWord workspace
//!
//! One taxonomy shared by every component crate. Recoverable actuator
//! failures are deliberately NOT represented here: they travel as sentinel
//! strings in `Ok` values (see [`crate::actuator`]), so only unexpected
//! conditions ever become an `Error`.

use std::path::PathBuf;
use thiserror::Error;

/// PlayWord error type
#[derive(Debug, Error)]
pub enum Error {
    /// The element index found no candidate after filtering and ranking
    #[error("no candidate element matched the intent")]
    NoCandidate,

    /// The recording log path does not end in the required extension
    #[error("invalid recording path {}: must end in .json", .0.display())]
    InvalidLogPath(PathBuf),

    /// Structured output from the reasoner failed validation
    #[error("malformed reasoner output: {0}")]
    MalformedReasonerOutput(String),

    /// Unexpected actuator error (navigation timeout, engine crash)
    #[error("actuator error: {0}")]
    Actuator(String),

    /// Reasoner transport or provider error
    #[error("reasoner error: {0}")]
    Reasoner(String),

    /// The recording log could not be read or written
    #[error("recording store i/o error: {0}")]
    Store(#[from] std::io::Error),

    /// The recording log held invalid JSON
    #[error("recording serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
