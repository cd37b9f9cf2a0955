//! Actuator - the external browser-control seam
//!
//! The actuator owns every page-control primitive. Implementations wrap a
//! real browser driver; tests use mocks. Recoverable conditions (a missing
//! element, a detached node) come back as sentinel failure strings inside
//! `Ok`, so the engine can fall back without unwinding; only unexpected
//! engine or environment errors are returned as `Err`.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ScrollDirection;

/// Prefix marking a recoverable actuator failure
pub const FAILURE_MARKER: &str = "Failed:";

/// Build a sentinel failure string
#[must_use]
pub fn failure(reason: impl std::fmt::Display) -> String {
    format!("{FAILURE_MARKER} {reason}")
}

/// Whether a result string carries the failure sentinel
#[must_use]
pub fn is_failure(result: &str) -> bool {
    result.starts_with(FAILURE_MARKER)
}

/// Browser-control primitives
///
/// All methods are suspension points under the cooperative scheduling
/// model; none of them may be called concurrently for the same session.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Load a URL in the active page
    async fn navigate(&self, url: &str) -> Result<String>;

    /// Click the element at an xpath
    async fn click(&self, xpath: &str) -> Result<String>;

    /// Hover over the element at an xpath for a duration
    async fn hover(&self, xpath: &str, duration_ms: u64) -> Result<String>;

    /// Clear and type text into the element at an xpath
    async fn fill(&self, xpath: &str, text: &str) -> Result<String>;

    /// Choose an option of the select element at an xpath
    async fn select_option(&self, xpath: &str, value: &str) -> Result<String>;

    /// Press a key or chord on the active page
    async fn press_keys(&self, keys: &str) -> Result<String>;

    /// Scroll the active page
    async fn scroll(&self, direction: ScrollDirection) -> Result<String>;

    /// Switch into a frame by index, or back to the top document
    async fn switch_frame(&self, frame_number: Option<usize>) -> Result<String>;

    /// Switch to another open page by index
    async fn switch_page(&self, page_number: usize) -> Result<String>;

    /// Block until the given text is present on the page
    async fn wait_for_text(&self, text: &str) -> Result<String>;

    /// Serialized HTML of the document the session is switched into
    async fn snapshot(&self) -> Result<String>;

    /// PNG screenshot of the active page
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Evaluate a script against the active document
    async fn evaluate(&self, script: &str, args: &[serde_json::Value])
        -> Result<serde_json::Value>;

    /// Source URL of the frame the session is switched into, when not the
    /// top document
    async fn frame_src(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Reset page state for a deterministic dry run: clear cookies, storage,
    /// caches and registered workers, then close and reopen the pages
    async fn reset(&self) -> Result<String>;
}
