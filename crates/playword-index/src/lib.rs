//! PlayWord Index - Semantic element retrieval
//!
//! Builds an ephemeral, per-resolution index of interactable DOM nodes from
//! an actuator snapshot and ranks them against a free-text intent:
//! - Enumerate allow-listed, visibly rendered elements
//! - Synthesize a stable locator per element (attributes before position)
//! - Embed candidate fragments plus the intent, rank by cosine similarity
//! - Disambiguate the top-K through the reasoner with strict index bounds
//!
//! An index never outlives one resolution call and never crosses a
//! page/frame boundary.

#![forbid(unsafe_code)]

pub mod index;
pub mod locator;

pub use index::{ElementIndex, RankedCandidate, DEFAULT_ALLOWED_TAGS};
pub use locator::synthesize_xpath;
