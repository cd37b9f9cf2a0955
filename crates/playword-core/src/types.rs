//! Core data model
//!
//! Everything that crosses a component boundary lives here: the recorded
//! action model, the persisted recording (step) shape, element candidates
//! produced by the index, and the result value handed back to callers.

use serde::{Deserialize, Serialize};

use crate::actuator::is_failure;

/// Scroll direction understood by the actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Scroll up one viewport
    Up,
    /// Scroll down one viewport
    Down,
    /// Jump to the top of the page
    Top,
    /// Jump to the bottom of the page
    Bottom,
}

impl ScrollDirection {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl std::fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete, replayable browser action
///
/// Serialized as `{"name": "...", "params": {...}}` so the persisted log
/// stays readable and stable across versions. Every variant carries fully
/// resolved parameters (an xpath, never a free-text intent): replay must
/// not need the reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params", rename_all = "snake_case")]
pub enum ActionKind {
    /// Load a URL in the active page
    Navigate {
        /// Absolute URL to open
        url: String,
    },
    /// Click the element at an xpath
    Click {
        /// Resolved element locator
        xpath: String,
    },
    /// Hover over the element at an xpath
    Hover {
        /// Resolved element locator
        xpath: String,
        /// How long to keep the pointer over the element
        duration_ms: u64,
    },
    /// Clear and type text into the element at an xpath
    Fill {
        /// Resolved element locator
        xpath: String,
        /// Text to enter
        text: String,
    },
    /// Choose an option of the select element at an xpath
    SelectOption {
        /// Resolved element locator
        xpath: String,
        /// Option value to select
        value: String,
    },
    /// Press a key or chord on the active page
    PressKeys {
        /// Key sequence, e.g. `Enter` or `Control+A`
        keys: String,
    },
    /// Scroll the active page
    Scroll {
        /// Direction to scroll
        direction: ScrollDirection,
    },
    /// Switch the session into a frame, or back to the main document
    SwitchFrame {
        /// Zero-based frame index; `None` returns to the top document
        frame_number: Option<usize>,
    },
    /// Switch the session to another open page
    SwitchPage {
        /// Zero-based page index
        page_number: usize,
    },
    /// Block until the given text is present on the page
    WaitForText {
        /// Text to wait for
        text: String,
    },
    /// Check that the given text is present in the page snapshot
    AssertTextVisible {
        /// Text expected on the page
        text: String,
    },
    /// Check that the element at an xpath is visible
    AssertElementVisible {
        /// Resolved element locator
        xpath: String,
    },
    /// Check that the element's text equals the expectation
    AssertElementText {
        /// Resolved element locator
        xpath: String,
        /// Expected text content, compared after trimming
        expected: String,
    },
    /// Read the text content of the element at an xpath
    GetText {
        /// Resolved element locator
        xpath: String,
    },
    /// Read an attribute of the element at an xpath
    GetAttribute {
        /// Resolved element locator
        xpath: String,
        /// Attribute name to read
        attribute: String,
    },
    /// Capture a screenshot of the active page
    Screenshot,
}

impl ActionKind {
    /// Returns the wire name of this action
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::Hover { .. } => "hover",
            Self::Fill { .. } => "fill",
            Self::SelectOption { .. } => "select_option",
            Self::PressKeys { .. } => "press_keys",
            Self::Scroll { .. } => "scroll",
            Self::SwitchFrame { .. } => "switch_frame",
            Self::SwitchPage { .. } => "switch_page",
            Self::WaitForText { .. } => "wait_for_text",
            Self::AssertTextVisible { .. } => "assert_text_visible",
            Self::AssertElementVisible { .. } => "assert_element_visible",
            Self::AssertElementText { .. } => "assert_element_text",
            Self::GetText { .. } => "get_text",
            Self::GetAttribute { .. } => "get_attribute",
            Self::Screenshot => "screenshot",
        }
    }
}

/// A recorded action plus its dry-run verification flag
///
/// `success` is set only by the observer's dry run; it never influences
/// replay and is omitted from the log until stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The concrete action
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Observed dry-run outcome, if a dry run has stamped this action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl Action {
    /// Create an action with no dry-run stamp
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            success: None,
        }
    }
}

impl From<ActionKind> for Action {
    fn from(kind: ActionKind) -> Self {
        Self::new(kind)
    }
}

/// One persisted step: the instruction text and the actions it resolved to
///
/// The position of a recording in the log is its step number; log order is
/// canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Instruction text as given (force-AI marker already stripped)
    pub input: String,
    /// Concrete actions resolved for the instruction, in execution order
    pub actions: Vec<Action>,
}

impl Recording {
    /// Create a recording for an instruction
    #[must_use]
    pub fn new(input: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            input: input.into(),
            actions,
        }
    }
}

/// A candidate element produced by the element index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementLocation {
    /// Stable locator for the element
    pub xpath: String,
    /// Size-bounded HTML fragment describing the element
    pub html: String,
    /// Source URL of the owning frame, when not the top document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_src: Option<String>,
}

/// One embedded candidate, ephemeral to a single resolution call
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// The embedded text content
    pub content: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// The value a resolved or replayed instruction produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionResult {
    /// A boolean, produced only from the literal strings `true`/`false`
    Bool(bool),
    /// Any other content, passed through verbatim
    Text(String),
}

impl ActionResult {
    /// Build a result from final content: the literal strings `"true"` and
    /// `"false"` become booleans, everything else passes through verbatim.
    #[must_use]
    pub fn from_content(content: &str) -> Self {
        match content {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(content.to_string()),
        }
    }

    /// Whether this result carries the recoverable failure sentinel
    #[must_use]
    pub fn is_failure(&self) -> bool {
        match self {
            Self::Text(text) => is_failure(text),
            Self::Bool(_) => false,
        }
    }

    /// The boolean value, if this result is one
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for ActionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<String> for ActionResult {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
