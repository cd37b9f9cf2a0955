//! Tool catalogues
//!
//! Each instruction bucket binds a fixed catalogue. Element-targeting tools
//! take a free-text `intent` rather than a selector; the tool body resolves
//! it through the element index so the recorded action carries a concrete
//! xpath and replays without the reasoner.

use serde_json::json;

use playword_core::{InstructionKind, ToolDefinition};

fn intent_property() -> serde_json::Value {
    json!({
        "type": "string",
        "description": "Plain-language description of the target element, e.g. 'the login link in the header'"
    })
}

/// Movement and input tools
fn operation_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "navigate",
            "Load a URL in the active page",
            json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Absolute URL to open" }
                },
                "required": ["url"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "click",
            "Click an element described in plain language",
            json!({
                "type": "object",
                "properties": { "intent": intent_property() },
                "required": ["intent"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "hover",
            "Hover over an element described in plain language",
            json!({
                "type": "object",
                "properties": {
                    "intent": intent_property(),
                    "duration_ms": {
                        "type": "integer",
                        "description": "How long to hover, in milliseconds (default 1000)"
                    }
                },
                "required": ["intent"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "fill",
            "Clear a field described in plain language and type text into it",
            json!({
                "type": "object",
                "properties": {
                    "intent": intent_property(),
                    "text": { "type": "string", "description": "Text to enter" }
                },
                "required": ["intent", "text"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "select_option",
            "Choose an option of a select element described in plain language",
            json!({
                "type": "object",
                "properties": {
                    "intent": intent_property(),
                    "value": { "type": "string", "description": "Option value to select" }
                },
                "required": ["intent", "value"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "press_keys",
            "Press a key or chord on the active page",
            json!({
                "type": "object",
                "properties": {
                    "keys": { "type": "string", "description": "Key sequence, e.g. 'Enter' or 'Control+A'" }
                },
                "required": ["keys"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "scroll",
            "Scroll the active page",
            json!({
                "type": "object",
                "properties": {
                    "direction": { "type": "string", "enum": ["up", "down", "top", "bottom"] }
                },
                "required": ["direction"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "switch_frame",
            "Switch into a frame by index, or back to the main document",
            json!({
                "type": "object",
                "properties": {
                    "frame_number": {
                        "type": ["integer", "null"],
                        "description": "Zero-based frame index; null returns to the main document"
                    }
                },
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "switch_page",
            "Switch to another open page by index",
            json!({
                "type": "object",
                "properties": {
                    "page_number": { "type": "integer", "description": "Zero-based page index" }
                },
                "required": ["page_number"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "wait_for_text",
            "Wait until the given text is present on the page",
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to wait for" }
                },
                "required": ["text"],
                "additionalProperties": false,
            }),
        ),
    ]
}

/// Boolean-producing checks
fn assertion_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "assert_text_visible",
            "Check that the given text is present on the page",
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text expected on the page" }
                },
                "required": ["text"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "assert_element_visible",
            "Check that an element described in plain language is visible",
            json!({
                "type": "object",
                "properties": { "intent": intent_property() },
                "required": ["intent"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "assert_element_text",
            "Check that an element's text equals the expectation",
            json!({
                "type": "object",
                "properties": {
                    "intent": intent_property(),
                    "expected": { "type": "string", "description": "Expected text content" }
                },
                "required": ["intent", "expected"],
                "additionalProperties": false,
            }),
        ),
    ]
}

/// Text, attribute and screenshot extraction
fn query_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_text",
            "Read the text content of an element described in plain language",
            json!({
                "type": "object",
                "properties": { "intent": intent_property() },
                "required": ["intent"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "get_attribute",
            "Read an attribute of an element described in plain language",
            json!({
                "type": "object",
                "properties": {
                    "intent": intent_property(),
                    "attribute": { "type": "string", "description": "Attribute name to read" }
                },
                "required": ["intent", "attribute"],
                "additionalProperties": false,
            }),
        ),
        ToolDefinition::new(
            "screenshot",
            "Capture a screenshot of the active page",
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        ),
    ]
}

/// The fixed catalogue bound for one instruction bucket
#[must_use]
pub fn catalogue_for(kind: InstructionKind) -> Vec<ToolDefinition> {
    match kind {
        InstructionKind::Operation => operation_tools(),
        InstructionKind::Assertion => assertion_tools(),
        InstructionKind::Query => query_tools(),
    }
}

/// Every tool across all buckets, for classification context
#[must_use]
pub fn full_catalogue() -> Vec<ToolDefinition> {
    let mut tools = operation_tools();
    tools.extend(assertion_tools());
    tools.extend(query_tools());
    tools
}
