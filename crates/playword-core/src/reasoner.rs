//! Reasoner - the external language-model and embedding seam
//!
//! Conversation, tool-definition and tool-call types follow the common
//! chat-completions shape so any provider can sit behind the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Role in a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool response
    Tool,
}

impl MessageRole {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Tool call ID (for tool responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a tool-response message
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the reasoner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as a JSON string
    pub arguments: String,
}

impl ToolCall {
    /// Parse arguments as a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.arguments)
            .map_err(|e| Error::MalformedReasonerOutput(format!("{}: {e}", self.name)))
    }
}

/// One reasoner turn: text content plus any requested tool calls
#[derive(Debug, Clone, Default)]
pub struct ToolTurn {
    /// Text content, empty when the turn is tool calls only
    pub content: String,
    /// Tool calls in the order the reasoner returned them
    pub tool_calls: Vec<ToolCall>,
}

/// Instruction bucket produced by classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionKind {
    /// Movement and input: changes page state
    Operation,
    /// Boolean-producing check
    Assertion,
    /// Text, attribute or screenshot extraction
    Query,
}

impl InstructionKind {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operation => "operation",
            Self::Assertion => "assertion",
            Self::Query => "query",
        }
    }
}

impl std::fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InstructionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "operation" => Ok(Self::Operation),
            "assertion" => Ok(Self::Assertion),
            "query" => Ok(Self::Query),
            _ => Err(format!("unknown instruction kind: {s}")),
        }
    }
}

/// Language-model and embedding provider
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Bucket an instruction into operation / assertion / query, given the
    /// full catalogue for context
    async fn classify(
        &self,
        instruction: &str,
        catalogue: &[ToolDefinition],
    ) -> Result<InstructionKind>;

    /// Run one tool-calling turn over the bound catalogue and conversation
    async fn invoke_tools(
        &self,
        catalogue: &[ToolDefinition],
        messages: &[Message],
    ) -> Result<ToolTurn>;

    /// Produce output validated against a JSON schema; implementations must
    /// return `Error::MalformedReasonerOutput` when validation fails
    async fn structured_output(
        &self,
        schema: &serde_json::Value,
        messages: &[Message],
    ) -> Result<serde_json::Value>;

    /// Embed a batch of texts
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_parse_arguments() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "click".to_string(),
            arguments: r#"{"intent": "the login link"}"#.to_string(),
        };

        #[derive(Deserialize)]
        struct Args {
            intent: String,
        }

        let args: Args = call.parse_arguments().unwrap();
        assert_eq!(args.intent, "the login link");
    }

    #[test]
    fn test_tool_call_malformed_arguments() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "click".to_string(),
            arguments: "not json".to_string(),
        };
        let err = call.parse_arguments::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, Error::MalformedReasonerOutput(_)));
    }

    #[test]
    fn test_instruction_kind_round_trip() {
        for kind in [
            InstructionKind::Operation,
            InstructionKind::Assertion,
            InstructionKind::Query,
        ] {
            let parsed: InstructionKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("mystery".parse::<InstructionKind>().is_err());
    }
}
