//! PlayWord Core - Shared data model and external seams
//!
//! This crate defines the types shared by every PlayWord component:
//! - Types: actions, recordings, element locations, results
//! - Actuator: the external browser-control seam
//! - Reasoner: the external language-model/embedding seam
//! - Exec: the single executor mapping recorded actions onto the actuator
//! - Config: session construction contract
//! - Telemetry: explicit logger configuration (no ambient globals)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actuator;
pub mod config;
pub mod error;
pub mod exec;
pub mod reasoner;
pub mod telemetry;
pub mod types;

pub use actuator::{failure, is_failure, Actuator, FAILURE_MARKER};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use exec::execute_action;
pub use reasoner::{
    InstructionKind, Message, MessageRole, Reasoner, ToolCall, ToolDefinition, ToolTurn,
};
pub use telemetry::TelemetryConfig;
pub use types::{
    Action, ActionKind, ActionResult, ElementLocation, Recording, ScrollDirection, VectorRecord,
};
