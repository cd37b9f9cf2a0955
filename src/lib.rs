//! PlayWord - Browser automation in plain words
//!
//! Turns free-text instructions into concrete browser actions, replays
//! recorded steps deterministically, and captures human gestures as new
//! steps. The browser itself (the [`Actuator`]) and the language model
//! (the [`Reasoner`]) are injected seams; this crate wires the engine,
//! resolver, element index and observer around them.
//!
//! ```ignore
//! use std::sync::Arc;
//! use playword::{Session, SessionConfig};
//!
//! let config = SessionConfig::new().with_record_path(".playword/login.json");
//! let mut session = Session::new(actuator, reasoner, config)?;
//! session.perform("Navigate to https://example.test").await?;
//! session.perform("Click the login link").await?;
//! ```

#![forbid(unsafe_code)]

use std::sync::Arc;

pub use playword_core::{
    failure, is_failure, Action, ActionKind, ActionResult, Actuator, ElementLocation, Error,
    InstructionKind, Message, MessageRole, Reasoner, Recording, Result, ScrollDirection,
    SessionConfig, TelemetryConfig, ToolCall, ToolDefinition, ToolTurn, VectorRecord,
    FAILURE_MARKER,
};
pub use playword_core::telemetry;
pub use playword_index::{ElementIndex, RankedCandidate};
pub use playword_observer::{
    DryRunSummary, Gesture, Observer, ObserverEvent, ObserverHandle, ObserverPhase, ObserverState,
};
pub use playword_replay::{RecordingStore, ReplayEngine, AI_MARKER};
pub use playword_resolver::{catalogue_for, full_catalogue, Resolution, Resolver};

/// One automation session over an injected actuator and reasoner
///
/// Owns the replay engine; [`Session::observe`] hands the same seams and
/// log path to a fresh observer. The engine and an observer must not run
/// concurrently; the session is single-threaded by contract.
pub struct Session {
    actuator: Arc<dyn Actuator>,
    reasoner: Arc<dyn Reasoner>,
    config: SessionConfig,
    engine: ReplayEngine,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Construct a session from the given seams and configuration
    pub fn new(
        actuator: Arc<dyn Actuator>,
        reasoner: Arc<dyn Reasoner>,
        config: SessionConfig,
    ) -> Result<Self> {
        let engine = ReplayEngine::new(
            Arc::clone(&actuator),
            Arc::clone(&reasoner),
            config.clone(),
        )?;
        Ok(Self {
            actuator,
            reasoner,
            config,
            engine,
        })
    }

    /// Carry out one instruction: replay when recorded, resolve otherwise
    pub async fn perform(&mut self, instruction: &str) -> Result<ActionResult> {
        self.engine.perform(instruction).await
    }

    /// The underlying engine
    #[must_use]
    pub fn engine(&self) -> &ReplayEngine {
        &self.engine
    }

    /// An observer over the same seams and recording log
    pub fn observe(&self) -> Result<Observer> {
        Observer::new(
            Arc::clone(&self.actuator),
            Arc::clone(&self.reasoner),
            self.config.clone(),
        )
    }
}
