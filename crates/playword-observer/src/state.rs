//! Observer state, gestures, signals and events
//!
//! The observer's state is a typed object: one primary phase plus an
//! orthogonal `waiting_for_ai` substate, which can be set while the
//! observer is also waiting for the user. Loose boolean flags made that
//! combination ambiguous; the enum does not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use playword_core::ActionKind;

/// Primary observer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserverPhase {
    /// No gesture in flight
    #[default]
    Idle,
    /// A pending action awaits the human's accept/cancel decision
    WaitingForUser,
    /// The recording log is being replayed for verification
    DryRunning,
}

/// Typed observer state: primary phase plus the AI substate
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverState {
    /// Primary phase
    pub phase: ObserverPhase,
    /// A reasoner description request is in flight; may be true while the
    /// phase is `WaitingForUser`
    pub waiting_for_ai: bool,
}

impl ObserverState {
    /// Whether a new gesture may be captured
    #[must_use]
    pub fn accepts_gestures(&self) -> bool {
        self.phase == ObserverPhase::Idle && !self.waiting_for_ai
    }
}

/// A raw human gesture captured from the instrumented page
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Pointer click on an element
    Click {
        /// Locator of the clicked element
        xpath: String,
        /// Serialized fragment of the clicked element
        html: String,
    },
    /// Pointer rest over an element
    Hover {
        /// Locator of the hovered element
        xpath: String,
        /// Serialized fragment of the hovered element
        html: String,
    },
    /// Text entered into a field
    Input {
        /// Locator of the field
        xpath: String,
        /// Entered value
        value: String,
    },
    /// Option chosen in a select element
    Select {
        /// Locator of the select element
        xpath: String,
        /// Chosen option value
        value: String,
    },
    /// Focus moved into a frame (or back to the main document)
    FrameNavigate {
        /// Zero-based frame index; `None` is the main document
        frame_number: Option<usize>,
    },
}

impl Gesture {
    /// The concrete action this gesture records as
    #[must_use]
    pub fn to_action(&self) -> ActionKind {
        match self {
            Self::Click { xpath, .. } => ActionKind::Click {
                xpath: xpath.clone(),
            },
            Self::Hover { xpath, .. } => ActionKind::Hover {
                xpath: xpath.clone(),
                duration_ms: 1000,
            },
            Self::Input { xpath, value } => ActionKind::Fill {
                xpath: xpath.clone(),
                text: value.clone(),
            },
            Self::Select { xpath, value } => ActionKind::SelectOption {
                xpath: xpath.clone(),
                value: value.clone(),
            },
            Self::FrameNavigate { frame_number } => ActionKind::SwitchFrame {
                frame_number: *frame_number,
            },
        }
    }

    /// Serialized element fragment, when the gesture carries one
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Click { html, .. } | Self::Hover { html, .. } => Some(html),
            _ => None,
        }
    }
}

/// The human's verdict on a pending action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Append the pending action to the log
    Accept,
    /// Discard the pending action
    Cancel,
}

/// Events emitted while observing
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    /// The pending action's description changed
    PendingUpdated {
        /// Natural-language description of the pending action
        description: String,
    },
    /// A pending action was accepted and persisted
    Accepted {
        /// Step index the recording landed at
        step: usize,
    },
    /// The pending action was discarded
    Cancelled,
    /// A dry run finished
    DryRunFinished {
        /// Actions observed succeeding
        passed: usize,
        /// Actions observed failing
        failed: usize,
    },
    /// Non-fatal notification; the capture loop stays alive
    Notify {
        /// Human-readable message
        message: String,
    },
}

/// Cloneable handle the UI uses to signal the observer
///
/// The observer polls these signals from its decision wait loop; the handle
/// never blocks.
#[derive(Clone, Default)]
pub struct ObserverHandle {
    inner: Arc<Signals>,
}

#[derive(Default)]
struct Signals {
    decision: Mutex<Option<Decision>>,
    torn_down: AtomicBool,
}

impl ObserverHandle {
    /// Create a fresh handle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the pending action
    pub fn accept(&self) {
        *self.inner.decision.lock().expect("signal lock") = Some(Decision::Accept);
    }

    /// Cancel the pending action
    pub fn cancel(&self) {
        *self.inner.decision.lock().expect("signal lock") = Some(Decision::Cancel);
    }

    /// Tear the session down; any wait loop exits as a cancel
    pub fn teardown(&self) {
        self.inner.torn_down.store(true, Ordering::SeqCst);
    }

    /// Take the pending decision, if any
    #[must_use]
    pub fn take_decision(&self) -> Option<Decision> {
        self.inner.decision.lock().expect("signal lock").take()
    }

    /// Whether teardown was signalled
    #[must_use]
    pub fn torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }
}
