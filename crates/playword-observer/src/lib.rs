//! PlayWord Observer - Capture human gestures as persisted steps
//!
//! Instruments a live page session: raw gestures become pending actions,
//! the reasoner names them, and an accept/cancel workflow appends them to
//! the same recording log the replay engine consumes. A dry run resets
//! page state, replays the whole log through the actuator alone, and
//! stamps an observed success flag on every action.

#![forbid(unsafe_code)]

pub mod observer;
pub mod state;

pub use observer::{DryRunSummary, Observer};
pub use state::{Decision, Gesture, ObserverEvent, ObserverHandle, ObserverPhase, ObserverState};
