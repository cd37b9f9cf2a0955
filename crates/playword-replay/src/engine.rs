//! Replay engine - the session entry point
//!
//! Each top-level call is an explicit `begin` → `resolve_or_replay` → `end`
//! pipeline. `begin` lazily loads the log on first use; `end` persists the
//! completed step strictly before the cursor advances, which is the whole
//! crash-consistency story: a crash loses at most the in-flight step.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use playword_core::{
    execute_action, ActionResult, Actuator, Reasoner, Recording, Result, SessionConfig,
};
use playword_resolver::Resolver;

use crate::store::RecordingStore;

/// Instruction prefix that forces resolution even when a recorded step matches
pub const AI_MARKER: &str = "[AI]";

/// A completed step ready to persist
struct StepOutcome {
    recording: Recording,
    result: ActionResult,
}

/// Session engine: replays recorded steps, resolves everything else
pub struct ReplayEngine {
    actuator: Arc<dyn Actuator>,
    resolver: Resolver,
    store: RecordingStore,
    config: SessionConfig,
    step: usize,
    started: bool,
}

impl ReplayEngine {
    /// Create an engine over the given seams and configuration
    pub fn new(
        actuator: Arc<dyn Actuator>,
        reasoner: Arc<dyn Reasoner>,
        config: SessionConfig,
    ) -> Result<Self> {
        let store = RecordingStore::new(config.record_path.clone())?;
        let resolver =
            Resolver::new(Arc::clone(&actuator), reasoner).with_top_k(config.top_k);
        Ok(Self {
            actuator,
            resolver,
            store,
            config,
            step: 0,
            started: false,
        })
    }

    /// Current step cursor
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// The loaded recording log
    #[must_use]
    pub fn store(&self) -> &RecordingStore {
        &self.store
    }

    /// Carry out one instruction: replay the matching recorded step, or
    /// resolve through the reasoner, then persist and advance the cursor
    #[instrument(skip(self), fields(step = self.step))]
    pub async fn perform(&mut self, instruction: &str) -> Result<ActionResult> {
        self.begin().await?;
        let outcome = self.resolve_or_replay(instruction).await;
        self.end(outcome).await
    }

    /// Lazy first-call initialization
    async fn begin(&mut self) -> Result<()> {
        if !self.started {
            self.store.load().await?;
            self.started = true;
            debug!(steps = self.store.len(), "Session log loaded");
        }
        Ok(())
    }

    /// Decide between replay and resolution for this step
    async fn resolve_or_replay(&mut self, instruction: &str) -> Result<StepOutcome> {
        let (force_ai, input) = strip_marker(instruction);

        let matched = self.config.playback
            && !force_ai
            && self
                .store
                .get(self.step)
                .is_some_and(|recording| recording.input == input);

        if matched {
            let recording = self
                .store
                .get(self.step)
                .cloned()
                .expect("matched step exists");
            info!(step = self.step, "Replaying recorded step");
            self.replay(input, recording).await
        } else {
            info!(step = self.step, force_ai, "Resolving instruction");
            self.resolve(input).await
        }
    }

    /// Execute a recorded step through the actuator alone
    ///
    /// A recorded step is an atomic replayable unit: on the first sentinel
    /// failure or error, the remainder is discarded. With the retry policy
    /// enabled the whole instruction falls back to resolution; without it, a
    /// sentinel becomes the step's result and an error propagates untouched.
    async fn replay(&mut self, input: &str, recording: Recording) -> Result<StepOutcome> {
        let mut last = ActionResult::Text(String::new());

        for (position, action) in recording.actions.iter().enumerate() {
            if position > 0 {
                sleep(self.config.settle_delay).await;
            }

            match execute_action(self.actuator.as_ref(), &action.kind).await {
                Ok(result) if result.is_failure() => {
                    if self.config.retries {
                        warn!(
                            step = self.step,
                            position, "Replayed action failed; falling back to resolution"
                        );
                        return self.resolve(input).await;
                    }
                    return Ok(StepOutcome { recording, result });
                }
                Ok(result) => last = result,
                Err(e) => {
                    if self.config.retries {
                        warn!(
                            step = self.step,
                            position,
                            error = %e,
                            "Replay raised; falling back to resolution"
                        );
                        return self.resolve(input).await;
                    }
                    return Err(e);
                }
            }
        }

        let result = match last {
            ActionResult::Text(text) => ActionResult::from_content(&text),
            other => other,
        };
        Ok(StepOutcome { recording, result })
    }

    /// Resolve the whole instruction into a fresh step
    async fn resolve(&mut self, input: &str) -> Result<StepOutcome> {
        let resolution = self.resolver.resolve(input).await?;
        Ok(StepOutcome {
            recording: Recording::new(input, resolution.actions),
            result: resolution.result,
        })
    }

    /// Persist the completed step, then advance the cursor
    async fn end(&mut self, outcome: Result<StepOutcome>) -> Result<ActionResult> {
        match outcome {
            Ok(StepOutcome { recording, result }) => {
                if self.config.record {
                    self.store.set(self.step, recording);
                    self.store.save().await?;
                }
                self.step += 1;
                Ok(result)
            }
            // Under the retry policy a failed call still consumes its step;
            // the log keeps whatever was completed before.
            Err(e) if self.config.retries => {
                self.step += 1;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

/// Split the force-AI marker off an instruction
fn strip_marker(instruction: &str) -> (bool, &str) {
    let trimmed = instruction.trim();
    match trimmed.strip_prefix(AI_MARKER) {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use playword_core::{
        failure, Action, ActionKind, Error, InstructionKind, Message, ScrollDirection, ToolCall,
        ToolDefinition, ToolTurn,
    };
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    const LOGIN_PAGE: &str = r#"<html><body><a href="/login">Log in</a></body></html>"#;

    #[derive(Default)]
    struct ScriptedActuator {
        calls: Mutex<Vec<String>>,
        fail_xpaths: Vec<String>,
        error_xpaths: Vec<String>,
    }

    impl ScriptedActuator {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Actuator for ScriptedActuator {
        async fn navigate(&self, url: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("navigate {url}"));
            Ok(format!("Navigated to {url}"))
        }
        async fn click(&self, xpath: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("click {xpath}"));
            if self.error_xpaths.iter().any(|x| x == xpath) {
                return Err(Error::Actuator("navigation timeout".to_string()));
            }
            if self.fail_xpaths.iter().any(|x| x == xpath) {
                return Ok(failure("element not interactable"));
            }
            Ok(format!("Clicked on {xpath}"))
        }
        async fn hover(&self, _xpath: &str, _duration_ms: u64) -> Result<String> {
            Ok("Hovered".to_string())
        }
        async fn fill(&self, xpath: &str, text: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("fill {xpath} {text}"));
            Ok(format!("Filled {xpath}"))
        }
        async fn select_option(&self, _xpath: &str, _value: &str) -> Result<String> {
            Ok("Selected".to_string())
        }
        async fn press_keys(&self, keys: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("press {keys}"));
            Ok(format!("Pressed {keys}"))
        }
        async fn scroll(&self, direction: ScrollDirection) -> Result<String> {
            Ok(format!("Scrolled {direction}"))
        }
        async fn switch_frame(&self, _frame: Option<usize>) -> Result<String> {
            Ok("Switched frame".to_string())
        }
        async fn switch_page(&self, _page: usize) -> Result<String> {
            Ok("Switched page".to_string())
        }
        async fn wait_for_text(&self, text: &str) -> Result<String> {
            Ok(format!("Found {text}"))
        }
        async fn snapshot(&self) -> Result<String> {
            Ok(LOGIN_PAGE.to_string())
        }
        async fn screenshot(&self) -> Result<Vec<u8>> {
            Ok(vec![0])
        }
        async fn evaluate(
            &self,
            _script: &str,
            _args: &[serde_json::Value],
        ) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
        async fn reset(&self) -> Result<String> {
            Ok("Reset".to_string())
        }
    }

    /// Reasoner fake that counts every call and scripts one tool turn per
    /// instruction shape.
    #[derive(Default)]
    struct ScriptedReasoner {
        calls: Mutex<usize>,
    }

    impl ScriptedReasoner {
        fn total_calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        fn bump(&self) {
            *self.calls.lock().unwrap() += 1;
        }
    }

    #[async_trait]
    impl Reasoner for ScriptedReasoner {
        async fn classify(
            &self,
            _instruction: &str,
            _catalogue: &[ToolDefinition],
        ) -> Result<InstructionKind> {
            self.bump();
            Ok(InstructionKind::Operation)
        }
        async fn invoke_tools(
            &self,
            _catalogue: &[ToolDefinition],
            messages: &[Message],
        ) -> Result<ToolTurn> {
            self.bump();
            let instruction = &messages.last().unwrap().content;
            let call = if instruction.starts_with("Navigate") {
                let url = instruction.split_whitespace().last().unwrap();
                ToolCall {
                    id: "call_0".to_string(),
                    name: "navigate".to_string(),
                    arguments: json!({ "url": url }).to_string(),
                }
            } else {
                ToolCall {
                    id: "call_0".to_string(),
                    name: "click".to_string(),
                    arguments: json!({ "intent": "the login link" }).to_string(),
                }
            };
            Ok(ToolTurn {
                content: String::new(),
                tool_calls: vec![call],
            })
        }
        async fn structured_output(
            &self,
            _schema: &serde_json::Value,
            _messages: &[Message],
        ) -> Result<serde_json::Value> {
            self.bump();
            Ok(json!({"index": 0}))
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.bump();
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    fn config(path: &std::path::Path) -> SessionConfig {
        SessionConfig::new()
            .with_record_path(path)
            .with_settle_delay(Duration::ZERO)
    }

    async fn seed(path: &std::path::Path, recordings: Vec<Recording>) {
        let mut store = RecordingStore::new(path).unwrap();
        for recording in recordings {
            store.push(recording);
        }
        store.save().await.unwrap();
    }

    fn recorded_click() -> Recording {
        Recording::new(
            "Click the login link",
            vec![Action::new(ActionKind::Click {
                xpath: "//a[1]".to_string(),
            })],
        )
    }

    #[tokio::test]
    async fn test_empty_log_resolves_navigate_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());

        let mut engine =
            ReplayEngine::new(actuator.clone(), reasoner, config(&path)).unwrap();
        let result = engine.perform("Navigate to https://x.test").await.unwrap();

        assert_eq!(
            result,
            ActionResult::Text("Navigated to https://x.test".to_string())
        );
        assert_eq!(engine.step(), 1);
        assert_eq!(actuator.calls(), ["navigate https://x.test"]);

        let mut reloaded = RecordingStore::new(&path).unwrap();
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(0).unwrap().input, "Navigate to https://x.test");
    }

    #[tokio::test]
    async fn test_replay_precedence_makes_zero_reasoner_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        seed(&path, vec![recorded_click()]).await;

        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut engine =
            ReplayEngine::new(actuator.clone(), reasoner.clone(), config(&path)).unwrap();

        let result = engine.perform("Click the login link").await.unwrap();

        assert_eq!(result, ActionResult::Text("Clicked on //a[1]".to_string()));
        assert_eq!(actuator.calls(), ["click //a[1]"]);
        assert_eq!(reasoner.total_calls(), 0);
        assert_eq!(engine.step(), 1);
    }

    #[tokio::test]
    async fn test_idempotent_replay_same_action_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        seed(&path, vec![recorded_click()]).await;

        let mut sequences = Vec::new();
        for _ in 0..2 {
            let actuator = Arc::new(ScriptedActuator::default());
            let reasoner = Arc::new(ScriptedReasoner::default());
            let mut engine =
                ReplayEngine::new(actuator.clone(), reasoner, config(&path)).unwrap();
            engine.perform("Click the login link").await.unwrap();
            sequences.push(actuator.calls());
        }

        assert_eq!(sequences[0], sequences[1]);
    }

    #[tokio::test]
    async fn test_sentinel_replay_failure_falls_back_with_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        seed(&path, vec![recorded_click()]).await;

        let actuator = Arc::new(ScriptedActuator {
            fail_xpaths: vec!["//a[1]".to_string()],
            ..Default::default()
        });
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut engine = ReplayEngine::new(
            actuator.clone(),
            reasoner.clone(),
            config(&path).with_retries(true),
        )
        .unwrap();

        let result = engine.perform("Click the login link").await.unwrap();

        // The fallback re-resolved the whole instruction to a fresh locator.
        assert_eq!(
            result,
            ActionResult::Text("Clicked on //a[@href=\"/login\"]".to_string())
        );
        assert!(reasoner.total_calls() > 0);
        assert_eq!(
            actuator.calls(),
            ["click //a[1]", "click //a[@href=\"/login\"]"]
        );

        // The re-resolved step overwrote the stale one.
        let mut reloaded = RecordingStore::new(&path).unwrap();
        reloaded.load().await.unwrap();
        assert_eq!(
            reloaded.get(0).unwrap().actions[0].kind,
            ActionKind::Click {
                xpath: "//a[@href=\"/login\"]".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_sentinel_without_retries_is_the_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        seed(&path, vec![recorded_click()]).await;

        let actuator = Arc::new(ScriptedActuator {
            fail_xpaths: vec!["//a[1]".to_string()],
            ..Default::default()
        });
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut engine =
            ReplayEngine::new(actuator, reasoner.clone(), config(&path)).unwrap();

        let result = engine.perform("Click the login link").await.unwrap();

        assert!(result.is_failure());
        assert_eq!(reasoner.total_calls(), 0);
        assert_eq!(engine.step(), 1);
    }

    #[tokio::test]
    async fn test_error_without_retries_updates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        seed(&path, vec![recorded_click()]).await;

        let actuator = Arc::new(ScriptedActuator {
            error_xpaths: vec!["//a[1]".to_string()],
            ..Default::default()
        });
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut engine =
            ReplayEngine::new(actuator, reasoner, config(&path)).unwrap();

        let err = engine.perform("Click the login link").await.unwrap_err();
        assert!(matches!(err, Error::Actuator(_)));
        assert_eq!(engine.step(), 0);

        // The on-disk log is untouched.
        let mut reloaded = RecordingStore::new(&path).unwrap();
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.recordings(), [recorded_click()]);
    }

    #[tokio::test]
    async fn test_force_ai_marker_strips_and_forces_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        seed(&path, vec![recorded_click()]).await;

        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut engine =
            ReplayEngine::new(actuator, reasoner.clone(), config(&path)).unwrap();

        engine.perform("[AI] Click the login link").await.unwrap();

        assert!(reasoner.total_calls() > 0);
        let mut reloaded = RecordingStore::new(&path).unwrap();
        reloaded.load().await.unwrap();
        // The persisted input carries no marker.
        assert_eq!(reloaded.get(0).unwrap().input, "Click the login link");
    }

    #[tokio::test]
    async fn test_playback_disabled_always_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        seed(&path, vec![recorded_click()]).await;

        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut engine = ReplayEngine::new(
            actuator,
            reasoner.clone(),
            config(&path).with_playback(false),
        )
        .unwrap();

        engine.perform("Click the login link").await.unwrap();
        assert!(reasoner.total_calls() > 0);
    }

    #[tokio::test]
    async fn test_cursor_advances_once_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut engine =
            ReplayEngine::new(actuator, reasoner, config(&path)).unwrap();

        engine.perform("Navigate to https://a.test").await.unwrap();
        engine.perform("Navigate to https://b.test").await.unwrap();

        assert_eq!(engine.step(), 2);
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("Click it"), (false, "Click it"));
        assert_eq!(strip_marker("[AI] Click it"), (true, "Click it"));
        assert_eq!(strip_marker("  [AI]Click it  "), (true, "Click it"));
    }
}
