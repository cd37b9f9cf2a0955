//! The capture loop

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use playword_core::{
    execute_action, Action, Actuator, Error, InstructionKind, Message, Reasoner, Recording,
    Result, SessionConfig,
};
use playword_resolver::catalogue_for;
use playword_replay::RecordingStore;

use crate::state::{
    Decision, Gesture, ObserverEvent, ObserverHandle, ObserverPhase, ObserverState,
};

const DESCRIBE_PROMPT: &str = "A human performed one gesture on a live web page. Match it to \
the tool it corresponds to and describe it in one short imperative sentence a test step \
would use, e.g. 'Click the login link'.";

/// Outcome of a dry run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DryRunSummary {
    /// Actions observed succeeding
    pub passed: usize,
    /// Actions observed failing
    pub failed: usize,
}

/// Captures live-page gestures into the recording log
///
/// One gesture is in flight at a time: the phase guard drops new gestures
/// until the pending one is accepted or cancelled, which also keeps at most
/// one reasoner description request outstanding.
pub struct Observer {
    actuator: Arc<dyn Actuator>,
    reasoner: Arc<dyn Reasoner>,
    store: RecordingStore,
    config: SessionConfig,
    state: ObserverState,
    pending: Option<Action>,
    handle: ObserverHandle,
    events: broadcast::Sender<ObserverEvent>,
    loaded: bool,
}

impl Observer {
    /// Create an observer over the given seams and configuration
    pub fn new(
        actuator: Arc<dyn Actuator>,
        reasoner: Arc<dyn Reasoner>,
        config: SessionConfig,
    ) -> Result<Self> {
        let store = RecordingStore::new(config.record_path.clone())?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            actuator,
            reasoner,
            store,
            config,
            state: ObserverState::default(),
            pending: None,
            handle: ObserverHandle::new(),
            events,
            loaded: false,
        })
    }

    /// Handle the UI uses to signal accept, cancel or teardown
    #[must_use]
    pub fn handle(&self) -> ObserverHandle {
        self.handle.clone()
    }

    /// Subscribe to observer events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ObserverEvent> {
        self.events.subscribe()
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> ObserverState {
        self.state
    }

    /// The pending action's description, if one is waiting
    #[must_use]
    pub fn pending(&self) -> Option<&Action> {
        self.pending.as_ref()
    }

    /// The recording log as currently loaded
    #[must_use]
    pub fn recordings(&self) -> &[Recording] {
        self.store.recordings()
    }

    /// Handle one raw gesture from the instrumented page
    ///
    /// Gestures arriving while another is in flight are dropped. Errors are
    /// downgraded to a notification; a single bad gesture never kills the
    /// capture loop.
    #[instrument(skip(self, gesture))]
    pub async fn on_gesture(&mut self, gesture: Gesture) {
        if !self.state.accepts_gestures() {
            debug!(?gesture, "Gesture dropped; another is in flight");
            return;
        }

        if let Err(e) = self.capture(gesture).await {
            warn!(error = %e, "Gesture capture failed");
            self.emit(ObserverEvent::Notify {
                message: format!("gesture not captured: {e}"),
            });
            self.pending = None;
            self.state = ObserverState::default();
        }
    }

    async fn capture(&mut self, gesture: Gesture) -> Result<()> {
        self.ensure_loaded().await?;

        let action = Action::new(gesture.to_action());
        self.pending = Some(action.clone());
        self.state.phase = ObserverPhase::WaitingForUser;

        // Incidental pointer motion settles before we spend a reasoner call.
        sleep(self.config.debounce).await;

        self.state.waiting_for_ai = true;
        let described = self.describe(&action, gesture.html()).await;
        self.state.waiting_for_ai = false;
        let description = described?;

        info!(%description, "Pending action described");
        self.emit(ObserverEvent::PendingUpdated {
            description: description.clone(),
        });

        match self.wait_for_decision().await {
            Decision::Accept => {
                let step = self.store.push(Recording::new(description, vec![action]));
                self.store.save().await?;
                info!(step, "Pending action accepted");
                self.emit(ObserverEvent::Accepted { step });
            }
            Decision::Cancel => {
                info!("Pending action cancelled");
                self.emit(ObserverEvent::Cancelled);
            }
        }

        self.pending = None;
        self.state = ObserverState::default();
        Ok(())
    }

    /// Name the captured action through the operation catalogue
    async fn describe(&self, action: &Action, fragment: Option<&str>) -> Result<String> {
        let catalogue = catalogue_for(InstructionKind::Operation);
        let tool_names: Vec<&str> = catalogue.iter().map(|t| t.name.as_str()).collect();
        let schema = json!({
            "type": "object",
            "properties": {
                "tool": { "type": "string", "enum": tool_names },
                "description": { "type": "string" }
            },
            "required": ["tool", "description"],
            "additionalProperties": false,
        });

        let mut summary = format!("Gesture: {}", serde_json::to_string(action)?);
        if let Some(html) = fragment {
            summary.push_str("\nElement: ");
            summary.push_str(html);
        }
        let messages = [Message::system(DESCRIBE_PROMPT), Message::user(summary)];

        let reply = self.reasoner.structured_output(&schema, &messages).await?;
        let description = reply
            .get("description")
            .and_then(serde_json::Value::as_str)
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                Error::MalformedReasonerOutput(format!("gesture description missing in {reply}"))
            })?;

        if let Some(tool) = reply.get("tool").and_then(serde_json::Value::as_str) {
            if tool != action.kind.name() {
                debug!(
                    captured = action.kind.name(),
                    normalized = tool,
                    "Reasoner normalized the gesture to a different tool"
                );
            }
        }

        Ok(description.to_string())
    }

    /// Poll for the human's decision
    ///
    /// Yields every poll interval; exits only on an explicit decision,
    /// teardown, or the configured timeout (both of the latter cancel).
    async fn wait_for_decision(&self) -> Decision {
        let started = Instant::now();
        loop {
            if let Some(decision) = self.handle.take_decision() {
                return decision;
            }
            if self.handle.torn_down() {
                return Decision::Cancel;
            }
            if let Some(limit) = self.config.decision_timeout {
                if started.elapsed() >= limit {
                    warn!("Decision wait timed out; cancelling pending action");
                    self.emit(ObserverEvent::Notify {
                        message: "decision wait timed out".to_string(),
                    });
                    return Decision::Cancel;
                }
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// Replay the whole log through the actuator and stamp observed results
    ///
    /// Resets page state first so the run is deterministic regardless of
    /// prior session side effects. Makes zero reasoner calls.
    #[instrument(skip(self))]
    pub async fn dry_run(&mut self) -> Result<DryRunSummary> {
        if self.state.phase != ObserverPhase::Idle {
            self.emit(ObserverEvent::Notify {
                message: "dry run skipped: a gesture is in flight".to_string(),
            });
            return Ok(DryRunSummary::default());
        }

        self.ensure_loaded().await?;
        self.state.phase = ObserverPhase::DryRunning;

        let reset = self.actuator.reset().await;
        if let Err(e) = reset {
            self.state.phase = ObserverPhase::Idle;
            return Err(e);
        }

        let mut summary = DryRunSummary::default();
        for step in 0..self.store.len() {
            let count = self
                .store
                .get(step)
                .map(|recording| recording.actions.len())
                .unwrap_or(0);
            for position in 0..count {
                if position > 0 {
                    sleep(self.config.settle_delay).await;
                }
                let kind = self
                    .store
                    .get(step)
                    .expect("step bounds checked")
                    .actions[position]
                    .kind
                    .clone();
                let ok = match execute_action(self.actuator.as_ref(), &kind).await {
                    Ok(result) => !result.is_failure(),
                    Err(e) => {
                        warn!(step, position, error = %e, "Dry-run action raised");
                        false
                    }
                };
                if ok {
                    summary.passed += 1;
                } else {
                    summary.failed += 1;
                }
                self.store
                    .get_mut(step)
                    .expect("step bounds checked")
                    .actions[position]
                    .success = Some(ok);
            }
        }

        self.store.save().await?;
        self.state.phase = ObserverPhase::Idle;
        info!(passed = summary.passed, failed = summary.failed, "Dry run finished");
        self.emit(ObserverEvent::DryRunFinished {
            passed: summary.passed,
            failed: summary.failed,
        });
        Ok(summary)
    }

    /// Delete one step; later steps re-index and the log is rewritten
    #[instrument(skip(self))]
    pub async fn delete_step(&mut self, step: usize) -> Result<bool> {
        self.ensure_loaded().await?;
        match self.store.remove(step) {
            Some(removed) => {
                self.store.save().await?;
                info!(step, input = %removed.input, "Step deleted");
                self.emit(ObserverEvent::Notify {
                    message: format!("deleted step {step}: {}", removed.input),
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ensure_loaded(&mut self) -> Result<()> {
        if !self.loaded {
            self.store.load().await?;
            self.loaded = true;
        }
        Ok(())
    }

    fn emit(&self, event: ObserverEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use playword_core::{failure, ActionKind, ScrollDirection, ToolDefinition, ToolTurn};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedActuator {
        calls: Mutex<Vec<String>>,
        fail_xpaths: Vec<String>,
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
            if self.fail_xpaths.iter().any(|x| x == xpath) {
                return Ok(failure("element not interactable"));
            }
            Ok(format!("Clicked on {xpath}"))
        }
        async fn hover(&self, _xpath: &str, _duration_ms: u64) -> Result<String> {
            Ok("Hovered".to_string())
        }
        async fn fill(&self, xpath: &str, _text: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("fill {xpath}"));
            Ok(format!("Filled {xpath}"))
        }
        async fn select_option(&self, _xpath: &str, _value: &str) -> Result<String> {
            Ok("Selected".to_string())
        }
        async fn press_keys(&self, keys: &str) -> Result<String> {
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
            Ok("<html><body></body></html>".to_string())
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
            self.calls.lock().unwrap().push("reset".to_string());
            Ok("Reset".to_string())
        }
    }

    #[derive(Default)]
    struct ScriptedReasoner {
        calls: Mutex<usize>,
    }

    impl ScriptedReasoner {
        fn total_calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Reasoner for ScriptedReasoner {
        async fn classify(
            &self,
            _instruction: &str,
            _catalogue: &[ToolDefinition],
        ) -> Result<playword_core::InstructionKind> {
            *self.calls.lock().unwrap() += 1;
            Ok(playword_core::InstructionKind::Operation)
        }
        async fn invoke_tools(
            &self,
            _catalogue: &[ToolDefinition],
            _messages: &[Message],
        ) -> Result<ToolTurn> {
            *self.calls.lock().unwrap() += 1;
            Ok(ToolTurn::default())
        }
        async fn structured_output(
            &self,
            _schema: &serde_json::Value,
            _messages: &[Message],
        ) -> Result<serde_json::Value> {
            *self.calls.lock().unwrap() += 1;
            Ok(json!({"tool": "click", "description": "Click the login link"}))
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            *self.calls.lock().unwrap() += 1;
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    fn config(path: &Path) -> SessionConfig {
        SessionConfig::new()
            .with_record_path(path)
            .with_settle_delay(Duration::ZERO)
    }

    fn fast_config(path: &Path) -> SessionConfig {
        let mut config = config(path);
        config.debounce = Duration::ZERO;
        config.poll_interval = Duration::from_millis(1);
        config
    }

    fn click_gesture() -> Gesture {
        Gesture::Click {
            xpath: "//a[@href=\"/login\"]".to_string(),
            html: r#"<a href="/login">Log in</a>"#.to_string(),
        }
    }

    #[tokio::test]
    async fn test_accepted_gesture_appends_exactly_one_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut observer =
            Observer::new(actuator, reasoner, fast_config(&path)).unwrap();
        let mut events = observer.subscribe();

        // Decision queued up-front: the wait loop finds it on its first poll.
        observer.handle().accept();
        observer.on_gesture(click_gesture()).await;

        assert_eq!(observer.recordings().len(), 1);
        let recording = &observer.recordings()[0];
        assert_eq!(recording.input, "Click the login link");
        assert_eq!(
            recording.actions,
            vec![Action::new(ActionKind::Click {
                xpath: "//a[@href=\"/login\"]".to_string()
            })]
        );
        assert!(observer.state().accepts_gestures());
        assert!(observer.pending().is_none());

        // Persisted, not just in memory.
        let mut reloaded = RecordingStore::new(&path).unwrap();
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.recordings(), observer.recordings());

        assert!(matches!(
            events.try_recv().unwrap(),
            ObserverEvent::PendingUpdated { .. }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            ObserverEvent::Accepted { step: 0 }
        ));
    }

    #[tokio::test]
    async fn test_cancelled_gesture_discards_pending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut observer =
            Observer::new(actuator, reasoner, fast_config(&path)).unwrap();

        observer.handle().cancel();
        observer.on_gesture(click_gesture()).await;

        assert!(observer.recordings().is_empty());
        assert!(observer.state().accepts_gestures());
    }

    #[tokio::test]
    async fn test_decision_timeout_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut config = fast_config(&path);
        config.decision_timeout = Some(Duration::from_millis(5));
        let mut observer = Observer::new(actuator, reasoner, config).unwrap();

        observer.on_gesture(click_gesture()).await;

        assert!(observer.recordings().is_empty());
        assert!(observer.state().accepts_gestures());
    }

    #[tokio::test]
    async fn test_describe_failure_is_nonfatal() {
        struct FailingReasoner;

        #[async_trait]
        impl Reasoner for FailingReasoner {
            async fn classify(
                &self,
                _i: &str,
                _c: &[ToolDefinition],
            ) -> Result<playword_core::InstructionKind> {
                Err(Error::Reasoner("offline".to_string()))
            }
            async fn invoke_tools(
                &self,
                _c: &[ToolDefinition],
                _m: &[Message],
            ) -> Result<ToolTurn> {
                Err(Error::Reasoner("offline".to_string()))
            }
            async fn structured_output(
                &self,
                _s: &serde_json::Value,
                _m: &[Message],
            ) -> Result<serde_json::Value> {
                Err(Error::Reasoner("offline".to_string()))
            }
            async fn embed(&self, _t: &[String]) -> Result<Vec<Vec<f32>>> {
                Err(Error::Reasoner("offline".to_string()))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");
        let actuator = Arc::new(ScriptedActuator::default());
        let mut observer =
            Observer::new(actuator, Arc::new(FailingReasoner), fast_config(&path)).unwrap();
        let mut events = observer.subscribe();

        observer.on_gesture(click_gesture()).await;

        // The loop survives and is ready for the next gesture.
        assert!(observer.state().accepts_gestures());
        assert!(observer.pending().is_none());
        assert!(matches!(
            events.try_recv().unwrap(),
            ObserverEvent::Notify { .. }
        ));
    }

    #[tokio::test]
    async fn test_dry_run_resets_first_stamps_success_and_skips_reasoner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");

        let mut store = RecordingStore::new(&path).unwrap();
        store.push(Recording::new(
            "Click the login link",
            vec![Action::new(ActionKind::Click {
                xpath: "//a[1]".to_string(),
            })],
        ));
        store.push(Recording::new(
            "Click the broken link",
            vec![Action::new(ActionKind::Click {
                xpath: "//a[2]".to_string(),
            })],
        ));
        store.save().await.unwrap();

        let actuator = Arc::new(ScriptedActuator {
            fail_xpaths: vec!["//a[2]".to_string()],
            ..Default::default()
        });
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut observer =
            Observer::new(actuator.clone(), reasoner.clone(), fast_config(&path)).unwrap();

        let summary = observer.dry_run().await.unwrap();

        assert_eq!(summary, DryRunSummary { passed: 1, failed: 1 });
        assert_eq!(reasoner.total_calls(), 0);
        assert_eq!(
            actuator.calls(),
            ["reset", "click //a[1]", "click //a[2]"]
        );

        // Success flags are stamped and persisted.
        let mut reloaded = RecordingStore::new(&path).unwrap();
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.get(0).unwrap().actions[0].success, Some(true));
        assert_eq!(reloaded.get(1).unwrap().actions[0].success, Some(false));
    }

    #[tokio::test]
    async fn test_delete_step_reindexes_and_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings.json");

        let mut store = RecordingStore::new(&path).unwrap();
        for input in ["zero", "one", "two"] {
            store.push(Recording::new(input, Vec::new()));
        }
        store.save().await.unwrap();

        let actuator = Arc::new(ScriptedActuator::default());
        let reasoner = Arc::new(ScriptedReasoner::default());
        let mut observer =
            Observer::new(actuator, reasoner, fast_config(&path)).unwrap();

        assert!(observer.delete_step(1).await.unwrap());
        assert!(!observer.delete_step(9).await.unwrap());

        let mut reloaded = RecordingStore::new(&path).unwrap();
        reloaded.load().await.unwrap();
        let inputs: Vec<&str> = reloaded
            .recordings()
            .iter()
            .map(|r| r.input.as_str())
            .collect();
        assert_eq!(inputs, ["zero", "two"]);
    }
}
