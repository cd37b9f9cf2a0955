//! Resolution state machine
//!
//! Idle → Classified → ToolsBound → ToolInvoked → Resolved. Classification
//! is one reasoner call; the bound catalogue and the conversation then go
//! through one tool-calling turn. Tool-level failures stay values (sentinel
//! strings) so the caller can fall back; only unexpected errors unwind.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use playword_core::{
    execute_action, failure, Action, ActionKind, ActionResult, Actuator, ElementLocation, Error,
    InstructionKind, Message, Reasoner, Result, ScrollDirection, ToolCall,
};
use playword_index::ElementIndex;

use crate::catalogue::{catalogue_for, full_catalogue};

const OPERATION_PROMPT: &str = "You operate a live web page. Use the provided tools to carry \
out the user's instruction. Prefer one precise tool call; chain calls only when the \
instruction genuinely needs several.";

const ASSERTION_PROMPT: &str = "You verify state on a live web page. Use the provided check \
tools to evaluate the user's assertion. The check result is the answer; do not editorialize.";

const QUERY_PROMPT: &str = "You extract data from a live web page. Use the provided tools to \
read exactly what the user asked for.";

/// Resolution phases, traced as the machine advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Classified,
    ToolsBound,
    ToolInvoked,
    Resolved,
}

/// Outcome of resolving one instruction
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The bucket the instruction classified into
    pub kind: InstructionKind,
    /// Concrete actions produced by the invoked tools, in order
    pub actions: Vec<Action>,
    /// Final result value
    pub result: ActionResult,
}

/// Classifies instructions and drives the reasoner's tool-calling turn
pub struct Resolver {
    actuator: Arc<dyn Actuator>,
    reasoner: Arc<dyn Reasoner>,
    top_k: usize,
    use_screenshot: bool,
}

impl Resolver {
    /// Create a resolver over the given seams
    #[must_use]
    pub fn new(actuator: Arc<dyn Actuator>, reasoner: Arc<dyn Reasoner>) -> Self {
        Self {
            actuator,
            reasoner,
            top_k: 10,
            use_screenshot: false,
        }
    }

    /// Override how many ranked candidates the element index keeps
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Attach a page screenshot to candidate disambiguation requests
    #[must_use]
    pub fn with_screenshot(mut self, use_screenshot: bool) -> Self {
        self.use_screenshot = use_screenshot;
        self
    }

    /// Resolve one instruction to concrete actions and a result
    #[instrument(skip(self), fields(instruction = %instruction))]
    pub async fn resolve(&self, instruction: &str) -> Result<Resolution> {
        let mut phase = Phase::Idle;
        debug!(?phase, "Resolution started");

        let kind = self
            .reasoner
            .classify(instruction, &full_catalogue())
            .await?;
        phase = Phase::Classified;
        debug!(?phase, %kind, "Instruction classified");

        let catalogue = catalogue_for(kind);
        phase = Phase::ToolsBound;
        debug!(?phase, tools = catalogue.len(), "Catalogue bound");

        let messages = [
            Message::system(Self::system_prompt(kind)),
            Message::user(instruction),
        ];
        let turn = self.reasoner.invoke_tools(&catalogue, &messages).await?;

        if turn.tool_calls.is_empty() {
            debug!(phase = ?Phase::Resolved, "No tool calls; content is the result");
            return Ok(Resolution {
                kind,
                actions: Vec::new(),
                result: ActionResult::from_content(&turn.content),
            });
        }

        let mut actions = Vec::new();
        let mut last = ActionResult::Text(turn.content.clone());
        for call in &turn.tool_calls {
            phase = Phase::ToolInvoked;
            debug!(?phase, tool = %call.name, "Invoking tool");
            let (action, result) = self.invoke(call).await?;
            actions.extend(action.into_iter());
            last = result;
        }

        phase = Phase::Resolved;
        debug!(?phase, actions = actions.len(), "Instruction resolved");
        let result = match last {
            ActionResult::Text(text) => ActionResult::from_content(&text),
            other => other,
        };
        Ok(Resolution {
            kind,
            actions,
            result,
        })
    }

    fn system_prompt(kind: InstructionKind) -> &'static str {
        match kind {
            InstructionKind::Operation => OPERATION_PROMPT,
            InstructionKind::Assertion => ASSERTION_PROMPT,
            InstructionKind::Query => QUERY_PROMPT,
        }
    }

    /// Bind one tool call to a concrete action and execute it
    ///
    /// A missing candidate is a recoverable condition: it becomes a sentinel
    /// failure result with no recorded action, never an error.
    async fn invoke(&self, call: &ToolCall) -> Result<(Option<Action>, ActionResult)> {
        let kind = match self.bind_action(call).await {
            Ok(kind) => kind,
            Err(Error::NoCandidate) => {
                warn!(tool = %call.name, "No candidate element for intent");
                return Ok((
                    None,
                    ActionResult::Text(failure("no candidate element matched the intent")),
                ));
            }
            Err(other) => return Err(other),
        };

        let result = execute_action(self.actuator.as_ref(), &kind).await?;
        Ok((Some(Action::new(kind)), result))
    }

    /// Translate a tool call into a fully resolved action
    async fn bind_action(&self, call: &ToolCall) -> Result<ActionKind> {
        match call.name.as_str() {
            "navigate" => {
                #[derive(Deserialize)]
                struct Args {
                    url: String,
                }
                let args: Args = call.parse_arguments()?;
                Url::parse(&args.url).map_err(|e| {
                    Error::MalformedReasonerOutput(format!("navigate url {}: {e}", args.url))
                })?;
                Ok(ActionKind::Navigate { url: args.url })
            }
            "click" => {
                #[derive(Deserialize)]
                struct Args {
                    intent: String,
                }
                let args: Args = call.parse_arguments()?;
                let location = self.locate(&args.intent).await?;
                Ok(ActionKind::Click {
                    xpath: location.xpath,
                })
            }
            "hover" => {
                #[derive(Deserialize)]
                struct Args {
                    intent: String,
                    duration_ms: Option<u64>,
                }
                let args: Args = call.parse_arguments()?;
                let location = self.locate(&args.intent).await?;
                Ok(ActionKind::Hover {
                    xpath: location.xpath,
                    duration_ms: args.duration_ms.unwrap_or(1000),
                })
            }
            "fill" => {
                #[derive(Deserialize)]
                struct Args {
                    intent: String,
                    text: String,
                }
                let args: Args = call.parse_arguments()?;
                let location = self.locate(&args.intent).await?;
                Ok(ActionKind::Fill {
                    xpath: location.xpath,
                    text: args.text,
                })
            }
            "select_option" => {
                #[derive(Deserialize)]
                struct Args {
                    intent: String,
                    value: String,
                }
                let args: Args = call.parse_arguments()?;
                let location = self.locate(&args.intent).await?;
                Ok(ActionKind::SelectOption {
                    xpath: location.xpath,
                    value: args.value,
                })
            }
            "press_keys" => {
                #[derive(Deserialize)]
                struct Args {
                    keys: String,
                }
                let args: Args = call.parse_arguments()?;
                Ok(ActionKind::PressKeys { keys: args.keys })
            }
            "scroll" => {
                #[derive(Deserialize)]
                struct Args {
                    direction: ScrollDirection,
                }
                let args: Args = call.parse_arguments()?;
                Ok(ActionKind::Scroll {
                    direction: args.direction,
                })
            }
            "switch_frame" => {
                #[derive(Deserialize)]
                struct Args {
                    frame_number: Option<usize>,
                }
                let args: Args = call.parse_arguments()?;
                Ok(ActionKind::SwitchFrame {
                    frame_number: args.frame_number,
                })
            }
            "switch_page" => {
                #[derive(Deserialize)]
                struct Args {
                    page_number: usize,
                }
                let args: Args = call.parse_arguments()?;
                Ok(ActionKind::SwitchPage {
                    page_number: args.page_number,
                })
            }
            "wait_for_text" => {
                #[derive(Deserialize)]
                struct Args {
                    text: String,
                }
                let args: Args = call.parse_arguments()?;
                Ok(ActionKind::WaitForText { text: args.text })
            }
            "assert_text_visible" => {
                #[derive(Deserialize)]
                struct Args {
                    text: String,
                }
                let args: Args = call.parse_arguments()?;
                Ok(ActionKind::AssertTextVisible { text: args.text })
            }
            "assert_element_visible" => {
                #[derive(Deserialize)]
                struct Args {
                    intent: String,
                }
                let args: Args = call.parse_arguments()?;
                let location = self.locate(&args.intent).await?;
                Ok(ActionKind::AssertElementVisible {
                    xpath: location.xpath,
                })
            }
            "assert_element_text" => {
                #[derive(Deserialize)]
                struct Args {
                    intent: String,
                    expected: String,
                }
                let args: Args = call.parse_arguments()?;
                let location = self.locate(&args.intent).await?;
                Ok(ActionKind::AssertElementText {
                    xpath: location.xpath,
                    expected: args.expected,
                })
            }
            "get_text" => {
                #[derive(Deserialize)]
                struct Args {
                    intent: String,
                }
                let args: Args = call.parse_arguments()?;
                let location = self.locate(&args.intent).await?;
                Ok(ActionKind::GetText {
                    xpath: location.xpath,
                })
            }
            "get_attribute" => {
                #[derive(Deserialize)]
                struct Args {
                    intent: String,
                    attribute: String,
                }
                let args: Args = call.parse_arguments()?;
                let location = self.locate(&args.intent).await?;
                Ok(ActionKind::GetAttribute {
                    xpath: location.xpath,
                    attribute: args.attribute,
                })
            }
            "screenshot" => Ok(ActionKind::Screenshot),
            unknown => Err(Error::MalformedReasonerOutput(format!(
                "unknown tool: {unknown}"
            ))),
        }
    }

    /// Resolve a free-text intent to one element via a fresh index
    async fn locate(&self, intent: &str) -> Result<ElementLocation> {
        let html = self.actuator.snapshot().await?;
        let frame_src = self.actuator.frame_src().await?;
        let screenshot = if self.use_screenshot {
            Some(self.actuator.screenshot().await?)
        } else {
            None
        };

        // The index is ephemeral: built here, dropped at the end of the call.
        let index = ElementIndex::new(self.reasoner.as_ref()).with_top_k(self.top_k);
        index
            .locate(&html, frame_src.as_deref(), intent, screenshot.as_deref())
            .await
    }
}
