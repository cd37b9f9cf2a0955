//! Action executor
//!
//! One mapping from recorded actions onto actuator primitives, shared by
//! the resolver's tool bodies, the replay engine and the observer's dry
//! run. Keeping a single executor is what makes recorded steps replay
//! exactly as they first ran.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use tracing::debug;

use crate::actuator::{failure, Actuator};
use crate::error::Result;
use crate::types::{ActionKind, ActionResult};

/// Resolve an xpath and report whether the node is rendered visible.
const VISIBLE_SCRIPT: &str = r"
(xpath) => {
  const el = document.evaluate(xpath, document, null,
    XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  if (!el) return false;
  const style = getComputedStyle(el);
  if (style.display === 'none' || style.visibility === 'hidden') return false;
  const rect = el.getBoundingClientRect();
  return rect.width > 0 && rect.height > 0;
}";

/// Resolve an xpath and return its trimmed text content, or null.
const TEXT_SCRIPT: &str = r"
(xpath) => {
  const el = document.evaluate(xpath, document, null,
    XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  return el ? (el.textContent || '').trim() : null;
}";

/// Resolve an xpath and return one attribute value, or null.
const ATTRIBUTE_SCRIPT: &str = r"
(xpath, name) => {
  const el = document.evaluate(xpath, document, null,
    XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  return el ? el.getAttribute(name) : null;
}";

/// Execute one action against the actuator
///
/// Movement and input actions map straight onto actuator primitives.
/// Assertions evaluate page state and produce a boolean. Queries extract
/// text, attributes or a screenshot. Recoverable failures come back as
/// sentinel strings inside `Ok`; only unexpected actuator errors are `Err`.
pub async fn execute_action(actuator: &dyn Actuator, kind: &ActionKind) -> Result<ActionResult> {
    debug!(action = kind.name(), "Executing action");

    let result = match kind {
        ActionKind::Navigate { url } => actuator.navigate(url).await?.into(),
        ActionKind::Click { xpath } => actuator.click(xpath).await?.into(),
        ActionKind::Hover { xpath, duration_ms } => {
            actuator.hover(xpath, *duration_ms).await?.into()
        }
        ActionKind::Fill { xpath, text } => actuator.fill(xpath, text).await?.into(),
        ActionKind::SelectOption { xpath, value } => {
            actuator.select_option(xpath, value).await?.into()
        }
        ActionKind::PressKeys { keys } => actuator.press_keys(keys).await?.into(),
        ActionKind::Scroll { direction } => actuator.scroll(*direction).await?.into(),
        ActionKind::SwitchFrame { frame_number } => {
            actuator.switch_frame(*frame_number).await?.into()
        }
        ActionKind::SwitchPage { page_number } => actuator.switch_page(*page_number).await?.into(),
        ActionKind::WaitForText { text } => actuator.wait_for_text(text).await?.into(),

        ActionKind::AssertTextVisible { text } => {
            let snapshot = actuator.snapshot().await?;
            ActionResult::Bool(snapshot.contains(text.as_str()))
        }
        ActionKind::AssertElementVisible { xpath } => {
            let value = actuator
                .evaluate(VISIBLE_SCRIPT, &[json!(xpath)])
                .await?;
            ActionResult::Bool(value.as_bool().unwrap_or(false))
        }
        ActionKind::AssertElementText { xpath, expected } => {
            let value = actuator.evaluate(TEXT_SCRIPT, &[json!(xpath)]).await?;
            match value.as_str() {
                Some(text) => ActionResult::Bool(text.trim() == expected.trim()),
                None => ActionResult::Bool(false),
            }
        }

        ActionKind::GetText { xpath } => {
            let value = actuator.evaluate(TEXT_SCRIPT, &[json!(xpath)]).await?;
            match value.as_str() {
                Some(text) => ActionResult::Text(text.to_string()),
                None => ActionResult::Text(failure(format!("no element at {xpath}"))),
            }
        }
        ActionKind::GetAttribute { xpath, attribute } => {
            let value = actuator
                .evaluate(ATTRIBUTE_SCRIPT, &[json!(xpath), json!(attribute)])
                .await?;
            match value.as_str() {
                Some(text) => ActionResult::Text(text.to_string()),
                None => ActionResult::Text(failure(format!(
                    "no attribute {attribute} on element at {xpath}"
                ))),
            }
        }
        ActionKind::Screenshot => {
            let bytes = actuator.screenshot().await?;
            ActionResult::Text(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
        }
    };

    Ok(result)
}
