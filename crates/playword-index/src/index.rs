//! Ephemeral semantic index over a page snapshot

use base64::{engine::general_purpose::STANDARD, Engine as _};
use scraper::{ElementRef, Html};
use serde_json::json;
use tracing::{debug, instrument};

use playword_core::{ElementLocation, Error, Message, Reasoner, Result, VectorRecord};

use crate::locator::synthesize_xpath;

/// Tags considered interactable by default
pub const DEFAULT_ALLOWED_TAGS: [&str; 7] =
    ["a", "button", "input", "textarea", "select", "option", "label"];

/// Roles that make a non-allow-listed element interactable anyway
const INTERACTIVE_ROLES: [&str; 5] = ["button", "link", "textbox", "checkbox", "combobox"];

/// Attributes that count as signal for the size/visibility filter
const SIGNAL_ATTRS: [&str; 8] = [
    "id",
    "name",
    "href",
    "placeholder",
    "aria-label",
    "value",
    "role",
    "class",
];

const SELECTION_PROMPT: &str = "You are locating one element on a web page. \
Given a target description and a numbered list of candidate elements, \
answer with the index of the single best match.";

/// A candidate with its similarity to the intent
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// The located element
    pub location: ElementLocation,
    /// Cosine similarity of the candidate fragment to the intent
    pub similarity: f32,
}

/// Per-resolution semantic index of interactable DOM nodes
///
/// Build one per resolution call and drop it afterwards; candidates and
/// embeddings must never leak across resolutions or frames.
pub struct ElementIndex<'r> {
    reasoner: &'r dyn Reasoner,
    allowed_tags: Vec<String>,
    top_k: usize,
    fragment_limit: usize,
}

impl<'r> ElementIndex<'r> {
    /// Create an index with the default allow-list and top-K of 10
    #[must_use]
    pub fn new(reasoner: &'r dyn Reasoner) -> Self {
        Self {
            reasoner,
            allowed_tags: DEFAULT_ALLOWED_TAGS.iter().map(ToString::to_string).collect(),
            top_k: 10,
            fragment_limit: 2048,
        }
    }

    /// Override how many ranked candidates are kept
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Override the tag allow-list
    #[must_use]
    pub fn with_allowed_tags(mut self, tags: &[&str]) -> Self {
        self.allowed_tags = tags.iter().map(ToString::to_string).collect();
        self
    }

    /// Enumerate allow-listed, visibly rendered candidates from a snapshot
    #[must_use]
    pub fn collect_candidates(
        &self,
        html: &str,
        frame_src: Option<&str>,
    ) -> Vec<ElementLocation> {
        let document = Html::parse_document(html);
        let mut candidates = Vec::new();

        for node in document.tree.nodes() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            if !self.is_interactable(&element) || Self::is_hidden(&element) {
                continue;
            }
            if !Self::has_signal(&element) {
                continue;
            }

            candidates.push(ElementLocation {
                xpath: synthesize_xpath(&element),
                html: bounded_fragment(&element, self.fragment_limit),
                frame_src: frame_src.map(ToString::to_string),
            });
        }

        debug!(count = candidates.len(), "Collected candidate elements");
        candidates
    }

    /// Rank candidates against the intent, best first
    ///
    /// Ordering is a stable total order: similarity descending, ties (and
    /// NaN-free by construction) broken by enumeration order, so identical
    /// content keeps its DOM position deterministically.
    #[instrument(skip(self, html, intent), fields(intent_len = intent.len()))]
    pub async fn rank(
        &self,
        html: &str,
        frame_src: Option<&str>,
        intent: &str,
    ) -> Result<Vec<RankedCandidate>> {
        let candidates = self.collect_candidates(html, frame_src);
        if candidates.is_empty() {
            return Err(Error::NoCandidate);
        }

        let mut texts: Vec<String> = candidates.iter().map(|c| c.html.clone()).collect();
        texts.push(intent.to_string());

        let embeddings = self.reasoner.embed(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(Error::MalformedReasonerOutput(format!(
                "embedding count mismatch: sent {}, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let (intent_embedding, fragment_embeddings) = embeddings
            .split_last()
            .expect("embeddings verified non-empty above");

        let records: Vec<VectorRecord> = candidates
            .iter()
            .zip(fragment_embeddings)
            .map(|(candidate, embedding)| VectorRecord {
                content: candidate.html.clone(),
                embedding: embedding.clone(),
            })
            .collect();

        let mut scored: Vec<(usize, f32)> = records
            .iter()
            .enumerate()
            .map(|(i, record)| (i, cosine_similarity(&record.embedding, intent_embedding)))
            .collect();
        scored.sort_by(|(ia, sa), (ib, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ia.cmp(ib))
        });
        scored.truncate(self.top_k);

        let ranked: Vec<RankedCandidate> = scored
            .into_iter()
            .map(|(i, similarity)| RankedCandidate {
                location: candidates[i].clone(),
                similarity,
            })
            .collect();

        debug!(
            kept = ranked.len(),
            best = ranked.first().map(|c| c.similarity),
            "Ranked candidates"
        );
        Ok(ranked)
    }

    /// Rank candidates and let the reasoner pick exactly one
    ///
    /// The selection reply must be an integer in `[0, K)`; anything else is
    /// rejected before indexing.
    #[instrument(skip_all, fields(intent_len = intent.len()))]
    pub async fn locate(
        &self,
        html: &str,
        frame_src: Option<&str>,
        intent: &str,
        screenshot: Option<&[u8]>,
    ) -> Result<ElementLocation> {
        let ranked = self.rank(html, frame_src, intent).await?;

        if ranked.len() == 1 {
            return Ok(ranked.into_iter().next().expect("len checked").location);
        }

        let listing = ranked
            .iter()
            .enumerate()
            .map(|(i, candidate)| format!("[{i}] {}", candidate.location.html))
            .collect::<Vec<_>>()
            .join("\n");

        let mut messages = vec![
            Message::system(SELECTION_PROMPT),
            Message::user(format!("Target: {intent}\n\nCandidates:\n{listing}")),
        ];
        if let Some(image) = screenshot {
            messages.push(Message::user(format!(
                "Page screenshot: data:image/png;base64,{}",
                STANDARD.encode(image)
            )));
        }

        let schema = json!({
            "type": "object",
            "properties": {
                "index": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": ranked.len() - 1,
                }
            },
            "required": ["index"],
            "additionalProperties": false,
        });

        let reply = self.reasoner.structured_output(&schema, &messages).await?;
        let index = reply
            .get("index")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                Error::MalformedReasonerOutput(format!(
                    "candidate selection must be an integer index, got {reply}"
                ))
            })? as usize;

        if index >= ranked.len() {
            return Err(Error::MalformedReasonerOutput(format!(
                "candidate index {index} out of range 0..{}",
                ranked.len()
            )));
        }

        debug!(index, xpath = %ranked[index].location.xpath, "Selected candidate");
        Ok(ranked.into_iter().nth(index).expect("bounds checked").location)
    }

    fn is_interactable(&self, element: &ElementRef<'_>) -> bool {
        let value = element.value();
        if self.allowed_tags.iter().any(|t| t == value.name()) {
            return true;
        }
        value
            .attr("role")
            .is_some_and(|role| INTERACTIVE_ROLES.contains(&role))
    }

    fn is_hidden(element: &ElementRef<'_>) -> bool {
        let value = element.value();
        if value.attr("hidden").is_some() {
            return true;
        }
        if value.attr("type") == Some("hidden") {
            return true;
        }
        if value.attr("aria-hidden") == Some("true") {
            return true;
        }
        value.attr("style").is_some_and(|style| {
            let style = style.replace(' ', "");
            style.contains("display:none") || style.contains("visibility:hidden")
        })
    }

    fn has_signal(element: &ElementRef<'_>) -> bool {
        let value = element.value();
        if SIGNAL_ATTRS.iter().any(|attr| value.attr(attr).is_some()) {
            return true;
        }
        element.text().any(|chunk| !chunk.trim().is_empty())
    }
}

/// Serialized fragment, truncated on a char boundary
fn bounded_fragment(element: &ElementRef<'_>, limit: usize) -> String {
    let html = element.html();
    if html.len() <= limit {
        return html;
    }
    let cut = (0..=limit)
        .rev()
        .find(|i| html.is_char_boundary(*i))
        .unwrap_or(0);
    html[..cut].to_string()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
