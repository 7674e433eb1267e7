// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based fact extraction from conversation chunks.
//!
//! A chunk is rendered as a transcript, sent to the provider with the
//! extraction instructions, and the reply is parsed leniently into facts.
//! Model output is untrusted: code fences, reasoning blocks, and stray prose
//! around the JSON array are tolerated, and individual malformed entries are
//! skipped.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use cortex_core::types::{ChatMessage, DEFAULT_IMPORTANCE, ProviderRequest};
use cortex_core::{ConversationMessage, CortexError, ProviderAdapter};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::timeout::with_timeout;

/// Topic assigned to facts the model leaves uncategorized.
pub const DEFAULT_TOPIC: &str = "general";

/// System prompt for fact extraction.
pub const EXTRACTION_PROMPT: &str = r#"You extract long-term memories from conversations. Read the conversation snippet and list the discrete facts that are worth remembering in future conversations.

Answer with a JSON array. Each element is an object with these fields:
- "user_id": identifier of the user the fact is about, or null if unknown
- "topic": a short category such as "preferences", "projects", "personal", "technical", "decisions"
- "fact": one clear sentence that makes sense without the original conversation
- "importance": integer from 1 to 10 (10 = critical personal information, 1 = trivial)

Rules:
- Keep only facts that will help in later conversations
- Skip greetings, small talk, assistant replies, temporary states, and conversation mechanics
- Keep user preferences, decisions, project details, voluntarily shared personal details, technical choices, and opinions
- If nothing is worth keeping, answer with an empty array: []

Output ONLY the JSON array, nothing else. /no_think"#;

static REASONING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// A validated fact produced by the extraction model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub user_id: Option<String>,
    pub topic: String,
    pub fact: String,
    pub importance: i64,
}

/// Shape of one array element as the model writes it.
#[derive(Debug, Deserialize)]
struct RawFact {
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    fact: Option<String>,
    #[serde(default)]
    importance: Option<Value>,
}

impl RawFact {
    fn normalize(self) -> Option<ExtractedFact> {
        let fact = self.fact.map(|f| f.trim().to_string()).filter(|f| !f.is_empty())?;
        let topic = self
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let user_id = match self.user_id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Some(ExtractedFact {
            user_id,
            topic,
            fact,
            importance: normalize_importance(self.importance.as_ref()),
        })
    }
}

fn normalize_importance(value: Option<&Value>) -> i64 {
    let raw = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    raw.map_or(DEFAULT_IMPORTANCE, |i| i.clamp(1, 10))
}

/// Renders a chunk as one `[speaker]: content` line per non-empty message.
pub fn format_chunk(chunk: &[ConversationMessage]) -> String {
    chunk
        .iter()
        .filter(|m| !m.content.is_empty())
        .map(|m| format!("[{}]: {}", m.speaker(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes `<think>...</think>` reasoning blocks from model output.
pub fn strip_reasoning(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").trim().to_string()
}

/// Returns the body of the first fenced code block, if any.
fn unwrap_code_fence(text: &str) -> &str {
    if let Some((_, rest)) = text.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    let mut parts = text.split("```");
    match (parts.next(), parts.next()) {
        (Some(_), Some(body)) => body.trim(),
        _ => text,
    }
}

/// Parses an extraction reply into validated facts.
///
/// Returns a decode error when no JSON array can be found. Array elements
/// that are not fact objects, or carry an empty `fact`, are dropped.
pub fn parse_extraction_response(response: &str) -> Result<Vec<ExtractedFact>, CortexError> {
    let cleaned = strip_reasoning(response);
    let body = unwrap_code_fence(&cleaned);

    let json = match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(CortexError::Decode(
                "extraction output contains no JSON array".to_string(),
            ));
        }
    };

    let values: Vec<Value> = serde_json::from_str(json)
        .map_err(|e| CortexError::Decode(format!("extraction output is not a JSON array: {e}")))?;

    let facts = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawFact>(value) {
            Ok(raw) => raw.normalize(),
            Err(e) => {
                debug!(error = %e, "skipping malformed extracted fact");
                None
            }
        })
        .collect();
    Ok(facts)
}

/// Calls the provider to extract facts from one chunk.
pub struct FactExtractor {
    provider: Arc<dyn ProviderAdapter>,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl FactExtractor {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            max_tokens,
            temperature,
            timeout,
        }
    }

    /// Extracts facts from `chunk`.
    ///
    /// Transport failures, timeouts, and unparseable replies are returned as
    /// errors so the caller can count them; an empty chunk yields no facts
    /// without a provider call.
    pub async fn extract(
        &self,
        chunk: &[ConversationMessage],
    ) -> Result<Vec<ExtractedFact>, CortexError> {
        let transcript = format_chunk(chunk);
        if transcript.is_empty() {
            return Ok(Vec::new());
        }

        let request = ProviderRequest {
            messages: vec![
                ChatMessage::system(EXTRACTION_PROMPT),
                ChatMessage::user(transcript),
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = with_timeout(self.timeout, self.provider.complete(request)).await?;
        debug!(model = %response.model, bytes = response.content.len(), "extraction reply received");
        parse_extraction_response(&response.content)
    }
}
