//! Message shapes and content-block normalization.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Literal suffix appended when text is cut at the content limit.
pub const TRUNCATION_SUFFIX: &str = "... [truncated]";

/// The four message shapes the pipeline keeps. Lines with any other `type`
/// are discarded without counting as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    User,
    Assistant,
    ToolUse,
    ToolResult,
}

impl MessageKind {
    /// Map a wire `type` string onto a kind, if it is one we keep.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool_use" => Some(Self::ToolUse),
            "tool_result" => Some(Self::ToolResult),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::ToolUse => write!(f, "tool_use"),
            Self::ToolResult => write!(f, "tool_result"),
        }
    }
}

/// A tool invocation (or result) attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name; `"tool_result"` for result blocks.
    pub name: String,
    /// Tool input parameters. BTreeMap keeps serialization order stable.
    #[serde(default)]
    pub input: BTreeMap<String, Value>,
    /// Tool output text.
    #[serde(default)]
    pub output: String,
    /// Error text, empty when the call succeeded.
    #[serde(default)]
    pub error: String,
    /// Wall-clock duration in milliseconds, when the transcript records it.
    #[serde(default)]
    pub duration_ms: u64,
}

/// One normalized transcript message. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub role: String,
    /// Concatenated text content (post truncation).
    pub content: String,
    pub session_id: String,
    /// Index among kept messages, 0-based.
    pub message_index: usize,
    /// Tool calls carried by `tool_use` / `tool_result` content blocks.
    #[serde(default)]
    pub tools: Vec<ToolCall>,
}

/// Content truncation limit. Zero disables truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLimit(pub usize);

impl ContentLimit {
    /// Cut `text` at the limit on a char boundary and append the literal
    /// truncation suffix. Unicode below the limit passes through unchanged.
    pub fn apply(&self, text: &str) -> String {
        if self.0 == 0 || text.len() <= self.0 {
            return text.to_string();
        }
        let mut cut = self.0;
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}{}", &text[..cut], TRUNCATION_SUFFIX)
    }
}

/// Parse a wire timestamp leniently: RFC3339 first, then the bare
/// `YYYY-MM-DDTHH:MM:SS.sssZ` form. Failure never rejects the line; the
/// message just carries the epoch.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return DateTime::<Utc>::UNIX_EPOCH;
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3fZ") {
        return naive.and_utc();
    }
    DateTime::<Utc>::UNIX_EPOCH
}

/// Normalize a `content` value (string or block array) into text plus tool
/// calls. Returns `None` only when a `tool_use` block is missing its name,
/// which fails the line as a schema error.
pub(crate) fn normalize_content(
    content: &Value,
    limit: ContentLimit,
) -> Option<(String, Vec<ToolCall>)> {
    match content {
        Value::String(s) => Some((limit.apply(s), Vec::new())),
        Value::Array(blocks) => {
            let mut text_parts: Vec<String> = Vec::new();
            let mut tools = Vec::new();
            for block in blocks {
                let block_type = block.get("type").and_then(Value::as_str).unwrap_or("");
                match block_type {
                    "text" => {
                        if let Some(t) = block.get("text").and_then(Value::as_str) {
                            text_parts.push(limit.apply(t));
                        }
                    }
                    "tool_use" => {
                        let name = block.get("name").and_then(Value::as_str).unwrap_or("");
                        if name.is_empty() {
                            return None;
                        }
                        let input = block
                            .get("input")
                            .and_then(Value::as_object)
                            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                            .unwrap_or_default();
                        tools.push(ToolCall {
                            name: name.to_string(),
                            input,
                            output: String::new(),
                            error: String::new(),
                            duration_ms: 0,
                        });
                    }
                    "tool_result" => {
                        let output = match block.get("content") {
                            Some(Value::String(s)) => limit.apply(s),
                            Some(Value::Array(items)) => {
                                let joined = items
                                    .iter()
                                    .filter_map(|i| i.get("text").and_then(Value::as_str))
                                    .collect::<Vec<_>>()
                                    .join("");
                                limit.apply(&joined)
                            }
                            _ => String::new(),
                        };
                        let error = if block
                            .get("is_error")
                            .and_then(Value::as_bool)
                            .unwrap_or(false)
                        {
                            "tool error".to_string()
                        } else {
                            String::new()
                        };
                        tools.push(ToolCall {
                            name: "tool_result".to_string(),
                            input: BTreeMap::new(),
                            output,
                            error,
                            duration_ms: 0,
                        });
                    }
                    _ => {}
                }
            }
            Some((text_parts.join(""), tools))
        }
        _ => Some((String::new(), Vec::new())),
    }
}
