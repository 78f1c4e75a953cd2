//! `OpenAI` chat completion API wire format types
//!
//! Only the fields the proxy inspects or rewrites are modeled. Everything
//! else lands in a flattened `extra` map so it is forwarded untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Deserialize a field that is present in the input, keeping an explicit
/// `null` so it is written back out
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// -- Request types --

/// `OpenAI` chat completion request
///
/// `stream`, `tools`, `tool_choice`, and the model parameters stay in
/// `extra`, so a request the proxy does not rewrite is forwarded exactly as
/// received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages, absent for legacy completion bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    /// Everything else the backend accepts
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatRequest {
    /// Whether the client asked for a streamed response
    pub fn is_stream(&self) -> bool {
        self.extra.get("stream").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Conversation messages, empty when the body has none
    pub fn messages(&self) -> &[Message] {
        self.messages.as_deref().unwrap_or_default()
    }
}

/// Message within a request or response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role; some backends leave it out of responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Content (string or array of content parts); an explicit `null` reads
    /// as `Content::Other(Value::Null)`
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub content: Option<Content>,
    /// `name`, `tool_calls`, `tool_call_id`, and other per-message fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Plain-text assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Some(Role::Assistant),
            content: Some(Content::Text(content.into())),
            extra: Map::new(),
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.role.as_ref() == Some(role)
    }

    /// Whether the content is missing or `null`
    pub fn lacks_content(&self) -> bool {
        self.content.as_ref().is_none_or(Content::is_null)
    }
}

/// Message author role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    /// Roles the proxy has no rules for (e.g. `developer`), forwarded as-is
    #[serde(untagged)]
    Other(String),
}

/// Message content: a string, an array of parts, or anything else a
/// backend decides to send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content
    Text(String),
    /// Array of content parts
    Parts(Vec<ContentPart>),
    /// Unrecognized shape (including `null`), kept verbatim
    Other(Value),
}

impl Content {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Other(Value::Null))
    }
}

/// Individual content part
///
/// Kept as raw JSON; items that are not objects have no kind and are
/// ignored by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentPart(pub Value);

impl ContentPart {
    /// Classify the part by its `type` tag; `None` for non-object items
    pub fn kind(&self) -> Option<PartKind> {
        let part = self.0.as_object()?;
        Some(match part.get("type").and_then(Value::as_str) {
            Some("text") => PartKind::Text,
            Some("tool") => PartKind::Tool,
            _ => PartKind::Other,
        })
    }

    /// Text of a `{"type":"text","text":{"content":"..."}}` part
    pub fn text_content(&self) -> Option<&str> {
        self.0.get("text")?.get("content")?.as_str()
    }
}

/// Content part variants the normalizer distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Text,
    Tool,
    Other,
}

// -- Response types --

/// `OpenAI` chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated choices
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// `id`, `model`, `usage`, and other metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Choice within a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Generated message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// `index`, `finish_reason`, `logprobs`, and other per-choice fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// -- Streaming types --

/// `OpenAI` streaming chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Delta choices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<StreamChoice>>,
    /// `id`, `model`, `usage`, and other metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Choice within a streaming chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    /// Incremental delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<StreamDelta>,
    /// `index`, `finish_reason`, and other per-choice fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Delta content within a streaming choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Incremental content
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub content: Option<Value>,
    /// `role`, `tool_calls`, and other delta fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
