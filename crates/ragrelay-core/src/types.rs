//! Wire types shared between the gateway, the relay and the upstream client.
//!
//! Chunk types mirror the OpenAI `chat.completion.chunk` shape. Fields this
//! crate does not model are kept in `extra` so a forwarded chunk serializes
//! back with everything the upstream sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Object tag carried by every streamed chunk.
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Inbound OpenAI-compatible chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_stream() -> bool { true }
fn default_max_tokens() -> u32 { 1000 }
fn default_temperature() -> f32 { 0.7 }

impl ChatCompletionRequest {
    /// Sampling parameters for the upstream call, with `default_model` filling a missing model.
    pub fn params(&self, default_model: &str) -> GenerateParams {
        GenerateParams {
            model: self
                .model
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| default_model.to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Content of the last user message, or "" if there is none.
    pub fn last_user_query(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Parameters forwarded to the upstream provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Incremental delta inside a chunk choice.
///
/// Kept as the raw field map: an upstream may omit `role`/`content` or send
/// them as `null`, and a forwarded delta serializes back either way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkDelta {
    fields: Map<String, Value>,
}

impl ChunkDelta {
    /// Delta with an assistant role and `content`.
    pub fn assistant(content: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("role".into(), Value::from(Role::Assistant.as_str()));
        fields.insert("content".into(), Value::from(content));
        Self { fields }
    }

    /// `role`, if present and a string.
    pub fn role(&self) -> Option<&str> {
        self.fields.get("role").and_then(Value::as_str)
    }

    /// `content`, if present and a string.
    pub fn content(&self) -> Option<&str> {
        self.fields.get("content").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One streamed `chat.completion.chunk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_object")]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_object() -> String { CHUNK_OBJECT.into() }

impl CompletionChunk {
    /// A single-choice assistant chunk carrying `content`.
    pub fn assistant_text(
        id: &str,
        model: &str,
        content: &str,
        finish_reason: Option<&str>,
    ) -> Self {
        Self {
            id: id.to_string(),
            object: CHUNK_OBJECT.to_string(),
            created: chrono::Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta::assistant(content),
                finish_reason: finish_reason.map(String::from),
                extra: Map::new(),
            }],
            extra: Map::new(),
        }
    }

    /// Concatenated delta content of all choices.
    pub fn text(&self) -> String {
        self.choices
            .iter()
            .filter_map(|c| c.delta.content())
            .collect()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.iter().find_map(|c| c.finish_reason.as_deref())
    }
}
