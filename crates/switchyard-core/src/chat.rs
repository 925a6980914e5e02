//! Unified chat request and response types
//!
//! Every provider client speaks this schema; the router stamps routing
//! information (router id, model id) onto responses and stream chunks.

use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form metadata echoed back on streaming chunks
pub type Metadata = HashMap<String, serde_json::Value>;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: Role,

    /// Text content
    pub content: String,

    /// Optional name of the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Replaces the request message for one specific model in the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideChatRequest {
    /// Model ID (as configured in the router) the override applies to
    pub model_id: String,

    /// Message sent to that model instead of the default one
    pub message: ChatMessage,
}

/// Chat request accepted by a router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Latest message in the conversation
    pub message: ChatMessage,

    /// Earlier messages, oldest first
    #[serde(default)]
    pub message_history: Vec<ChatMessage>,

    /// Per-model message override
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_params: Option<OverrideChatRequest>,
}

impl ChatRequest {
    pub fn new(message: ChatMessage) -> Self {
        Self {
            message,
            message_history: Vec::new(),
            override_params: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.message_history = history;
        self
    }

    pub fn with_override(mut self, model_id: impl Into<String>, message: ChatMessage) -> Self {
        self.override_params = Some(OverrideChatRequest {
            model_id: model_id.into(),
            message,
        });
        self
    }

    /// Resolve the request into the parameters sent to one model
    ///
    /// The override message replaces the default message only when it targets `model_id`.
    pub fn params(&self, model_id: &str) -> ChatParams {
        let message = match &self.override_params {
            Some(over) if over.model_id == model_id => over.message.clone(),
            _ => self.message.clone(),
        };

        let mut messages = Vec::with_capacity(self.message_history.len() + 1);
        messages.extend(self.message_history.iter().cloned());
        messages.push(message);

        ChatParams { messages }
    }
}

/// Streaming chat request; chunks and errors are tagged with its `id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    /// Client-provided request ID
    #[serde(default = "new_request_id")]
    pub id: String,

    #[serde(flatten)]
    pub chat: ChatRequest,

    /// Metadata echoed back on every chunk and error event
    #[serde(default)]
    pub metadata: Metadata,
}

impl ChatStreamRequest {
    /// Create a streaming request with a generated ID
    pub fn new(chat: ChatRequest) -> Self {
        Self {
            id: new_request_id(),
            chat,
            metadata: Metadata::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Model-ready parameters produced by `ChatRequest::params`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatParams {
    pub messages: Vec<ChatMessage>,
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub response_tokens: u32,
    pub total_tokens: u32,
}

/// Provider-side part of a chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Provider-specific metadata (e.g. system fingerprint, generation ID)
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    pub message: ChatMessage,

    pub token_usage: TokenUsage,
}

/// Chat response returned by a router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Provider-assigned response ID
    pub id: String,

    /// Unix timestamp of response creation
    pub created: i64,

    /// Provider name (e.g. "openai")
    pub provider: String,

    /// Router that served the request
    #[serde(default)]
    pub router_id: String,

    /// Configured model ID that served the request
    #[serde(default)]
    pub model_id: String,

    /// Provider model name (e.g. "gpt-4o")
    pub model_name: String,

    #[serde(default)]
    pub cached: bool,

    pub model_response: ModelResponse,
}

/// Reason why generation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Complete,
    MaxTokens,
    ContentFiltered,
    Error,
    Other,
}

/// Provider-side part of a stream chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelChunkResponse {
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Content delta
    pub message: ChatMessage,
}

/// One chunk of a streaming chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    /// Request ID (set by the router from `ChatStreamRequest::id`)
    #[serde(default)]
    pub id: String,

    /// Unix timestamp of chunk creation
    pub created_at: i64,

    pub provider: String,

    #[serde(default)]
    pub router_id: String,

    #[serde(default)]
    pub model_id: String,

    pub model_name: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub model_response: ModelChunkResponse,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Error event emitted on a chat stream
///
/// A `ModelUnavailable` event means the router switched to another model and the
/// stream restarts from scratch; events with `finish_reason` set are terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamError {
    pub id: String,

    pub router_id: String,

    pub code: ErrorCode,

    pub message: String,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl ChatStreamError {
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}
