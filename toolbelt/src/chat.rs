//! What goes over the wire to a chat model, what comes back, and the trait a
//! backend implements to carry it.
//!
//! Most code never builds a [`ChatRequest`] by hand: [`ChatModel`] assembles
//! one from its bound tools and options. Providers only see the request.
//!
//! ```rust,ignore
//! use toolbelt::prelude::*;
//!
//! let request = ChatRequest::new("gpt-4o")
//!     .user("What's four times 23")
//!     .tools(vec![Tool::definition(&Multiply)])
//!     .tool_choice("multiply");
//! let response = provider.chat(&request).await?;
//! assert!(response.has_tool_calls());
//! ```
//!
//! [`ChatModel`]: crate::model::ChatModel

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::message::{Message, ToolCall};
use crate::tool::ToolDefinition;
use crate::usage::Usage;

/// One chat completion call.
///
/// Unset options are left out of the serialized form so the provider applies
/// its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier. Providers substitute their default when empty.
    #[serde(default)]
    pub model: String,

    /// The conversation so far, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Stop sequences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Functions the model may call. `None` rather than empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    /// Tool choice already in API form, see [`ToolChoice::to_value`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    /// Whether one turn may request several tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,

    /// Sampling seed, for providers that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl ChatRequest {
    /// An empty conversation for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_messages(model, Vec::new())
    }

    /// A request carrying an existing conversation.
    #[must_use]
    pub fn with_messages(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Self::default()
        }
    }

    /// Append a human turn.
    #[must_use]
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the generated tokens.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Offer tools to the model. An empty list clears the field.
    #[must_use]
    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = (!tools.is_empty()).then_some(tools);
        self
    }

    /// Constrain tool use; a bare tool name forces that tool.
    #[must_use]
    pub fn tool_choice(mut self, choice: impl Into<ToolChoice>) -> Self {
        self.tool_choice = Some(choice.into().to_value());
        self
    }
}

/// How the model may use the bound tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Call tools or answer directly, at the model's discretion.
    #[default]
    Auto,
    /// Call at least one tool.
    Required,
    /// Answer in text only.
    None,
    /// Call exactly this tool.
    Function(String),
}

impl ToolChoice {
    /// The JSON the Chat Completions API expects for `tool_choice`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Auto => json!("auto"),
            Self::Required => json!("required"),
            Self::None => json!("none"),
            Self::Function(name) => json!({"type": "function", "function": {"name": name}}),
        }
    }
}

impl From<&str> for ToolChoice {
    /// Keywords map to their variants (`"any"` is accepted for `Required`);
    /// any other string names a tool.
    fn from(s: &str) -> Self {
        match s {
            "auto" => Self::Auto,
            "required" | "any" => Self::Required,
            "none" => Self::None,
            tool => Self::Function(tool.to_owned()),
        }
    }
}

impl From<String> for ToolChoice {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum StopReason {
    /// The model finished its answer.
    #[default]
    Stop,
    /// Cut off by `max_tokens`.
    Length,
    /// The turn requests tool calls.
    ToolCalls,
    /// Withheld by the provider's content filter.
    ContentFilter,
}

impl StopReason {
    /// Wire name of the reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::ContentFilter => "content_filter",
        }
    }

    /// Read a provider's finish reason. Unknown values count as a normal stop.
    #[must_use]
    pub fn parse(reason: &str) -> Self {
        let reason = reason.to_ascii_lowercase();
        match reason.as_str() {
            "length" | "max_tokens" => Self::Length,
            "tool_calls" | "tool_use" | "function_call" => Self::ToolCalls,
            "content_filter" => Self::ContentFilter,
            _ => Self::Stop,
        }
    }

    /// Whether the answer was cut short.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::Length)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One assistant turn plus what the provider reported about it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant message: text, tool calls, or both.
    pub message: Message,

    /// Why the turn ended.
    pub stop_reason: StopReason,

    /// Token counts, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Model that actually served the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Provider-assigned completion id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChatResponse {
    /// Wrap an assistant message with no metadata.
    #[must_use]
    pub const fn new(message: Message) -> Self {
        Self {
            message,
            stop_reason: StopReason::Stop,
            usage: None,
            model: None,
            id: None,
        }
    }

    /// A plain text answer.
    #[must_use]
    pub fn from_text(content: impl Into<String>) -> Self {
        Self::new(Message::assistant(content))
    }

    /// A turn that only requests tool calls.
    #[must_use]
    pub fn from_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::new(Message::assistant_tool_calls(None, tool_calls))
            .with_stop_reason(StopReason::ToolCalls)
    }

    /// Set the stop reason.
    #[must_use]
    pub const fn with_stop_reason(mut self, reason: StopReason) -> Self {
        self.stop_reason = reason;
        self
    }

    /// Attach token usage.
    #[must_use]
    pub const fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Record the serving model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Text of the assistant message, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.message.text()
    }

    /// Whether the turn requests any tool call.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.message.has_tool_calls()
    }

    /// Requested tool calls, in the order the model listed them.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message.tool_calls()
    }
}

/// A chat completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one request to completion.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Short backend name for logs and error messages.
    fn provider_name(&self) -> &'static str;

    /// Model used when a request leaves `model` empty.
    fn default_model(&self) -> &str;

    /// Whether the backend accepts `tools`. Tool-bound models refuse to
    /// send to a backend that returns `false`.
    fn supports_tools(&self) -> bool {
        true
    }
}

/// Shortcuts available on every [`ChatProvider`].
#[async_trait]
pub trait ChatProviderExt: ChatProvider {
    /// Ask a one-off question of the default model and return the answer text.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .chat(&ChatRequest::new(self.default_model()).user(prompt))
            .await?;
        Ok(response.text().map(ToOwned::to_owned).unwrap_or_default())
    }
}

impl<T: ChatProvider + ?Sized> ChatProviderExt for T {}

/// A provider shared between model handles.
pub type SharedChatProvider = Arc<dyn ChatProvider>;
