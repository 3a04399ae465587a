//! The chat model handle: a provider, a model id and call options.
//!
//! [`ChatModel`] is cheap to clone. Binding tools or a tool choice returns a
//! new handle and leaves the original untouched, so one provider can back a
//! plain model, a tool-forced model for a chain and an agent model at the same
//! time.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, debug, debug_span, error};

use crate::chain::Runnable;
use crate::chat::{ChatProvider, ChatRequest, ChatResponse, SharedChatProvider, ToolChoice};
use crate::error::{LlmError, Result};
use crate::message::Message;
use crate::tool::ToolDefinition;

/// Input accepted by [`ChatModel::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptValue {
    /// A single human message.
    Text(String),
    /// A full conversation.
    Messages(Vec<Message>),
}

impl PromptValue {
    /// The prompt as chat messages.
    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Text(text) => vec![Message::user(text)],
            Self::Messages(messages) => messages,
        }
    }
}

impl From<&str> for PromptValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for PromptValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<Message>> for PromptValue {
    fn from(messages: Vec<Message>) -> Self {
        Self::Messages(messages)
    }
}

impl From<Message> for PromptValue {
    fn from(message: Message) -> Self {
        Self::Messages(vec![message])
    }
}

/// A handle to a chat model with optional bound tools.
#[derive(Clone)]
pub struct ChatModel {
    provider: SharedChatProvider,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    tools: Vec<ToolDefinition>,
    tool_choice: Option<ToolChoice>,
}

impl ChatModel {
    /// Create a handle using the provider's default model.
    #[must_use]
    pub fn new(provider: SharedChatProvider) -> Self {
        let model = provider.default_model().to_owned();
        Self {
            provider,
            model,
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
            tool_choice: None,
        }
    }

    /// Create a handle from a concrete provider.
    #[must_use]
    pub fn from_provider<P: ChatProvider + 'static>(provider: P) -> Self {
        Self::new(Arc::new(provider))
    }

    /// Use a specific model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens to generate.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Make tools available to the model.
    ///
    /// A definition whose name is already bound replaces the earlier one.
    #[must_use]
    pub fn bind_tools(mut self, tools: impl IntoIterator<Item = ToolDefinition>) -> Self {
        for tool in tools {
            match self.tools.iter_mut().find(|t| t.name == tool.name) {
                Some(existing) => *existing = tool,
                None => self.tools.push(tool),
            }
        }
        self
    }

    /// Constrain how the model uses the bound tools.
    ///
    /// A plain tool name forces a call to that tool.
    #[must_use]
    pub fn tool_choice(mut self, choice: impl Into<ToolChoice>) -> Self {
        self.tool_choice = Some(choice.into());
        self
    }

    /// The model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The bound tool definitions.
    #[must_use]
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// The configured tool choice, if any.
    #[must_use]
    pub const fn current_tool_choice(&self) -> Option<&ToolChoice> {
        self.tool_choice.as_ref()
    }

    /// Name of the backing provider.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Build the request for a conversation, validating the tool setup.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] when the tool choice names a tool
    /// that is not bound, when tools are required but none are bound, or when
    /// tools are bound to a provider without tool support.
    pub fn request(&self, messages: Vec<Message>) -> Result<ChatRequest> {
        self.validate_tools()?;

        let mut request =
            ChatRequest::with_messages(&self.model, messages).tools(self.tools.clone());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        if let Some(choice) = &self.tool_choice {
            request = request.tool_choice(choice.clone());
        }
        Ok(request)
    }

    fn validate_tools(&self) -> Result<()> {
        if !self.tools.is_empty() && !self.provider.supports_tools() {
            return Err(LlmError::invalid_request(format!(
                "provider '{}' does not support tool calling",
                self.provider.provider_name()
            ))
            .into());
        }

        match &self.tool_choice {
            Some(ToolChoice::Function(name)) if !self.tools.iter().any(|t| &t.name == name) => {
                Err(LlmError::invalid_request(format!(
                    "tool_choice names '{name}', which is not among the bound tools [{}]",
                    self.tools
                        .iter()
                        .map(|t| t.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
                .into())
            }
            Some(ToolChoice::Required) if self.tools.is_empty() => Err(LlmError::invalid_request(
                "tool_choice is 'required' but no tools are bound",
            )
            .into()),
            _ => Ok(()),
        }
    }

    /// Send a conversation and return the full response.
    ///
    /// # Errors
    ///
    /// Returns an error when validation fails or the provider call fails.
    pub async fn generate(&self, messages: Vec<Message>) -> Result<ChatResponse> {
        let request = self.request(messages)?;
        let span = debug_span!(
            "llm",
            provider = self.provider.provider_name(),
            model = %self.model
        );

        async {
            debug!(
                messages = request.messages.len(),
                tools = self.tools.len(),
                "sending chat request"
            );
            match self.provider.chat(&request).await {
                Ok(response) => {
                    debug!(
                        tool_calls = response.tool_calls().len(),
                        stop_reason = %response.stop_reason,
                        "received chat response"
                    );
                    Ok(response)
                }
                Err(e) => {
                    error!(error = %e, "chat request failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Send a prompt and return the assistant message.
    ///
    /// The message carries either text or tool-call requests.
    ///
    /// # Errors
    ///
    /// Returns an error when validation fails or the provider call fails.
    pub async fn invoke(&self, prompt: impl Into<PromptValue>) -> Result<Message> {
        let response = self.generate(prompt.into().into_messages()).await?;
        Ok(response.message)
    }
}

impl fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatModel")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            )
            .field("tool_choice", &self.tool_choice)
            .finish()
    }
}

#[async_trait]
impl Runnable for ChatModel {
    type Input = PromptValue;
    type Output = Message;

    async fn invoke(&self, input: PromptValue) -> Result<Message> {
        let response = self.generate(input.into_messages()).await?;
        Ok(response.message)
    }
}
