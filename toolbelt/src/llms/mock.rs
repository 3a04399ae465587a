//! Scripted provider for tests and offline demos.
//!
//! [`MockProvider`] answers each request with the next queued
//! [`ChatResponse`] and remembers every request it received, so tests can
//! assert on exactly what a chain or agent sent to the model.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::chat::{ChatProvider, ChatRequest, ChatResponse};
use crate::error::{LlmError, Result};
use crate::message::ToolCall;

/// A provider that replays scripted responses in order.
#[derive(Debug)]
pub struct MockProvider {
    model: String,
    responses: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a provider with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_owned(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Use a custom default model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a response.
    #[must_use]
    pub fn with_response(self, response: ChatResponse) -> Self {
        self.push(response);
        self
    }

    /// Queue a plain text answer.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(ChatResponse::from_text(text))
    }

    /// Queue a turn that requests the given tool calls.
    #[must_use]
    pub fn with_tool_calls(self, tool_calls: Vec<ToolCall>) -> Self {
        self.with_response(ChatResponse::from_tool_calls(tool_calls))
    }

    /// Queue a response after construction.
    pub fn push(&self, response: ChatResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of scripted responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests
            .lock()
            .map_err(|_| LlmError::internal("mock request log poisoned"))?
            .push(request.clone());

        let next = self
            .responses
            .lock()
            .map_err(|_| LlmError::internal("mock script poisoned"))?
            .pop_front();

        next.map(|response| response.with_model(request.model.clone()))
            .ok_or_else(|| {
                LlmError::internal("mock provider has no scripted responses left").into()
            })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn replays_in_order() {
        let provider = MockProvider::new().with_text("first").with_text("second");
        let req = ChatRequest::new("m").user("hi");
        assert_eq!(provider.chat(&req).await.unwrap().text(), Some("first"));
        assert_eq!(provider.chat(&req).await.unwrap().text(), Some("second"));
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn exhausted_script_is_internal_error() {
        let provider = MockProvider::new();
        let err = provider.chat(&ChatRequest::new("m")).await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::Internal(_))));
    }

    #[tokio::test]
    async fn records_requests() {
        let provider = MockProvider::new().with_text("ok");
        provider
            .chat(&ChatRequest::new("gpt-4o").user("What's four times 23"))
            .await
            .unwrap();
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o");
    }

    #[tokio::test]
    async fn response_reports_requested_model() {
        let provider = MockProvider::new().with_text("ok");
        let resp = provider.chat(&ChatRequest::new("gpt-4o")).await.unwrap();
        assert_eq!(resp.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn default_model_is_configurable() {
        assert_eq!(MockProvider::new().default_model(), "mock-model");
        assert_eq!(
            MockProvider::new().with_model("scripted").default_model(),
            "scripted"
        );
    }
}
