//! OpenAI API client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::chat::ChatRequest;
use crate::error::{LlmError, Result};
use crate::message::Message;
use crate::tool::ToolDefinition;

use super::config::OpenAIConfig;
use super::types::{
    OpenAIChatRequest, OpenAIErrorResponse, OpenAIFunction, OpenAIFunctionCall, OpenAIMessage,
    OpenAITool, OpenAIToolCall,
};

/// OpenAI API client.
#[derive(Debug, Clone)]
pub struct OpenAI {
    pub(crate) config: Arc<OpenAIConfig>,
    pub(crate) client: Client,
}

impl OpenAI {
    /// Create a new OpenAI client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Auth`] for an empty API key, or
    /// [`LlmError::Internal`] when the HTTP client cannot be built.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::auth("openai", "API key is required").into());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// See [`OpenAIConfig::from_env`] and [`OpenAI::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the default model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the chat completions URL.
    pub(crate) fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Build an authenticated JSON POST.
    pub(crate) fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json");

        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        req
    }

    /// Convert a [`Message`] to the wire format.
    pub(crate) fn convert_message(msg: &Message) -> OpenAIMessage {
        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| OpenAIToolCall {
                    id: tc.id.clone(),
                    call_type: tc.call_type.clone(),
                    function: OpenAIFunctionCall {
                        name: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    },
                })
                .collect()
        });

        OpenAIMessage {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    /// Convert a [`ToolDefinition`] to the wire format.
    pub(crate) fn convert_tool(tool: &ToolDefinition) -> OpenAITool {
        OpenAITool {
            tool_type: "function".to_owned(),
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
                strict: tool.strict,
            },
        }
    }

    /// Build the request body.
    pub(crate) fn build_body(&self, request: &ChatRequest) -> OpenAIChatRequest {
        let model = if request.model.is_empty() {
            self.config.model.clone()
        } else {
            request.model.clone()
        };

        let tools = request
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| tools.iter().map(Self::convert_tool).collect());

        OpenAIChatRequest {
            model,
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stop: request.stop.clone(),
            tools,
            tool_choice: request.tool_choice.clone(),
            parallel_tool_calls: request.parallel_tool_calls,
            seed: request.seed,
        }
    }

    /// Map an error response to an [`LlmError`].
    pub(crate) fn parse_error(status: u16, body: &str) -> LlmError {
        match status {
            401 => {
                let message = serde_json::from_str::<OpenAIErrorResponse>(body)
                    .map_or_else(|_| body.to_owned(), |r| r.error.message);
                return LlmError::auth("openai", message);
            }
            429 => return LlmError::rate_limited("openai"),
            _ => {}
        }

        if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(body) {
            let error = error_response.error;
            let code = match error.code {
                Some(serde_json::Value::String(code)) => code,
                Some(code) if !code.is_null() => code.to_string(),
                _ => error.error_type.unwrap_or_else(|| status.to_string()),
            };
            return LlmError::provider_code("openai", code, error.message);
        }

        LlmError::http_status(status, body.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use serde_json::json;

    fn client() -> OpenAI {
        OpenAI::new(OpenAIConfig::new("sk-test")).unwrap()
    }

    mod convert {
        use super::*;

        #[test]
        fn user_message() {
            let converted = OpenAI::convert_message(&Message::user("Hello!"));
            assert_eq!(converted.role, "user");
            assert_eq!(converted.content.as_deref(), Some("Hello!"));
        }

        #[test]
        fn tool_call_turn_serializes_null_content() {
            let msg = Message::assistant_tool_calls(
                None,
                vec![ToolCall::new("call_1", "add", r#"{"first_int":1,"second_int":2}"#)],
            );
            let value = serde_json::to_value(OpenAI::convert_message(&msg)).unwrap();
            assert_eq!(
                value,
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "add", "arguments": "{\"first_int\":1,\"second_int\":2}"}
                    }]
                })
            );
        }

        #[test]
        fn tool_result() {
            let converted = OpenAI::convert_message(&Message::tool("call_1", "3"));
            assert_eq!(converted.role, "tool");
            assert_eq!(converted.tool_call_id.as_deref(), Some("call_1"));
        }

        #[test]
        fn strict_tool_keeps_closed_schema() {
            let tool = ToolDefinition::new("t", "d", json!({"type": "object"})).with_strict(true);
            let converted = OpenAI::convert_tool(&tool);
            assert_eq!(converted.function.strict, Some(true));
            assert_eq!(converted.function.parameters["additionalProperties"], json!(false));
        }
    }

    mod body {
        use super::*;
        use crate::chat::ToolChoice;

        #[test]
        fn empty_model_uses_default() {
            let body = client().build_body(&ChatRequest::new("").user("hi"));
            assert_eq!(body.model, "gpt-4o");
        }

        #[test]
        fn carries_tools_and_choice() {
            let request = ChatRequest::new("gpt-4o-mini")
                .user("What's four times 23")
                .tools(vec![ToolDefinition::new("multiply", "Multiply.", json!({}))])
                .tool_choice(ToolChoice::Function("multiply".into()));
            let body = serde_json::to_value(client().build_body(&request)).unwrap();
            assert_eq!(body["model"], "gpt-4o-mini");
            assert_eq!(body["tools"][0]["function"]["name"], "multiply");
            assert_eq!(
                body["tool_choice"],
                json!({"type": "function", "function": {"name": "multiply"}})
            );
            assert!(body.get("temperature").is_none());
        }

        #[test]
        fn no_tools_omits_field() {
            let body = serde_json::to_value(client().build_body(&ChatRequest::new("m").user("hi")))
                .unwrap();
            assert!(body.get("tools").is_none());
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn unauthorized() {
            let err = OpenAI::parse_error(
                401,
                r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error"}}"#,
            );
            assert!(matches!(err, LlmError::Auth { ref message, .. } if message == "Incorrect API key"));
        }

        #[test]
        fn rate_limited() {
            assert!(matches!(OpenAI::parse_error(429, ""), LlmError::RateLimited { .. }));
        }

        #[test]
        fn structured_error_keeps_code() {
            let err = OpenAI::parse_error(
                400,
                r#"{"error":{"message":"bad tool","type":"invalid_request_error","code":"invalid_tool"}}"#,
            );
            assert!(matches!(err, LlmError::Provider { ref code, .. } if code.as_deref() == Some("invalid_tool")));
        }

        #[test]
        fn missing_code_falls_back_to_type() {
            let err = OpenAI::parse_error(
                500,
                r#"{"error":{"message":"oops","type":"server_error","code":null}}"#,
            );
            assert!(matches!(err, LlmError::Provider { ref code, .. } if code.as_deref() == Some("server_error")));
        }

        #[test]
        fn plain_body_is_http_status() {
            assert!(matches!(
                OpenAI::parse_error(502, "Bad Gateway"),
                LlmError::HttpStatus { status: 502, .. }
            ));
        }
    }

    #[test]
    fn empty_key_rejected() {
        assert!(OpenAI::new(OpenAIConfig::default()).is_err());
    }

    #[test]
    fn chat_url_trims_slash() {
        let client = OpenAI::new(OpenAIConfig::new("k").with_base_url("http://x/v1/")).unwrap();
        assert_eq!(client.chat_url(), "http://x/v1/chat/completions");
    }
}
