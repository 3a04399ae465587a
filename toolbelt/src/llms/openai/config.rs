//! Settings for the OpenAI client, from code or from the environment.

use std::env;

use crate::error::{LlmError, Result};

/// Where and how to reach a Chat Completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// API root; `/chat/completions` is appended to it.
    pub base_url: String,
    /// Model used when a request does not name one.
    pub model: String,
    /// Sent as `OpenAI-Organization` when set.
    pub organization: Option<String>,
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl OpenAIConfig {
    /// The public OpenAI endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    /// Model used unless overridden.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o";
    /// Seconds before a request is abandoned.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Defaults plus the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Build from `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL` and
    /// `OPENAI_ORGANIZATION`. Only the key is required.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Auth`] when `OPENAI_API_KEY` is unset or blank.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::auth("openai", "OPENAI_API_KEY is not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = env::var("OPENAI_MODEL") {
            config.model = model;
        }
        config.organization = env::var("OPENAI_ORGANIZATION").ok();
        Ok(config)
    }

    /// Point the client at another OpenAI-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Change the fallback model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Bill requests to an organization.
    #[must_use]
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::DEFAULT_BASE_URL.into(),
            model: Self::DEFAULT_MODEL.into(),
            organization: None,
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}
