//! Configuration for the `toolbelt` binary.
//!
//! Settings are layered:
//! 1. Default values
//! 2. Config file (`~/.toolbelt/config.toml`, or `TOOLBELT_CONFIG` / `-c`)
//! 3. Environment variables (`OPENAI_MODEL`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use toolbelt::agent::AgentExecutor;

use crate::error::{CliError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Chat model settings.
    #[serde(default)]
    pub model: ModelSection,

    /// Agent executor settings.
    #[serde(default)]
    pub agent: AgentSection,
}

/// `[model]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub name: String,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Base URL override for OpenAI-compatible servers.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_model() -> String {
    "gpt-4o".to_owned()
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: default_model(),
            temperature: Some(0.0),
            base_url: None,
        }
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    /// Maximum number of model calls per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Wall clock limit per run, in seconds.
    #[serde(default)]
    pub max_execution_secs: Option<u64>,

    /// Print the agent trace.
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

const fn default_max_iterations() -> usize {
    AgentExecutor::DEFAULT_MAX_ITERATIONS
}

const fn default_verbose() -> bool {
    true
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_execution_secs: None,
            verbose: default_verbose(),
        }
    }
}

impl AgentSection {
    /// Apply the limits of this section to an executor.
    #[must_use]
    pub fn configure(&self, executor: AgentExecutor) -> AgentExecutor {
        let executor = executor
            .max_iterations(self.max_iterations)
            .verbose(self.verbose);
        match self.max_execution_secs {
            Some(secs) => executor.max_execution_time(Duration::from_secs(secs)),
            None => executor,
        }
    }
}

impl CliConfig {
    /// Override the model name, as `OPENAI_MODEL` does.
    #[must_use]
    pub fn with_model_override(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.model.name = model;
        }
        self
    }

    /// Apply environment overrides.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.with_model_override(std::env::var("OPENAI_MODEL").ok())
    }

    /// Reject limits that would stop the agent before its first model call.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            return Err(CliError::config("agent.max_iterations must be at least 1"));
        }
        if self.agent.max_execution_secs == Some(0) {
            return Err(CliError::config("agent.max_execution_secs must be at least 1"));
        }
        Ok(())
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Get the default config directory path.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolbelt")
}

/// Get the default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// The config file to use: an explicit path, or the default one.
#[must_use]
pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(config_path)
}

/// Load configuration from a specific path.
///
/// A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or sets a
/// zero agent limit.
pub async fn load_config_from(path: &Path) -> Result<CliConfig> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(CliConfig::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: CliConfig = toml::from_str(&content)?;
    config.validate()?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Load configuration and apply environment overrides.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be loaded.
pub async fn load(explicit: Option<PathBuf>) -> Result<CliConfig> {
    let path = resolve_path(explicit);
    Ok(load_config_from(&path).await?.apply_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert!(default_config_dir().ends_with(".toolbelt"));
        assert!(config_path().ends_with("config.toml"));
        assert_eq!(
            resolve_path(Some(PathBuf::from("/tmp/x.toml"))),
            PathBuf::from("/tmp/x.toml")
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            [model]
            name = "gpt-4o-mini"

            [agent]
            max_iterations = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.model.temperature, None);
        assert_eq!(config.agent.max_iterations, 5);
        assert!(config.agent.verbose);
        assert_eq!(config.agent.max_execution_secs, None);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.agent, AgentSection::default());
        assert_eq!(config.model.name, "gpt-4o");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(toml::from_str::<CliConfig>("[model]\nmodle = \"x\"").is_err());
    }

    #[test]
    fn test_model_override() {
        let config = CliConfig::default().with_model_override(Some("o3".into()));
        assert_eq!(config.model.name, "o3");
        let config = config.with_model_override(Some("  ".into()));
        assert_eq!(config.model.name, "o3");
        let config = config.with_model_override(None);
        assert_eq!(config.model.name, "o3");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CliConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[agent]"));
        assert_eq!(toml::from_str::<CliConfig>(&text).unwrap(), config);
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("toolbelt-cli-does-not-exist.toml");
        assert_eq!(load_config_from(&path).await.unwrap(), CliConfig::default());
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let mut config = CliConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().unwrap_err().to_string().contains("max_iterations"));

        let mut config = CliConfig::default();
        config.agent.max_execution_secs = Some(0);
        assert!(config.validate().unwrap_err().to_string().contains("max_execution_secs"));

        assert!(CliConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_zero_iterations_in_file_is_rejected() {
        let path = std::env::temp_dir().join(format!(
            "toolbelt-cli-zero-iterations-{}.toml",
            std::process::id()
        ));
        tokio::fs::write(&path, "[agent]\nmax_iterations = 0\n")
            .await
            .unwrap();

        let result = load_config_from(&path).await;
        tokio::fs::remove_file(&path).await.unwrap();
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
