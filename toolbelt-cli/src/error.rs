//! Error type for the command line front end.

/// Errors surfaced by `toolbelt` commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(String),

    /// No API key in the environment and none could be asked for.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Error from the toolbelt library.
    #[error(transparent)]
    Toolbelt(#[from] toolbelt::Error),
}

impl CliError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
