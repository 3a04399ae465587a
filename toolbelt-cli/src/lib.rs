//! Command line walkthrough for the `toolbelt` crate.
//!
//! Lists the arithmetic tools, runs the forced-tool chain and the agent loop
//! against OpenAI, or replays both offline from a scripted provider.

pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod offline;

pub use config::{AgentSection, CliConfig, ModelSection};
pub use error::{CliError, Result};
