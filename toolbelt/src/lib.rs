//! Toolbelt - tools, chains and agents for function-calling chat models
//!
//! This crate wraps plain Rust functions as tools a chat model can call and
//! wires them to a model in two ways:
//!
//! - a fixed [`chain`]: model with bound tools, then an output [`parser`],
//!   then the tool itself;
//! - an [`agent`] loop where the model picks tools until it can answer,
//!   driven by an [`AgentExecutor`](agent::AgentExecutor).
//!
//! ```rust,ignore
//! use toolbelt::prelude::*;
//! use toolbelt::tools::Multiply;
//!
//! let model = ChatModel::new(provider)
//!     .bind_tools([Tool::definition(&Multiply)])
//!     .tool_choice("multiply");
//! let chain = model
//!     .pipe(KeyToolCallsParser::new("multiply").return_single(true))
//!     .pipe(ToolRunnable::new(Multiply));
//! let product = chain.invoke("What's four times 23".into()).await?;
//! ```

extern crate self as toolbelt;

pub mod agent;
pub mod callback;
pub mod chain;
pub mod chat;
pub mod error;
pub mod llms;
pub mod message;
pub mod model;
pub mod parser;
pub mod prelude;
pub mod tool;
#[cfg(feature = "derive")]
pub mod tools;
pub mod usage;

pub use error::{Error, LlmError, OutputParserError, Result, ToolError};

#[cfg(feature = "derive")]
pub use toolbelt_derive::tool;

/// Re-exports used by code generated from `#[tool]`.
#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use serde;
    pub use serde_json;
}
