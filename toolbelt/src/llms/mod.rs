//! Chat providers.
//!
//! - [`openai`]: the Chat Completions API (and compatible servers).
//! - [`mock`]: a scripted provider for tests and offline demos.

pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use mock::MockProvider;
#[cfg(feature = "openai")]
pub use openai::{OpenAI, OpenAIConfig};
