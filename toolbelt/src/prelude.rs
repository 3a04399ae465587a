//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use toolbelt::prelude::*;
//! ```

#[cfg(feature = "openai")]
pub use crate::llms::{OpenAI, OpenAIConfig};
pub use crate::llms::MockProvider;

#[cfg(feature = "derive")]
pub use toolbelt_derive::tool;

pub use crate::agent::{
    Agent, AgentAction, AgentDecision, AgentExecutor, AgentFinish, AgentPrompt, AgentStep,
    EarlyStopping, Instructions, RunResult,
};
pub use crate::callback::{
    ConsoleHooks, LogLevel, LoggingRunHooks, MultiRunHooks, NoopRunHooks, RunContext, RunHooks,
    SharedRunHooks,
};
pub use crate::chain::{Runnable, RunnableExt, RunnableFn, Sequence, ToolRunnable};
pub use crate::chat::{
    ChatProvider, ChatProviderExt, ChatRequest, ChatResponse, SharedChatProvider, StopReason,
    ToolChoice,
};
pub use crate::error::{Error, LlmError, OutputParserError, Result, ToolError};
pub use crate::message::{Message, Role, ToolCall};
pub use crate::model::{ChatModel, PromptValue};
pub use crate::parser::{KeyToolCallsParser, ParsedToolCall, ToolCallsParser};
pub use crate::tool::{BoxedTool, Tool, ToolBox, ToolDefinition, render_text_description};
pub use crate::usage::Usage;
