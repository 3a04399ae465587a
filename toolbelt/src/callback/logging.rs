//! Tracing-based [`RunHooks`] implementation.
//!
//! ```rust
//! use toolbelt::callback::{LoggingRunHooks, LogLevel};
//!
//! let hooks = LoggingRunHooks::with_level(LogLevel::Debug);
//! ```

use async_trait::async_trait;

use crate::agent::{AgentAction, AgentFinish};
use crate::chat::ChatResponse;
use crate::error::Error;
use crate::message::Message;

use super::context::RunContext;
use super::hooks::RunHooks;

/// Log verbosity level for hook events.
///
/// Maps directly to `tracing` levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace-level logging (most verbose).
    Trace,
    /// Debug-level logging.
    Debug,
    /// Info-level logging (default).
    #[default]
    Info,
    /// Warn-level logging.
    Warn,
}

macro_rules! log_at_level {
    ($level:expr, $($arg:tt)*) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)*),
            LogLevel::Debug => tracing::debug!($($arg)*),
            LogLevel::Info  => tracing::info!($($arg)*),
            LogLevel::Warn  => tracing::warn!($($arg)*),
        }
    };
}

/// Emits one structured `tracing` event per lifecycle hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRunHooks {
    level: LogLevel,
}

impl LoggingRunHooks {
    /// Log at INFO.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at a custom level.
    #[must_use]
    pub const fn with_level(level: LogLevel) -> Self {
        Self { level }
    }

    /// The configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

#[async_trait]
impl RunHooks for LoggingRunHooks {
    async fn on_chain_start(&self, ctx: &RunContext, input: &str) {
        log_at_level!(
            self.level,
            agent = ctx.agent_name(),
            run_id = %ctx.run_id(),
            input = input,
            "Agent run started"
        );
    }

    async fn on_chain_end(&self, ctx: &RunContext, output: &str) {
        let usage = ctx.usage();
        log_at_level!(
            self.level,
            agent = ctx.agent_name(),
            iterations = ctx.iteration(),
            total_tokens = usage.total_tokens,
            output_len = output.len(),
            "Agent run completed"
        );
    }

    async fn on_llm_start(&self, ctx: &RunContext, messages: &[Message]) {
        log_at_level!(
            self.level,
            agent = ctx.agent_name(),
            iteration = ctx.iteration(),
            message_count = messages.len(),
            "LLM request started"
        );
    }

    async fn on_llm_end(&self, ctx: &RunContext, response: &ChatResponse) {
        let usage = response
            .usage
            .map_or_else(|| "none".to_owned(), |u| u.to_string());
        log_at_level!(
            self.level,
            agent = ctx.agent_name(),
            iteration = ctx.iteration(),
            tool_calls = response.tool_calls().len(),
            usage = %usage,
            stop_reason = %response.stop_reason,
            "LLM request completed"
        );
    }

    async fn on_agent_action(&self, ctx: &RunContext, action: &AgentAction) {
        log_at_level!(
            self.level,
            agent = ctx.agent_name(),
            iteration = ctx.iteration(),
            tool = %action.tool,
            args = %action.tool_input,
            "Tool requested"
        );
    }

    async fn on_tool_end(&self, ctx: &RunContext, action: &AgentAction, observation: &str) {
        log_at_level!(
            self.level,
            agent = ctx.agent_name(),
            iteration = ctx.iteration(),
            tool = %action.tool,
            observation = observation,
            "Tool finished"
        );
    }

    async fn on_agent_finish(&self, ctx: &RunContext, finish: &AgentFinish) {
        log_at_level!(
            self.level,
            agent = ctx.agent_name(),
            iteration = ctx.iteration(),
            output_len = finish.output.len(),
            "Agent finished"
        );
    }

    async fn on_error(&self, ctx: &RunContext, error: &Error) {
        // Errors log at WARN regardless of the configured level.
        tracing::warn!(
            agent = ctx.agent_name(),
            iteration = ctx.iteration(),
            error = %error,
            "Agent run failed"
        );
    }
}
