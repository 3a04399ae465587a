//! Lifecycle hooks for agent runs.
//!
//! # Lifecycle Events
//!
//! 1. `on_chain_start`: the executor received its input
//! 2. Iteration loop (repeats until the model answers):
//!    - `on_llm_start` → *model call* → `on_llm_end`
//!    - per requested tool: `on_agent_action` → *tool call* → `on_tool_end`
//! 3. `on_agent_finish` then `on_chain_end`, or `on_error` on failure

use async_trait::async_trait;
use std::sync::Arc;

use crate::agent::{AgentAction, AgentFinish};
use crate::chat::ChatResponse;
use crate::error::Error;
use crate::message::Message;

use super::context::RunContext;

/// A shared, thread-safe [`RunHooks`] trait object.
pub type SharedRunHooks = Arc<dyn RunHooks>;

/// Run-level lifecycle hooks.
///
/// Every method has a no-op default, so implementations override only the
/// events they care about.
#[async_trait]
pub trait RunHooks: Send + Sync {
    /// Called once when the executor starts, with the human input.
    async fn on_chain_start(&self, _ctx: &RunContext, _input: &str) {}

    /// Called once when the executor returns, with the final output.
    async fn on_chain_end(&self, _ctx: &RunContext, _output: &str) {}

    /// Called just before the model is invoked with the rendered prompt.
    async fn on_llm_start(&self, _ctx: &RunContext, _messages: &[Message]) {}

    /// Called right after the model responds.
    async fn on_llm_end(&self, _ctx: &RunContext, _response: &ChatResponse) {}

    /// Called before a requested tool runs.
    async fn on_agent_action(&self, _ctx: &RunContext, _action: &AgentAction) {}

    /// Called after a tool ran (or was rejected) with its observation text.
    async fn on_tool_end(&self, _ctx: &RunContext, _action: &AgentAction, _observation: &str) {}

    /// Called when the model produced its final answer.
    async fn on_agent_finish(&self, _ctx: &RunContext, _finish: &AgentFinish) {}

    /// Called when the run fails.
    async fn on_error(&self, _ctx: &RunContext, _error: &Error) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRunHooks;

impl RunHooks for NoopRunHooks {}

/// Fans every event out to several hooks, in registration order.
#[derive(Clone, Default)]
pub struct MultiRunHooks {
    hooks: Vec<SharedRunHooks>,
}

impl MultiRunHooks {
    /// Create an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook.
    #[must_use]
    pub fn with(mut self, hooks: SharedRunHooks) -> Self {
        self.hooks.push(hooks);
        self
    }

    /// Add a hook in place.
    pub fn push(&mut self, hooks: SharedRunHooks) {
        self.hooks.push(hooks);
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl std::fmt::Debug for MultiRunHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiRunHooks")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[async_trait]
impl RunHooks for MultiRunHooks {
    async fn on_chain_start(&self, ctx: &RunContext, input: &str) {
        for hooks in &self.hooks {
            hooks.on_chain_start(ctx, input).await;
        }
    }

    async fn on_chain_end(&self, ctx: &RunContext, output: &str) {
        for hooks in &self.hooks {
            hooks.on_chain_end(ctx, output).await;
        }
    }

    async fn on_llm_start(&self, ctx: &RunContext, messages: &[Message]) {
        for hooks in &self.hooks {
            hooks.on_llm_start(ctx, messages).await;
        }
    }

    async fn on_llm_end(&self, ctx: &RunContext, response: &ChatResponse) {
        for hooks in &self.hooks {
            hooks.on_llm_end(ctx, response).await;
        }
    }

    async fn on_agent_action(&self, ctx: &RunContext, action: &AgentAction) {
        for hooks in &self.hooks {
            hooks.on_agent_action(ctx, action).await;
        }
    }

    async fn on_tool_end(&self, ctx: &RunContext, action: &AgentAction, observation: &str) {
        for hooks in &self.hooks {
            hooks.on_tool_end(ctx, action, observation).await;
        }
    }

    async fn on_agent_finish(&self, ctx: &RunContext, finish: &AgentFinish) {
        for hooks in &self.hooks {
            hooks.on_agent_finish(ctx, finish).await;
        }
    }

    async fn on_error(&self, ctx: &RunContext, error: &Error) {
        for hooks in &self.hooks {
            hooks.on_error(ctx, error).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RunHooks for Recorder {
        async fn on_chain_start(&self, _ctx: &RunContext, input: &str) {
            self.push(format!("start:{input}"));
        }

        async fn on_tool_end(&self, _ctx: &RunContext, action: &AgentAction, observation: &str) {
            self.push(format!("tool:{}={observation}", action.tool));
        }
    }

    #[tokio::test]
    async fn noop_accepts_everything() {
        let ctx = RunContext::new("a");
        NoopRunHooks.on_chain_start(&ctx, "x").await;
        NoopRunHooks.on_error(&ctx, &Error::agent("boom")).await;
    }

    #[tokio::test]
    async fn multi_fans_out_in_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let multi = MultiRunHooks::new()
            .with(first.clone())
            .with(second.clone());
        assert_eq!(multi.len(), 2);

        let ctx = RunContext::new("a");
        let action = AgentAction::new("add", serde_json::json!({}), "call_1");
        multi.on_chain_start(&ctx, "hello").await;
        multi.on_tool_end(&ctx, &action, "15").await;

        assert_eq!(first.events(), vec!["start:hello", "tool:add=15"]);
        assert_eq!(second.events(), first.events());
    }

    #[test]
    fn empty_multi() {
        assert!(MultiRunHooks::new().is_empty());
    }
}
