//! The agent's conversation template.

use std::fmt;
use std::sync::Arc;

use crate::message::Message;

use super::scratchpad::{AgentStep, format_scratchpad};

/// Instructions that guide the agent's behavior.
///
/// Either a fixed string, or a closure that receives the agent name and
/// builds the instructions at run time.
#[derive(Clone)]
pub enum Instructions {
    /// Static instruction string.
    Static(String),
    /// Dynamic instruction generator.
    Dynamic(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl Instructions {
    /// Resolve the instructions for the given agent name.
    #[must_use]
    pub fn resolve(&self, agent_name: &str) -> String {
        match self {
            Self::Static(s) => s.clone(),
            Self::Dynamic(f) => f(agent_name),
        }
    }
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Self::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<closure>").finish(),
        }
    }
}

impl<S: Into<String>> From<S> for Instructions {
    fn from(s: S) -> Self {
        Self::Static(s.into())
    }
}

/// Message layout sent to the model on every iteration:
///
/// 1. system instructions (omitted when they resolve to an empty string)
/// 2. prior chat history, if any
/// 3. the human input
/// 4. the scratchpad: earlier tool requests and their observations
#[derive(Debug, Clone)]
pub struct AgentPrompt {
    instructions: Instructions,
}

impl Default for AgentPrompt {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INSTRUCTIONS)
    }
}

impl AgentPrompt {
    /// System instructions used when none are given.
    pub const DEFAULT_INSTRUCTIONS: &'static str = "You are a helpful assistant";

    /// Create a prompt with the given instructions.
    #[must_use]
    pub fn new(instructions: impl Into<Instructions>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// Create a prompt whose instructions are built per run.
    #[must_use]
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            instructions: Instructions::Dynamic(Arc::new(f)),
        }
    }

    /// The configured instructions.
    #[must_use]
    pub const fn instructions(&self) -> &Instructions {
        &self.instructions
    }

    /// Render the conversation for one model call.
    #[must_use]
    pub fn render(
        &self,
        agent_name: &str,
        input: &str,
        history: &[Message],
        steps: &[AgentStep],
    ) -> Vec<Message> {
        let system = self.instructions.resolve(agent_name);
        let mut messages = Vec::with_capacity(history.len() + steps.len() * 2 + 2);
        if !system.is_empty() {
            messages.push(Message::system(system));
        }
        messages.extend_from_slice(history);
        messages.push(Message::user(input));
        messages.extend(format_scratchpad(steps));
        messages
    }
}
