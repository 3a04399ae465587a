//! The agent: a named prompt bound to a chat model.
//!
//! An [`Agent`] only decides what to do next. Running tools and looping until
//! an answer is found is the job of the [`AgentExecutor`](super::AgentExecutor).
//!
//! ```rust,ignore
//! use toolbelt::agent::Agent;
//!
//! let agent = Agent::new("calculator", model.bind_tools(tools.definitions()))
//!     .instructions("You are a helpful assistant");
//! let decision = agent.plan("What is 3 + 4?", &[], &[]).await?;
//! ```

use crate::error::Result;
use crate::message::Message;
use crate::model::ChatModel;
use crate::tool::ToolDefinition;

use super::prompt::{AgentPrompt, Instructions};
use super::scratchpad::{AgentDecision, AgentStep};

/// A tool-calling agent.
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    prompt: AgentPrompt,
    model: ChatModel,
}

impl Agent {
    /// Create an agent with the default prompt.
    #[must_use]
    pub fn new(name: impl Into<String>, model: ChatModel) -> Self {
        Self {
            name: name.into(),
            prompt: AgentPrompt::default(),
            model,
        }
    }

    /// Set static system instructions.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<Instructions>) -> Self {
        self.prompt = AgentPrompt::new(instructions);
        self
    }

    /// Set instructions that are built from the agent name on every run.
    #[must_use]
    pub fn dynamic_instructions<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.prompt = AgentPrompt::dynamic(f);
        self
    }

    /// Replace the whole prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: AgentPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Bind additional tool definitions to the agent's model.
    #[must_use]
    pub fn bind_tools(mut self, tools: impl IntoIterator<Item = ToolDefinition>) -> Self {
        self.model = self.model.bind_tools(tools);
        self
    }

    /// Agent name, used in logs and hook contexts.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying model handle.
    #[must_use]
    pub const fn model(&self) -> &ChatModel {
        &self.model
    }

    /// The conversation template.
    #[must_use]
    pub const fn agent_prompt(&self) -> &AgentPrompt {
        &self.prompt
    }

    /// Messages for the next model call.
    #[must_use]
    pub fn render(&self, input: &str, history: &[Message], steps: &[AgentStep]) -> Vec<Message> {
        self.prompt.render(&self.name, input, history, steps)
    }

    /// Ask the model for the next decision given the steps taken so far.
    ///
    /// # Errors
    ///
    /// Returns an error when the model call fails, or
    /// [`Error::OutputParser`](crate::Error::OutputParser) when a tool call
    /// carries arguments that are not valid JSON.
    pub async fn plan(
        &self,
        input: &str,
        history: &[Message],
        steps: &[AgentStep],
    ) -> Result<AgentDecision> {
        let response = self.model.generate(self.render(input, history, steps)).await?;
        Ok(AgentDecision::from_message(&response.message, false)?)
    }
}
