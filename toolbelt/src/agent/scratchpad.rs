//! Intermediate steps of an agent run and how they are replayed to the model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OutputParserError;
use crate::message::Message;

/// Pseudo-tool name for tool calls whose arguments could not be decoded.
///
/// Its observation is the decoder error, fed back so the model can retry.
pub const EXCEPTION_TOOL: &str = "_Exception";

/// A tool invocation the model asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Name of the requested tool.
    pub tool: String,
    /// Decoded argument object.
    pub tool_input: Value,
    /// Provider call ID, echoed back in the tool message.
    pub tool_call_id: String,
    /// Human readable trace line for this action.
    pub log: String,
    /// The assistant message(s) that requested this action.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_log: Vec<Message>,
}

impl AgentAction {
    /// Create an action with the default log line and no originating message.
    #[must_use]
    pub fn new(
        tool: impl Into<String>,
        tool_input: Value,
        tool_call_id: impl Into<String>,
    ) -> Self {
        let tool = tool.into();
        let log = action_log(&tool, &tool_input.to_string(), None);
        Self {
            tool,
            tool_input,
            tool_call_id: tool_call_id.into(),
            log,
            message_log: Vec::new(),
        }
    }

    /// Replace the trace line.
    #[must_use]
    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    /// Attach the assistant message that requested this action.
    #[must_use]
    pub fn with_message_log(mut self, message_log: Vec<Message>) -> Self {
        self.message_log = message_log;
        self
    }

    /// Returns `true` for the pseudo-action carrying an argument decode error.
    #[must_use]
    pub fn is_exception(&self) -> bool {
        self.tool == EXCEPTION_TOOL
    }
}

/// One completed action and the text it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    /// The action that ran.
    pub action: AgentAction,
    /// The tool output (or error text) fed back to the model.
    pub observation: String,
}

impl AgentStep {
    /// Pair an action with its observation.
    #[must_use]
    pub fn new(action: AgentAction, observation: impl Into<String>) -> Self {
        Self {
            action,
            observation: observation.into(),
        }
    }
}

/// The model's final answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFinish {
    /// The answer returned to the caller.
    pub output: String,
    /// Trace text printed when the run finishes.
    pub log: String,
}

impl AgentFinish {
    /// A finish whose log is the output itself.
    #[must_use]
    pub fn new(output: impl Into<String>) -> Self {
        let output = output.into();
        Self {
            log: output.clone(),
            output,
        }
    }

    /// A finish with a distinct log.
    #[must_use]
    pub fn with_log(output: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            log: log.into(),
        }
    }
}

/// What the agent decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentDecision {
    /// Run these tools, in order, then ask again.
    Actions(Vec<AgentAction>),
    /// Stop with this answer.
    Finish(AgentFinish),
}

impl AgentDecision {
    /// Interpret an assistant message.
    ///
    /// A message without tool calls is a [`Finish`](Self::Finish) with its
    /// text (empty when absent). Otherwise every tool call becomes an action
    /// sharing the message as its `message_log`.
    ///
    /// With `handle_parsing_errors`, a call whose arguments are not valid JSON
    /// becomes an [`EXCEPTION_TOOL`] action whose input is the decoder error.
    ///
    /// # Errors
    ///
    /// Returns [`OutputParserError::InvalidArguments`] for undecodable
    /// arguments when `handle_parsing_errors` is off.
    pub fn from_message(
        message: &Message,
        handle_parsing_errors: bool,
    ) -> Result<Self, OutputParserError> {
        if !message.has_tool_calls() {
            return Ok(Self::Finish(AgentFinish::new(message.text().unwrap_or_default())));
        }

        let content = message.text().filter(|text| !text.is_empty());
        let mut actions = Vec::with_capacity(message.tool_calls().len());
        for call in message.tool_calls() {
            let action = match call.parse_arguments() {
                Ok(input) => AgentAction {
                    log: action_log(call.name(), &input.to_string(), content),
                    tool: call.name().to_owned(),
                    tool_input: input,
                    tool_call_id: call.id.clone(),
                    message_log: vec![message.clone()],
                },
                Err(e) => {
                    let error = OutputParserError::InvalidArguments {
                        tool: call.name().to_owned(),
                        arguments: call.arguments().to_owned(),
                        message: e.to_string(),
                    };
                    if !handle_parsing_errors {
                        return Err(error);
                    }
                    AgentAction {
                        log: action_log(call.name(), call.arguments(), content),
                        tool: EXCEPTION_TOOL.to_owned(),
                        tool_input: Value::String(error.to_string()),
                        tool_call_id: call.id.clone(),
                        message_log: vec![message.clone()],
                    }
                }
            };
            actions.push(action);
        }
        Ok(Self::Actions(actions))
    }
}

/// Trace line for a tool call: which tool, with what arguments, and any text
/// the model produced alongside the call.
#[must_use]
pub fn action_log(tool: &str, args: &str, content: Option<&str>) -> String {
    let responded = content.map_or_else(|| "\n".to_owned(), |text| format!("responded: {text}\n"));
    format!("\nInvoking: `{tool}` with `{args}`\n{responded}\n")
}

/// Replay completed steps as conversation messages.
///
/// Each turn's assistant message appears once, before the tool messages
/// answering its calls; steps keep their order.
///
/// Consecutive steps belong to the same turn while they share a `message_log`
/// and answer distinct call IDs. A repeated ID starts a new turn even when the
/// assistant message is identical to the previous one.
#[must_use]
pub fn format_scratchpad(steps: &[AgentStep]) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::with_capacity(steps.len() * 2);
    let mut turn: Option<&[Message]> = None;
    let mut answered: Vec<&str> = Vec::new();
    for step in steps {
        let action = &step.action;
        let id = action.tool_call_id.as_str();
        if turn != Some(action.message_log.as_slice()) || answered.contains(&id) {
            messages.extend(action.message_log.iter().cloned());
            turn = Some(action.message_log.as_slice());
            answered.clear();
        }
        answered.push(id);
        messages.push(Message::tool(id, &step.observation));
    }
    messages
}
