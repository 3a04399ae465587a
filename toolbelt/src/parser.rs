//! Output parsers that turn an assistant message into plain data.
//!
//! - [`ToolCallsParser`] lists every tool call as `{"type": name, "args": {...}}`.
//! - [`KeyToolCallsParser`] keeps only the calls to one tool and returns their
//!   arguments, optionally collapsed to the first call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::Runnable;
use crate::error::{OutputParserError, Result};
use crate::message::{Message, ToolCall};

/// One parsed tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedToolCall {
    /// Name of the tool the model called.
    #[serde(rename = "type")]
    pub name: String,
    /// Decoded argument object.
    pub args: Value,
    /// Provider call ID, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ParsedToolCall {
    /// Decode one raw tool call.
    ///
    /// An empty argument string decodes as `{}`.
    ///
    /// # Errors
    ///
    /// Returns [`OutputParserError::InvalidArguments`] when the argument text
    /// is not valid JSON.
    pub fn from_tool_call(
        call: &ToolCall,
        return_id: bool,
    ) -> std::result::Result<Self, OutputParserError> {
        let args = call
            .parse_arguments()
            .map_err(|e| OutputParserError::InvalidArguments {
                tool: call.name().to_owned(),
                arguments: call.arguments().to_owned(),
                message: e.to_string(),
            })?;
        Ok(Self {
            name: call.name().to_owned(),
            args,
            id: return_id.then(|| call.id.clone()),
        })
    }
}

/// Parses every tool call of an assistant message, in call order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCallsParser {
    return_id: bool,
}

impl ToolCallsParser {
    /// Create a parser that omits call IDs.
    #[must_use]
    pub const fn new() -> Self {
        Self { return_id: false }
    }

    /// Include the provider call ID in each result.
    #[must_use]
    pub const fn return_id(mut self, return_id: bool) -> Self {
        self.return_id = return_id;
        self
    }

    /// Parse a message. A message without tool calls parses to an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`OutputParserError::InvalidArguments`] for the first call whose
    /// arguments are not valid JSON.
    pub fn parse(
        &self,
        message: &Message,
    ) -> std::result::Result<Vec<ParsedToolCall>, OutputParserError> {
        message
            .tool_calls()
            .iter()
            .map(|call| ParsedToolCall::from_tool_call(call, self.return_id))
            .collect()
    }
}

#[async_trait]
impl Runnable for ToolCallsParser {
    type Input = Message;
    type Output = Vec<ParsedToolCall>;

    async fn invoke(&self, input: Message) -> Result<Vec<ParsedToolCall>> {
        Ok(self.parse(&input)?)
    }
}

/// Parses the calls to one named tool and returns their arguments.
///
/// With `return_single` the output is the first matching call's argument
/// object, or `null` when the model did not call the tool. Otherwise it is an
/// array with one entry per matching call. With `return_id` each entry is the
/// full `{"type", "args", "id"}` object instead of the bare arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyToolCallsParser {
    key_name: String,
    return_single: bool,
    return_id: bool,
}

impl KeyToolCallsParser {
    /// Create a parser for calls to `key_name`.
    #[must_use]
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            return_single: false,
            return_id: false,
        }
    }

    /// Collapse the result to the first matching call.
    #[must_use]
    pub const fn return_single(mut self, return_single: bool) -> Self {
        self.return_single = return_single;
        self
    }

    /// Return full call objects including IDs.
    #[must_use]
    pub const fn return_id(mut self, return_id: bool) -> Self {
        self.return_id = return_id;
        self
    }

    /// The tool name this parser keeps.
    #[must_use]
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Parse a message.
    ///
    /// Calls to other tools are skipped without decoding their arguments.
    ///
    /// # Errors
    ///
    /// Returns [`OutputParserError::InvalidArguments`] when a matching call has
    /// arguments that are not valid JSON.
    pub fn parse(&self, message: &Message) -> std::result::Result<Value, OutputParserError> {
        let mut matches = Vec::new();
        for call in message.tool_calls().iter().filter(|c| c.name() == self.key_name) {
            let parsed = ParsedToolCall::from_tool_call(call, self.return_id)?;
            let item = if self.return_id {
                serde_json::to_value(&parsed)
                    .map_err(|e| OutputParserError::Unexpected(e.to_string()))?
            } else {
                parsed.args
            };
            if self.return_single {
                return Ok(item);
            }
            matches.push(item);
        }

        if self.return_single {
            Ok(Value::Null)
        } else {
            Ok(Value::Array(matches))
        }
    }
}

#[async_trait]
impl Runnable for KeyToolCallsParser {
    type Input = Message;
    type Output = Value;

    async fn invoke(&self, input: Message) -> Result<Value> {
        Ok(self.parse(&input)?)
    }
}
