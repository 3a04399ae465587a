//! Agent run result types.

use serde::{Deserialize, Serialize};

use crate::usage::Usage;

use super::scratchpad::AgentStep;

/// Outcome of one [`AgentExecutor`](super::AgentExecutor) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// The human input the run started from.
    pub input: String,
    /// The final answer.
    pub output: String,
    /// Completed steps, kept only when the executor is asked to return them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intermediate_steps: Vec<AgentStep>,
    /// Token usage summed over every model call.
    pub usage: Usage,
    /// Number of model calls made.
    pub iterations: usize,
}

impl RunResult {
    /// The final answer.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Observations in the order the tools produced them.
    #[must_use]
    pub fn observations(&self) -> Vec<&str> {
        self.intermediate_steps
            .iter()
            .map(|step| step.observation.as_str())
            .collect()
    }
}
