//! Human readable trace of an agent run.
//!
//! [`ConsoleHooks`] writes the executor's intermediate steps as they happen:
//!
//! ```text
//! > Entering new AgentExecutor chain...
//!
//! Invoking: `exponentiate` with `{"base":3,"exponent":5}`
//!
//!
//! 243
//! Invoking: `add` with `{"first_int":12,"second_int":3}`
//!
//!
//! 15
//! ...
//! The result is 13,286,025.
//!
//! > Finished chain.
//! ```

use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::agent::{AgentAction, AgentFinish};

use super::context::RunContext;
use super::hooks::RunHooks;

/// Writes the verbose run trace to any [`Write`] sink.
///
/// Write failures are ignored; a broken pipe must not fail the run.
#[derive(Debug)]
pub struct ConsoleHooks<W> {
    out: Mutex<W>,
}

impl ConsoleHooks<io::Stdout> {
    /// Trace to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleHooks<W> {
    /// Trace to `out`.
    pub const fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the sink, e.g. to inspect a buffer in tests.
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }
}

#[async_trait]
impl<W: Write + Send> RunHooks for ConsoleHooks<W> {
    async fn on_chain_start(&self, _ctx: &RunContext, _input: &str) {
        self.write("\n\n> Entering new AgentExecutor chain...\n");
    }

    async fn on_chain_end(&self, _ctx: &RunContext, _output: &str) {
        self.write("\n\n> Finished chain.\n");
    }

    async fn on_agent_action(&self, _ctx: &RunContext, action: &AgentAction) {
        self.write(&action.log);
    }

    async fn on_tool_end(&self, _ctx: &RunContext, _action: &AgentAction, observation: &str) {
        self.write(observation);
    }

    async fn on_agent_finish(&self, _ctx: &RunContext, finish: &AgentFinish) {
        self.write(&finish.log);
    }
}
