//! Tool-calling agents.
//!
//! An [`Agent`] turns the conversation so far into the next decision: call
//! some tools, or answer. The [`AgentExecutor`] runs that decision loop,
//! executes the requested tools from a [`ToolBox`](crate::tool::ToolBox) and
//! feeds their observations back through the scratchpad until the model
//! answers or a limit is reached.
//!
//! ```rust,ignore
//! use toolbelt::agent::{Agent, AgentExecutor};
//! use toolbelt::tools::arithmetic_toolbox;
//!
//! let agent = Agent::new("math", ChatModel::new(provider));
//! let executor = AgentExecutor::new(agent, arithmetic_toolbox()).verbose(true);
//! let result = executor.invoke("What is 3 to the fifth power?").await?;
//! ```

mod config;
mod executor;
mod prompt;
pub mod result;
pub mod scratchpad;

pub use config::Agent;
pub use executor::{AgentExecutor, EarlyStopping, STOPPED_OUTPUT};
pub use prompt::{AgentPrompt, Instructions};
pub use result::RunResult;
pub use scratchpad::{
    AgentAction, AgentDecision, AgentFinish, AgentStep, EXCEPTION_TOOL, action_log,
    format_scratchpad,
};
