//! The work behind each subcommand.
//!
//! Every function returns its result instead of printing it, except the agent
//! trace which the executor writes to stdout itself when verbose.

use serde_json::Value;
use tracing::info;

use toolbelt::agent::{Agent, AgentExecutor, RunResult};
use toolbelt::chain::{Runnable, RunnableExt, ToolRunnable};
use toolbelt::llms::{MockProvider, OpenAI, OpenAIConfig};
use toolbelt::model::ChatModel;
use toolbelt::parser::KeyToolCallsParser;
use toolbelt::tool::{Tool, ToolBox};
use toolbelt::tools::{Multiply, arithmetic_toolbox};

use crate::config::CliConfig;
use crate::credentials;
use crate::error::Result;
use crate::offline;

/// Prompt used by `toolbelt chain` when none is given.
pub const DEFAULT_CHAIN_PROMPT: &str = "What's four times 23";

/// Prompt used by `toolbelt agent` when none is given.
pub const DEFAULT_AGENT_PROMPT: &str = "Take 3 to the fifth power and multiply that by the sum \
     of twelve and three, then square the whole result";

/// Name, description and argument schema of every tool, one block per tool.
///
/// # Errors
///
/// Returns an error if an argument schema cannot be serialized.
pub fn describe_tools(toolbox: &ToolBox) -> Result<String> {
    let mut out = String::new();
    for def in toolbox.definitions() {
        out.push_str(&def.name);
        out.push('\n');
        out.push_str(&def.description);
        out.push('\n');
        out.push_str(&serde_json::to_string(&def.args()).map_err(toolbelt::Error::from)?);
        out.push_str("\n\n");
    }
    Ok(out)
}

/// Build the chat model: scripted when `offline` is given, OpenAI otherwise.
///
/// # Errors
///
/// Returns an error when no API key is available or the client cannot be built.
pub fn chat_model(config: &CliConfig, offline: Option<MockProvider>) -> Result<ChatModel> {
    let model = if let Some(provider) = offline {
        info!("using scripted offline model");
        ChatModel::from_provider(provider)
    } else {
        let mut openai = OpenAIConfig::new(credentials::api_key()?).with_model(&config.model.name);
        if let Some(base_url) = &config.model.base_url {
            openai = openai.with_base_url(base_url);
        }
        info!(model = %config.model.name, "using OpenAI backend");
        ChatModel::from_provider(OpenAI::new(openai)?)
    };

    Ok(match config.model.temperature {
        Some(temperature) => model.temperature(temperature),
        None => model,
    })
}

/// Run the forced `multiply` chain and return the product.
///
/// # Errors
///
/// Returns an error if the model call, argument extraction or tool fails.
pub async fn run_chain(config: &CliConfig, prompt: &str, offline: bool) -> Result<Value> {
    let model = chat_model(config, offline.then(offline::chain_provider))?;
    let chain = model
        .bind_tools([Tool::definition(&Multiply)])
        .tool_choice("multiply")
        .pipe(KeyToolCallsParser::new("multiply").return_single(true))
        .pipe(ToolRunnable::new(Multiply));

    Ok(chain.invoke(prompt.into()).await?)
}

/// Run the arithmetic agent on `prompt`.
///
/// # Errors
///
/// Returns an error if the run fails; hitting a limit yields the stop
/// message as output instead.
pub async fn run_agent(config: &CliConfig, prompt: &str, offline: bool) -> Result<RunResult> {
    let model = chat_model(config, offline.then(offline::agent_provider))?;
    let agent = Agent::new("arithmetic", model);
    let executor = config
        .agent
        .configure(AgentExecutor::new(agent, arithmetic_toolbox()));

    Ok(executor.invoke(prompt).await?)
}
