//! Arithmetic agent example using OpenAI.
//!
//! Gives a tool-calling agent the `multiply`, `add` and `exponentiate` tools
//! and lets it work through a multi-step calculation. The executor runs in
//! verbose mode, so every tool invocation and observation is printed, while
//! `tracing-subscriber` reports the agent and tool spans on stderr.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --example agent_arithmetic
//! ```

#![allow(clippy::print_stdout)]

use toolbelt::prelude::*;
use toolbelt::tools::arithmetic_toolbox;

#[tokio::main]
async fn main() -> Result<()> {
    // Spans and events go to stderr; the agent trace goes to stdout.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter("toolbelt=info")
        .with_writer(std::io::stderr)
        .init();

    let model = ChatModel::from_provider(OpenAI::from_env()?).temperature(0.0);
    let agent = Agent::new("arithmetic", model);

    let executor = AgentExecutor::new(agent, arithmetic_toolbox()).verbose(true);

    let result = executor
        .invoke(
            "Take 3 to the fifth power and multiply that by the sum of twelve and three, \
             then square the whole result",
        )
        .await?;

    println!("\n{}", result.output);
    println!("tokens used: {}", result.usage.total_tokens);

    Ok(())
}
