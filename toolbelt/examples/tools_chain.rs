//! Tool chain example.
//!
//! Binds the `multiply` tool to a chat model, forces the model to call it,
//! extracts the arguments and runs the tool. A scripted provider stands in
//! for the model so the example runs offline.
//!
//! ```bash
//! cargo run --example tools_chain
//! ```

#![allow(clippy::print_stdout)]

use serde_json::json;
use toolbelt::prelude::*;
use toolbelt::tools::{Add, Exponentiate, Multiply, arithmetic_toolbox};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    for def in arithmetic_toolbox().definitions() {
        println!("{}", def.name);
        println!("{}", def.description);
        println!("{}", serde_json::to_string(&def.args())?);
    }
    println!();

    println!("{}", Tool::call_json(&Multiply, json!({"first_int": 4, "second_int": 23})).await?);
    println!("{}", Tool::call_json(&Add, json!({"first_int": 12, "second_int": 3})).await?);
    println!("{}", Tool::call_json(&Exponentiate, json!({"base": 3, "exponent": 5})).await?);
    println!();

    let provider = MockProvider::new().with_tool_calls(vec![ToolCall::function(
        "call_1",
        "multiply",
        &json!({"first_int": 4, "second_int": 23}),
    )]);

    let chain = ChatModel::from_provider(provider)
        .bind_tools([Tool::definition(&Multiply)])
        .tool_choice("multiply")
        .pipe(KeyToolCallsParser::new("multiply").return_single(true))
        .pipe(ToolRunnable::new(Multiply));

    let product = chain.invoke("What's four times 23".into()).await?;
    println!("{product}");

    Ok(())
}
