//! Scripted model turns for running the walkthrough without network access.

use serde_json::json;
use toolbelt::llms::MockProvider;
use toolbelt::message::ToolCall;

/// One forced `multiply` call, as the chain walkthrough expects.
#[must_use]
pub fn chain_provider() -> MockProvider {
    MockProvider::new().with_tool_calls(vec![ToolCall::function(
        "call_1",
        "multiply",
        &json!({"first_int": 4, "second_int": 23}),
    )])
}

/// The four turns of the agent walkthrough: two parallel calls, two single
/// calls, then the answer.
#[must_use]
pub fn agent_provider() -> MockProvider {
    MockProvider::new()
        .with_tool_calls(vec![
            ToolCall::function("call_1", "exponentiate", &json!({"base": 3, "exponent": 5})),
            ToolCall::function("call_2", "add", &json!({"first_int": 12, "second_int": 3})),
        ])
        .with_tool_calls(vec![ToolCall::function(
            "call_3",
            "multiply",
            &json!({"first_int": 243, "second_int": 15}),
        )])
        .with_tool_calls(vec![ToolCall::function(
            "call_4",
            "exponentiate",
            &json!({"base": 3645, "exponent": 2}),
        )])
        .with_text("The result of the calculation is 13,286,025.")
}
