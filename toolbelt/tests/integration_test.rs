//! End-to-end runs of the arithmetic walkthrough against a scripted provider.

#![allow(clippy::unwrap_used, clippy::panic, clippy::clone_on_ref_ptr)]

use std::sync::Arc;

use serde_json::json;
use toolbelt::prelude::*;
use toolbelt::tools::{Add, Exponentiate, Multiply, arithmetic_toolbox};

const CHAIN_PROMPT: &str = "What's four times 23";
const AGENT_PROMPT: &str = "Take 3 to the fifth power and multiply that by the sum of twelve and three, then square the whole result";

fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::function(id, name, &args)
}

/// The four model turns of the agent walkthrough.
fn walkthrough_provider() -> Arc<MockProvider> {
    Arc::new(
        MockProvider::new()
            .with_tool_calls(vec![
                call("call_1", "exponentiate", json!({"base": 3, "exponent": 5})),
                call("call_2", "add", json!({"first_int": 12, "second_int": 3})),
            ])
            .with_tool_calls(vec![call(
                "call_3",
                "multiply",
                json!({"first_int": 243, "second_int": 15}),
            )])
            .with_tool_calls(vec![call(
                "call_4",
                "exponentiate",
                json!({"base": 3645, "exponent": 2}),
            )])
            .with_text("The result of the calculation is 13,286,025."),
    )
}

#[test]
fn tool_metadata() {
    let multiply = Tool::definition(&Multiply);
    assert_eq!(multiply.name, "multiply");
    assert_eq!(multiply.description, "Multiply two integers together.");
    assert_eq!(
        serde_json::to_value(multiply.args()).unwrap(),
        json!({
            "first_int": {"title": "First Int", "type": "integer"},
            "second_int": {"title": "Second Int", "type": "integer"}
        })
    );

    assert_eq!(
        render_text_description(&arithmetic_toolbox().definitions()),
        "multiply(first_int: integer, second_int: integer) - Multiply two integers together.\n\
         add(first_int: integer, second_int: integer) - Add two integers.\n\
         exponentiate(base: integer, exponent: integer) - Exponentiate the base to the exponent power."
    );
}

#[tokio::test]
async fn tools_invoke_directly() {
    let product = Tool::call_json(&Multiply, json!({"first_int": 4, "second_int": 23}));
    assert_eq!(product.await.unwrap(), json!(92));
    let sum = Tool::call_json(&Add, json!({"first_int": 12, "second_int": 3}));
    assert_eq!(sum.await.unwrap(), json!(15));
    let power = Tool::call_json(&Exponentiate, json!({"base": 3, "exponent": 5}));
    assert_eq!(power.await.unwrap(), json!(243));
}

mod chain {
    use super::*;

    fn forced_multiply(provider: &Arc<MockProvider>) -> ChatModel {
        ChatModel::new(provider.clone())
            .bind_tools([Tool::definition(&Multiply)])
            .tool_choice("multiply")
    }

    #[tokio::test]
    async fn four_times_23() {
        let provider = Arc::new(MockProvider::new().with_tool_calls(vec![call(
            "call_1",
            "multiply",
            json!({"first_int": 4, "second_int": 23}),
        )]));

        let chain = forced_multiply(&provider)
            .pipe(KeyToolCallsParser::new("multiply").return_single(true))
            .pipe(ToolRunnable::new(Multiply));
        let product = chain.invoke(PromptValue::from(CHAIN_PROMPT)).await.unwrap();
        assert_eq!(product, json!(92));

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, vec![Message::user(CHAIN_PROMPT)]);
        assert_eq!(
            requests[0].tool_choice,
            Some(json!({"type": "function", "function": {"name": "multiply"}}))
        );
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn batch_runs_each_input() {
        let provider = Arc::new(
            MockProvider::new()
                .with_tool_calls(vec![call(
                    "a",
                    "multiply",
                    json!({"first_int": 4, "second_int": 23}),
                )])
                .with_tool_calls(vec![call(
                    "b",
                    "multiply",
                    json!({"first_int": 6, "second_int": 7}),
                )]),
        );
        let chain = forced_multiply(&provider)
            .pipe(KeyToolCallsParser::new("multiply").return_single(true))
            .pipe(ToolRunnable::new(Multiply));
        let products = chain
            .batch(vec![CHAIN_PROMPT.into(), "six times seven".into()])
            .await
            .unwrap();
        assert_eq!(products, vec![json!(92), json!(42)]);
    }

    #[tokio::test]
    async fn unbound_forced_tool_is_rejected_before_sending() {
        let provider = Arc::new(MockProvider::new());
        let model = ChatModel::new(provider.clone())
            .bind_tools([Tool::definition(&Add)])
            .tool_choice("multiply");

        let err = model.invoke(CHAIN_PROMPT).await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::InvalidRequest(_))));
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn tool_error_aborts_chain() {
        let provider = Arc::new(MockProvider::new().with_tool_calls(vec![call(
            "call_1",
            "multiply",
            json!({"first_int": i64::MAX, "second_int": 2}),
        )]));
        let chain = forced_multiply(&provider)
            .pipe(KeyToolCallsParser::new("multiply").return_single(true))
            .pipe(ToolRunnable::new(Multiply));
        let err = chain.invoke(CHAIN_PROMPT.into()).await.unwrap_err();
        assert!(matches!(err, Error::Tool(ToolError::Execution(_))));
    }
}

mod agent {
    use super::*;

    fn executor(provider: &Arc<MockProvider>) -> AgentExecutor {
        let agent = Agent::new("arithmetic", ChatModel::new(provider.clone()));
        AgentExecutor::new(agent, arithmetic_toolbox()).return_intermediate_steps(true)
    }

    #[tokio::test]
    async fn walkthrough_reaches_13286025() {
        let provider = walkthrough_provider();
        let result = executor(&provider).invoke(AGENT_PROMPT).await.unwrap();

        assert_eq!(result.input, AGENT_PROMPT);
        assert_eq!(result.output, "The result of the calculation is 13,286,025.");
        assert_eq!(result.iterations, 4);
        assert_eq!(result.observations(), vec!["243", "15", "3645", "13286025"]);

        let requests = provider.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(
            requests[0].messages,
            vec![
                Message::system("You are a helpful assistant"),
                Message::user(AGENT_PROMPT)
            ]
        );
        // system, human, then one assistant turn and its tool results per step
        let last = &requests[3].messages;
        let roles: Vec<Role> = last.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Tool,
                Role::Assistant,
                Role::Tool,
                Role::Assistant,
                Role::Tool,
            ]
        );
        assert_eq!(last[8], Message::tool("call_4", "13286025"));
    }

    #[tokio::test]
    async fn walkthrough_trace() {
        let provider = walkthrough_provider();
        let console = Arc::new(ConsoleHooks::new(Vec::new()));
        executor(&provider)
            .hooks(console.clone())
            .invoke(AGENT_PROMPT)
            .await
            .unwrap();

        let console = Arc::try_unwrap(console).ok().unwrap();
        let trace = String::from_utf8(console.into_inner()).unwrap();
        let expected = [
            "\n\n> Entering new AgentExecutor chain...\n",
            "\nInvoking: `exponentiate` with `{\"base\":3,\"exponent\":5}`\n\n\n",
            "243",
            "\nInvoking: `add` with `{\"first_int\":12,\"second_int\":3}`\n\n\n",
            "15",
            "\nInvoking: `multiply` with `{\"first_int\":243,\"second_int\":15}`\n\n\n",
            "3645",
            "\nInvoking: `exponentiate` with `{\"base\":3645,\"exponent\":2}`\n\n\n",
            "13286025",
            "The result of the calculation is 13,286,025.",
            "\n\n> Finished chain.\n",
        ]
        .concat();
        assert_eq!(trace, expected);
    }

    #[tokio::test]
    async fn logging_hooks_do_not_change_result() {
        let provider = walkthrough_provider();
        let hooks = MultiRunHooks::new()
            .with(Arc::new(LoggingRunHooks::with_level(LogLevel::Debug)))
            .with(Arc::new(NoopRunHooks));
        let result = executor(&provider)
            .hooks(Arc::new(hooks))
            .invoke(AGENT_PROMPT)
            .await
            .unwrap();
        assert!(result.output.contains("13,286,025"));
    }

    #[tokio::test]
    async fn executor_is_runnable() {
        let provider = Arc::new(MockProvider::new().with_text("Nothing to compute."));
        let output = executor(&provider)
            .map(|result: RunResult| Ok(result.output))
            .invoke("hello".to_owned())
            .await
            .unwrap();
        assert_eq!(output, "Nothing to compute.");
    }
}
