//! The agent executor: the loop that lets the model pick tools until it can
//! answer.
//!
//! Each iteration renders the prompt (instructions, history, input and the
//! scratchpad of earlier steps), calls the model, and then either runs the
//! requested tools in order or stops with the model's answer.
//!
//! # Stopping
//!
//! The loop stops when the model answers, or when [`max_iterations`] model
//! calls have been made, or when [`max_execution_time`] has elapsed. What
//! happens on a limit depends on [`EarlyStopping`].
//!
//! [`max_iterations`]: AgentExecutor::max_iterations
//! [`max_execution_time`]: AgentExecutor::max_execution_time

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::callback::{ConsoleHooks, MultiRunHooks, RunContext, RunHooks, SharedRunHooks};
use crate::chain::Runnable;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::tool::{ToolBox, output_text};

use super::config::Agent;
use super::result::RunResult;
use super::scratchpad::{AgentAction, AgentDecision, AgentFinish, AgentStep};

/// Output used when the loop is cut short under [`EarlyStopping::Force`].
pub const STOPPED_OUTPUT: &str = "Agent stopped due to iteration limit or time limit.";

/// What to do when the iteration or time limit is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EarlyStopping {
    /// Return [`STOPPED_OUTPUT`] as the answer.
    #[default]
    Force,
    /// Fail with [`Error::MaxIterations`] or [`Error::Timeout`].
    Error,
}

/// Runs an [`Agent`] against a [`ToolBox`].
///
/// ```rust,ignore
/// use toolbelt::agent::{Agent, AgentExecutor};
/// use toolbelt::tools::arithmetic_toolbox;
///
/// let executor = AgentExecutor::new(Agent::new("math", model), arithmetic_toolbox())
///     .verbose(true);
/// let result = executor
///     .invoke("Take 3 to the fifth power and multiply that by the sum of twelve and three")
///     .await?;
/// println!("{}", result.output);
/// ```
pub struct AgentExecutor {
    agent: Agent,
    tools: ToolBox,
    max_iterations: usize,
    max_execution_time: Option<Duration>,
    early_stopping: EarlyStopping,
    handle_tool_errors: bool,
    handle_parsing_errors: bool,
    return_intermediate_steps: bool,
    verbose: bool,
    hooks: Vec<SharedRunHooks>,
}

impl AgentExecutor {
    /// Default iteration limit.
    pub const DEFAULT_MAX_ITERATIONS: usize = 15;

    /// Create an executor; the toolbox definitions are bound to the agent's
    /// model.
    #[must_use]
    pub fn new(agent: Agent, tools: ToolBox) -> Self {
        let agent = agent.bind_tools(tools.definitions());
        Self {
            agent,
            tools,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            max_execution_time: None,
            early_stopping: EarlyStopping::default(),
            handle_tool_errors: false,
            handle_parsing_errors: false,
            return_intermediate_steps: false,
            verbose: false,
            hooks: Vec::new(),
        }
    }

    /// Limit the number of model calls per run.
    #[must_use]
    pub const fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Limit the wall-clock time of a run.
    #[must_use]
    pub const fn max_execution_time(mut self, limit: Duration) -> Self {
        self.max_execution_time = Some(limit);
        self
    }

    /// Choose the behavior when a limit is reached.
    #[must_use]
    pub const fn early_stopping(mut self, method: EarlyStopping) -> Self {
        self.early_stopping = method;
        self
    }

    /// Feed tool errors back to the model as observations instead of failing.
    #[must_use]
    pub const fn handle_tool_errors(mut self, handle: bool) -> Self {
        self.handle_tool_errors = handle;
        self
    }

    /// Feed undecodable tool arguments back to the model instead of failing.
    #[must_use]
    pub const fn handle_parsing_errors(mut self, handle: bool) -> Self {
        self.handle_parsing_errors = handle;
        self
    }

    /// Keep the completed steps in [`RunResult::intermediate_steps`].
    #[must_use]
    pub const fn return_intermediate_steps(mut self, keep: bool) -> Self {
        self.return_intermediate_steps = keep;
        self
    }

    /// Print the run trace to standard output.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Register lifecycle hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: SharedRunHooks) -> Self {
        self.hooks.push(hooks);
        self
    }

    /// The wrapped agent.
    #[must_use]
    pub const fn agent(&self) -> &Agent {
        &self.agent
    }

    /// The available tools.
    #[must_use]
    pub const fn tools(&self) -> &ToolBox {
        &self.tools
    }

    /// Run the loop for one input.
    ///
    /// # Errors
    ///
    /// Returns model errors, tool errors (unless handled), argument decode
    /// errors (unless handled), and [`Error::MaxIterations`] or
    /// [`Error::Timeout`] under [`EarlyStopping::Error`].
    pub async fn invoke(&self, input: impl Into<String>) -> Result<RunResult> {
        self.invoke_with_history(input, &[]).await
    }

    /// Run the loop for one input following earlier conversation turns.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn invoke_with_history(
        &self,
        input: impl Into<String>,
        history: &[Message],
    ) -> Result<RunResult> {
        let input = input.into();
        let span = info_span!(
            "agent",
            agent.name = %self.agent.name(),
            agent.model = %self.agent.model().model(),
            agent.tools = ?self.tools.names(),
            agent.max_iterations = self.max_iterations,
        );
        self.run(input, history).instrument(span).await
    }

    fn run_hooks(&self) -> MultiRunHooks {
        let mut hooks = MultiRunHooks::new();
        if self.verbose {
            hooks.push(Arc::new(ConsoleHooks::stdout()));
        }
        for h in &self.hooks {
            hooks.push(Arc::clone(h));
        }
        hooks
    }

    fn within_limits(&self, iterations: usize, started: Instant) -> bool {
        iterations < self.max_iterations
            && self
                .max_execution_time
                .is_none_or(|limit| started.elapsed() < limit)
    }

    async fn run(&self, input: String, history: &[Message]) -> Result<RunResult> {
        let hooks = self.run_hooks();
        let mut ctx = RunContext::new(self.agent.name());
        let started = Instant::now();
        let mut steps: Vec<AgentStep> = Vec::new();

        hooks.on_chain_start(&ctx, &input).await;

        while self.within_limits(ctx.iteration(), started) {
            ctx.advance();
            debug!(iteration = ctx.iteration(), steps = steps.len(), "planning");

            let messages = self.agent.render(&input, history, &steps);
            hooks.on_llm_start(&ctx, &messages).await;
            let response = match self.agent.model().generate(messages).await {
                Ok(response) => response,
                Err(e) => return Err(Self::fail(&hooks, &ctx, e).await),
            };
            hooks.on_llm_end(&ctx, &response).await;
            if let Some(usage) = response.usage {
                ctx.add_usage(usage);
            }

            let decision =
                match AgentDecision::from_message(&response.message, self.handle_parsing_errors) {
                    Ok(decision) => decision,
                    Err(e) => return Err(Self::fail(&hooks, &ctx, e.into()).await),
                };

            match decision {
                AgentDecision::Finish(finish) => {
                    return Ok(self.finish(&hooks, &ctx, input, finish, steps).await);
                }
                AgentDecision::Actions(actions) => {
                    for action in actions {
                        hooks.on_agent_action(&ctx, &action).await;
                        let observation = match self.observe(&action).await {
                            Ok(observation) => observation,
                            Err(e) => return Err(Self::fail(&hooks, &ctx, e).await),
                        };
                        hooks.on_tool_end(&ctx, &action, &observation).await;
                        steps.push(AgentStep::new(action, observation));
                    }
                }
            }
        }

        info!(
            iterations = ctx.iteration(),
            elapsed_ms = started.elapsed().as_millis(),
            "agent stopped early"
        );
        match self.early_stopping {
            EarlyStopping::Force => {
                let finish = AgentFinish::new(STOPPED_OUTPUT);
                Ok(self.finish(&hooks, &ctx, input, finish, steps).await)
            }
            EarlyStopping::Error => {
                let err = if ctx.iteration() >= self.max_iterations {
                    Error::max_iterations(self.max_iterations)
                } else {
                    Error::Timeout {
                        elapsed_ms: started.elapsed().as_millis(),
                    }
                };
                Err(Self::fail(&hooks, &ctx, err).await)
            }
        }
    }

    async fn finish(
        &self,
        hooks: &MultiRunHooks,
        ctx: &RunContext,
        input: String,
        finish: AgentFinish,
        steps: Vec<AgentStep>,
    ) -> RunResult {
        hooks.on_agent_finish(ctx, &finish).await;
        hooks.on_chain_end(ctx, &finish.output).await;
        info!(
            iterations = ctx.iteration(),
            steps = steps.len(),
            total_tokens = ctx.usage().total_tokens,
            "agent run completed"
        );
        RunResult {
            input,
            output: finish.output,
            intermediate_steps: if self.return_intermediate_steps {
                steps
            } else {
                Vec::new()
            },
            usage: *ctx.usage(),
            iterations: ctx.iteration(),
        }
    }

    async fn fail(hooks: &MultiRunHooks, ctx: &RunContext, err: Error) -> Error {
        error!(error = %err, iteration = ctx.iteration(), "agent run failed");
        hooks.on_error(ctx, &err).await;
        err
    }

    /// Run one action and return the text fed back to the model.
    async fn observe(&self, action: &AgentAction) -> Result<String> {
        if action.is_exception() {
            return Ok(output_text(&action.tool_input));
        }

        if !self.tools.contains(&action.tool) {
            warn!(tool = %action.tool, "model requested an unknown tool");
            return Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                action.tool,
                self.tools.names().join(", ")
            ));
        }

        let span = info_span!(
            "tool",
            tool.name = %action.tool,
            tool.call_id = %action.tool_call_id,
        );
        async {
            debug!(args = %action.tool_input, "calling tool");
            match self.tools.call(&action.tool, action.tool_input.clone()).await {
                Ok(output) => {
                    let observation = output_text(&output);
                    debug!(observation = %observation, "tool returned");
                    Ok(observation)
                }
                Err(e) if self.handle_tool_errors => {
                    warn!(error = %e, "tool call failed, returning error to the model");
                    Ok(e.to_string())
                }
                Err(e) => {
                    warn!(error = %e, "tool call failed");
                    Err(e.into())
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("agent", &self.agent.name())
            .field("tools", &self.tools.names())
            .field("max_iterations", &self.max_iterations)
            .field("max_execution_time", &self.max_execution_time)
            .field("early_stopping", &self.early_stopping)
            .field("handle_tool_errors", &self.handle_tool_errors)
            .field("handle_parsing_errors", &self.handle_parsing_errors)
            .field("return_intermediate_steps", &self.return_intermediate_steps)
            .field("verbose", &self.verbose)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[async_trait]
impl Runnable for AgentExecutor {
    type Input = String;
    type Output = RunResult;

    async fn invoke(&self, input: String) -> Result<RunResult> {
        self.invoke_with_history(input, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::ConsoleHooks;
    use crate::chat::ChatResponse;
    use crate::error::ToolError;
    use crate::llms::MockProvider;
    use crate::message::{Role, ToolCall};
    use crate::model::ChatModel;
    use crate::tools::arithmetic_toolbox;
    use crate::usage::Usage;

    fn call(id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall::new(id, name, args)
    }

    fn executor(provider: &Arc<MockProvider>) -> AgentExecutor {
        let model = ChatModel::new(Arc::clone(provider) as _);
        AgentExecutor::new(Agent::new("math", model), arithmetic_toolbox())
            .return_intermediate_steps(true)
    }

    mod loop_ {
        use super::*;

        #[tokio::test]
        async fn answers_without_tools() {
            let provider = Arc::new(MockProvider::new().with_text("Hello!"));
            let result = executor(&provider).invoke("hi").await.unwrap();
            assert_eq!(result.output, "Hello!");
            assert_eq!(result.iterations, 1);
            assert!(result.intermediate_steps.is_empty());
        }

        #[tokio::test]
        async fn binds_tools_and_replays_steps() {
            let provider = Arc::new(
                MockProvider::new()
                    .with_tool_calls(vec![call("c1", "add", r#"{"first_int":12,"second_int":3}"#)])
                    .with_text("15"),
            );
            let result = executor(&provider).invoke("12 + 3").await.unwrap();
            assert_eq!(result.output, "15");
            assert_eq!(result.observations(), vec!["15"]);

            let requests = provider.requests();
            assert_eq!(requests.len(), 2);
            assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(3));
            let second = &requests[1].messages;
            assert_eq!(second.len(), 4);
            assert_eq!(second[3], Message::tool("c1", "15"));
        }

        #[tokio::test]
        async fn repeated_call_replays_both_turns() {
            let repeat = || vec![call("call_0", "add", r#"{"first_int":1,"second_int":2}"#)];
            let provider = Arc::new(
                MockProvider::new()
                    .with_tool_calls(repeat())
                    .with_tool_calls(repeat())
                    .with_text("3"),
            );
            let result = executor(&provider).invoke("1 + 2").await.unwrap();
            assert_eq!(result.output, "3");

            let requests = provider.requests();
            assert_eq!(requests.len(), 3);
            let roles: Vec<Role> = requests[2].messages.iter().map(|m| m.role).collect();
            assert_eq!(
                roles,
                vec![
                    Role::System,
                    Role::User,
                    Role::Assistant,
                    Role::Tool,
                    Role::Assistant,
                    Role::Tool,
                ]
            );
        }

        #[tokio::test]
        async fn sums_usage() {
            let provider = Arc::new(
                MockProvider::new()
                    .with_response(
                        ChatResponse::from_tool_calls(vec![call(
                            "c1",
                            "multiply",
                            r#"{"first_int":2,"second_int":3}"#,
                        )])
                        .with_usage(Usage::new(10, 5)),
                    )
                    .with_response(ChatResponse::from_text("6").with_usage(Usage::new(20, 1))),
            );
            let result = executor(&provider).invoke("2*3").await.unwrap();
            assert_eq!(result.usage, Usage::new(30, 6));
            assert_eq!(result.iterations, 2);
        }

        #[tokio::test]
        async fn steps_dropped_unless_requested() {
            let provider = Arc::new(
                MockProvider::new()
                    .with_tool_calls(vec![call("c1", "add", r#"{"first_int":1,"second_int":1}"#)])
                    .with_text("2"),
            );
            let result = executor(&provider)
                .return_intermediate_steps(false)
                .invoke("1+1")
                .await
                .unwrap();
            assert!(result.intermediate_steps.is_empty());
        }
    }

    mod errors {
        use super::*;

        #[tokio::test]
        async fn unknown_tool_is_observed() {
            let provider = Arc::new(
                MockProvider::new()
                    .with_tool_calls(vec![call("c1", "divide", r#"{"a":1}"#)])
                    .with_text("cannot divide"),
            );
            let result = executor(&provider).invoke("1/0").await.unwrap();
            assert_eq!(
                result.observations(),
                vec!["divide is not a valid tool, try one of [multiply, add, exponentiate]."]
            );
        }

        #[tokio::test]
        async fn tool_error_propagates_by_default() {
            let provider = Arc::new(MockProvider::new().with_tool_calls(vec![call(
                "c1",
                "exponentiate",
                r#"{"base":2,"exponent":-1}"#,
            )]));
            let err = executor(&provider).invoke("2^-1").await.unwrap_err();
            assert!(matches!(err, Error::Tool(ToolError::Execution(_))));
        }

        #[tokio::test]
        async fn tool_error_observed_when_handled() {
            let provider = Arc::new(
                MockProvider::new()
                    .with_tool_calls(vec![call(
                        "c1",
                        "multiply",
                        r#"{"first_int":9223372036854775807,"second_int":2}"#,
                    )])
                    .with_text("too big"),
            );
            let result = executor(&provider)
                .handle_tool_errors(true)
                .invoke("max * 2")
                .await
                .unwrap();
            assert!(result.observations()[0].starts_with("Execution error:"));
            assert_eq!(result.output, "too big");
        }

        #[tokio::test]
        async fn bad_arguments_propagate_by_default() {
            let provider =
                Arc::new(MockProvider::new().with_tool_calls(vec![call("c1", "add", "{1, 2}")]));
            let err = executor(&provider).invoke("1+2").await.unwrap_err();
            assert!(matches!(err, Error::OutputParser(_)));
        }

        #[tokio::test]
        async fn bad_arguments_fed_back_when_handled() {
            let provider = Arc::new(
                MockProvider::new()
                    .with_tool_calls(vec![call("c1", "add", "{1, 2}")])
                    .with_tool_calls(vec![call("c2", "add", r#"{"first_int":1,"second_int":2}"#)])
                    .with_text("3"),
            );
            let result = executor(&provider)
                .handle_parsing_errors(true)
                .invoke("1+2")
                .await
                .unwrap();
            assert_eq!(result.output, "3");
            assert_eq!(result.intermediate_steps[0].action.tool, "_Exception");
            assert!(result.observations()[0].contains("not valid JSON"));
            assert_eq!(result.observations()[1], "3");
        }

        #[tokio::test]
        async fn model_error_propagates() {
            let provider = Arc::new(MockProvider::new());
            let err = executor(&provider).invoke("hi").await.unwrap_err();
            assert!(matches!(err, Error::Llm(_)));
        }
    }

    mod limits {
        use super::*;

        fn looping_provider(turns: usize) -> Arc<MockProvider> {
            let provider = MockProvider::new();
            for i in 0..turns {
                provider.push(ChatResponse::from_tool_calls(vec![call(
                    &format!("c{i}"),
                    "add",
                    r#"{"first_int":1,"second_int":1}"#,
                )]));
            }
            Arc::new(provider)
        }

        #[tokio::test]
        async fn force_returns_stopped_output() {
            let provider = looping_provider(3);
            let result = executor(&provider)
                .max_iterations(3)
                .invoke("loop")
                .await
                .unwrap();
            assert_eq!(result.output, STOPPED_OUTPUT);
            assert_eq!(result.iterations, 3);
            assert_eq!(result.intermediate_steps.len(), 3);
            assert_eq!(provider.remaining(), 0);
        }

        #[tokio::test]
        async fn error_method_fails() {
            let provider = looping_provider(2);
            let err = executor(&provider)
                .max_iterations(2)
                .early_stopping(EarlyStopping::Error)
                .invoke("loop")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::MaxIterations { max_iterations: 2 }));
        }

        #[tokio::test]
        async fn zero_time_budget_times_out() {
            let provider = looping_provider(1);
            let err = executor(&provider)
                .max_execution_time(Duration::ZERO)
                .early_stopping(EarlyStopping::Error)
                .invoke("loop")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Timeout { .. }));
            assert_eq!(provider.remaining(), 1);
        }

        #[test]
        fn defaults() {
            let executor = executor(&Arc::new(MockProvider::new()));
            assert_eq!(executor.max_iterations, 15);
            assert_eq!(executor.early_stopping, EarlyStopping::Force);
            assert!(format!("{executor:?}").contains("max_iterations: 15"));
        }
    }

    #[tokio::test]
    async fn console_trace() {
        let provider = Arc::new(
            MockProvider::new()
                .with_tool_calls(vec![call("c1", "add", r#"{"first_int":12,"second_int":3}"#)])
                .with_text("The sum is 15."),
        );
        let console = Arc::new(ConsoleHooks::new(Vec::new()));
        executor(&provider)
            .hooks(Arc::clone(&console) as SharedRunHooks)
            .invoke("12 + 3")
            .await
            .unwrap();

        let console = Arc::try_unwrap(console).ok().unwrap();
        let text = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(
            text,
            "\n\n> Entering new AgentExecutor chain...\n\
             \nInvoking: `add` with `{\"first_int\":12,\"second_int\":3}`\n\n\n\
             15\
             The sum is 15.\
             \n\n> Finished chain.\n"
        );
    }
}
