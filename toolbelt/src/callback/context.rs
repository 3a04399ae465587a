//! Context handed to every hook during an agent run.

use uuid::Uuid;

use crate::usage::Usage;

/// State shared with hooks across one agent run.
///
/// Hooks receive `&RunContext`; they observe the run but cannot steer it.
///
/// ```rust
/// use toolbelt::callback::RunContext;
///
/// let ctx = RunContext::new("math").with_iteration(3);
/// assert_eq!(ctx.agent_name(), "math");
/// assert_eq!(ctx.iteration(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    agent_name: String,
    /// 1-indexed during execution, 0 before the first model call.
    iteration: usize,
    usage: Usage,
}

impl RunContext {
    /// Create a context for a new run with a fresh run ID.
    #[must_use]
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            agent_name: agent_name.into(),
            iteration: 0,
            usage: Usage::zero(),
        }
    }

    /// Set the iteration number.
    #[must_use]
    pub const fn with_iteration(mut self, iteration: usize) -> Self {
        self.iteration = iteration;
        self
    }

    /// Unique ID of this run.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Name of the running agent.
    #[must_use]
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Current iteration number.
    #[must_use]
    pub const fn iteration(&self) -> usize {
        self.iteration
    }

    /// Token usage accumulated so far.
    #[must_use]
    pub const fn usage(&self) -> &Usage {
        &self.usage
    }

    pub(crate) const fn advance(&mut self) {
        self.iteration += 1;
    }

    pub(crate) fn add_usage(&mut self, usage: Usage) {
        self.usage += usage;
    }
}
