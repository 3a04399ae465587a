//! Callbacks fired during an agent run.
//!
//! - [`RunHooks`]: the lifecycle trait, with no-op defaults.
//! - [`LoggingRunHooks`]: structured `tracing` events.
//! - [`ConsoleHooks`]: the human readable trace printed by a verbose executor.
//! - [`MultiRunHooks`]: fan-out to several hooks.

mod console;
mod context;
mod hooks;
mod logging;

pub use console::ConsoleHooks;
pub use context::RunContext;
pub use hooks::{MultiRunHooks, NoopRunHooks, RunHooks, SharedRunHooks};
pub use logging::{LogLevel, LoggingRunHooks};
