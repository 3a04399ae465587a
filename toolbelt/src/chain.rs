//! Linear composition of model calls, parsers and tools.
//!
//! Every stage implements [`Runnable`]. Stages are joined with
//! [`RunnableExt::pipe`], which type-checks that each stage's output is the
//! next stage's input:
//!
//! ```rust,ignore
//! let chain = model
//!     .pipe(KeyToolCallsParser::new("multiply").return_single(true))
//!     .pipe(ToolRunnable::new(Multiply));
//! let product = chain.invoke("What's four times 23".into()).await?; // 92
//! ```
//!
//! Stages run strictly in order and the first error aborts the chain.

use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use tracing::{Instrument, debug, debug_span, warn};

use crate::error::Result;
use crate::tool::{BoxedTool, DynTool, Tool};

/// A unit of work with a typed input and output.
#[async_trait]
pub trait Runnable: Send + Sync {
    /// What the stage consumes.
    type Input: Send + 'static;
    /// What the stage produces.
    type Output: Send + 'static;

    /// Human readable stage name, used in logs.
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(short_type_name::<Self>())
    }

    /// Run the stage on one input.
    async fn invoke(&self, input: Self::Input) -> Result<Self::Output>;

    /// Run the stage on several inputs, one after another.
    async fn batch(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            outputs.push(self.invoke(input).await?);
        }
        Ok(outputs)
    }
}

/// `toolbelt::parser::ToolCallsParser` -> `ToolCallsParser`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Combinators available on every [`Runnable`].
pub trait RunnableExt: Runnable + Sized {
    /// Feed this stage's output into `next`.
    fn pipe<B>(self, next: B) -> Sequence<Self, B>
    where
        B: Runnable<Input = Self::Output>,
    {
        Sequence::new(self, next)
    }

    /// Append a closure stage.
    fn map<F, O>(self, f: F) -> Sequence<Self, RunnableFn<F, Self::Output, O>>
    where
        F: Fn(Self::Output) -> Result<O> + Send + Sync,
        O: Send + 'static,
    {
        Sequence::new(self, RunnableFn::new(f))
    }
}

impl<R: Runnable> RunnableExt for R {}

/// Two stages run back to back.
#[derive(Debug, Clone)]
pub struct Sequence<A, B> {
    first: A,
    second: B,
}

impl<A, B> Sequence<A, B> {
    /// Join two stages.
    pub const fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// The leading stage.
    pub const fn first(&self) -> &A {
        &self.first
    }

    /// The trailing stage.
    pub const fn second(&self) -> &B {
        &self.second
    }
}

#[async_trait]
impl<A, B> Runnable for Sequence<A, B>
where
    A: Runnable,
    B: Runnable<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{} | {}", self.first.name(), self.second.name()))
    }

    async fn invoke(&self, input: Self::Input) -> Result<Self::Output> {
        let middle = run_stage(&self.first, input).await?;
        run_stage(&self.second, middle).await
    }
}

async fn run_stage<R: Runnable>(stage: &R, input: R::Input) -> Result<R::Output> {
    let name = stage.name();
    let span = debug_span!("stage", name = %name);
    async move {
        debug!("stage started");
        let result = stage.invoke(input).await;
        match &result {
            Ok(_) => debug!("stage finished"),
            Err(e) => warn!(error = %e, "stage failed"),
        }
        result
    }
    .instrument(span)
    .await
}

/// A closure used as a stage.
pub struct RunnableFn<F, I, O> {
    f: F,
    name: Cow<'static, str>,
    _marker: PhantomData<fn(I) -> O>,
}

impl<F, I, O> RunnableFn<F, I, O>
where
    F: Fn(I) -> Result<O> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: Cow::Borrowed("RunnableFn"),
            _marker: PhantomData,
        }
    }

    /// Give the stage a name for logs.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }
}

impl<F, I, O> fmt::Debug for RunnableFn<F, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, I, O> Runnable for RunnableFn<F, I, O>
where
    F: Fn(I) -> Result<O> + Send + Sync,
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&*self.name)
    }

    async fn invoke(&self, input: I) -> Result<O> {
        (self.f)(input)
    }
}

/// A tool used as the last stage of a chain: argument object in, output out.
pub struct ToolRunnable {
    tool: BoxedTool,
}

impl ToolRunnable {
    /// Wrap a typed tool.
    pub fn new<T: Tool + 'static>(tool: T) -> Self
    where
        T::Output: 'static,
    {
        Self {
            tool: Box::new(tool),
        }
    }

    /// Wrap an already boxed tool.
    #[must_use]
    pub fn from_boxed(tool: BoxedTool) -> Self {
        Self { tool }
    }
}

impl fmt::Debug for ToolRunnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRunnable")
            .field("tool", &self.tool.name())
            .finish()
    }
}

#[async_trait]
impl Runnable for ToolRunnable {
    type Input = Value;
    type Output = Value;

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(DynTool::name(self.tool.as_ref()))
    }

    async fn invoke(&self, input: Value) -> Result<Value> {
        Ok(self.tool.call_json(input).await?)
    }
}
