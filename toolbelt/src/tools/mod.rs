//! Ready-made tools built with `#[tool]`.

pub mod arithmetic;

pub use arithmetic::{Add, Exponentiate, Multiply, arithmetic_toolbox};
