//! Integer arithmetic tools.
//!
//! All three work on `i64` and report overflow as a tool error instead of
//! wrapping or panicking, so a model that asks for `10^30` gets a readable
//! observation back.

use crate::error::ToolError;
use crate::tool;
use crate::tool::ToolBox;

/// Multiply two integers together.
#[tool]
pub fn multiply(first_int: i64, second_int: i64) -> Result<i64, ToolError> {
    first_int
        .checked_mul(second_int)
        .ok_or_else(|| overflow("multiply", first_int, second_int))
}

/// Add two integers.
#[tool]
pub fn add(first_int: i64, second_int: i64) -> Result<i64, ToolError> {
    first_int
        .checked_add(second_int)
        .ok_or_else(|| overflow("add", first_int, second_int))
}

/// Exponentiate the base to the exponent power.
#[tool]
pub fn exponentiate(base: i64, exponent: i64) -> Result<i64, ToolError> {
    let power = u32::try_from(exponent).map_err(|_| {
        ToolError::execution(format!(
            "exponent must be a non-negative integer no larger than {}, got {exponent}",
            u32::MAX
        ))
    })?;
    base.checked_pow(power)
        .ok_or_else(|| overflow("exponentiate", base, exponent))
}

fn overflow(op: &str, lhs: i64, rhs: i64) -> ToolError {
    ToolError::execution(format!("integer overflow in {op}({lhs}, {rhs})"))
}

/// The three arithmetic tools, in the order `multiply`, `add`, `exponentiate`.
#[must_use]
pub fn arithmetic_toolbox() -> ToolBox {
    ToolBox::new().with(Multiply).with(Add).with(Exponentiate)
}
