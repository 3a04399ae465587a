//! Procedural macros for the toolbelt tool-calling framework.
//!
//! This crate provides the `#[tool]` attribute macro, which turns an ordinary
//! function into a tool a chat model can call.

extern crate proc_macro;

mod tool;

use proc_macro::TokenStream;

/// Transforms a function into a `toolbelt::tool::Tool` implementation.
///
/// For `fn multiply(...)` the macro emits, next to the untouched function:
///
/// - `MultiplyArgs`, a serde struct with one field per parameter,
/// - `Multiply`, a unit struct implementing `Tool`,
/// - `MULTIPLY`, a static instance of it.
///
/// The tool description is taken from `description = "..."`, else from the
/// doc comment text before its first `#` section. Parameter descriptions come from
/// `params(name = "...")` or from a `# Arguments` doc section.
///
/// # Examples
///
/// ```rust,ignore
/// use toolbelt::tool;
/// use toolbelt::error::ToolError;
///
/// /// Multiply two integers together.
/// #[tool]
/// fn multiply(first_int: i64, second_int: i64) -> Result<i64, ToolError> {
///     first_int
///         .checked_mul(second_int)
///         .ok_or_else(|| ToolError::execution("integer overflow"))
/// }
/// ```
///
/// With explicit metadata:
///
/// ```rust,ignore
/// #[tool(
///     description = "Raise a base to an integer power",
///     params(base = "The base", exponent = "A non-negative exponent")
/// )]
/// async fn exponentiate(base: i64, exponent: i64) -> Result<i64, ToolError> {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn tool(args: TokenStream, input: TokenStream) -> TokenStream {
    tool::tool_impl(args, input)
}
