//! Tool trait and utilities for wrapping functions as model-callable tools.
//!
//! A tool is a named function with a description and a JSON schema for its
//! arguments. The model sees the [`ToolDefinition`]; the runtime dispatches
//! calls by name through a [`ToolBox`].
//!
//! # OpenAI API Alignment
//!
//! `ToolDefinition` serializes to the Chat Completions function-calling shape
//! `{"type": "function", "function": {...}}`, including `strict` mode.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ToolError;

/// A type alias for `Result<T, ToolError>`.
pub type ToolResult<T> = Result<T, ToolError>;

/// Definition of a tool for LLM function calling.
///
/// ```json
/// {
///     "type": "function",
///     "function": {
///         "name": "multiply",
///         "description": "Multiply two integers together.",
///         "parameters": { ... }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[non_exhaustive]
pub struct ToolDefinition {
    /// Name of the tool (e.g., "multiply").
    pub name: String,

    /// Description of what the tool does.
    /// This is what the model reads when deciding whether to call it.
    pub description: String,

    /// JSON schema for the tool's parameters.
    pub parameters: Value,

    /// Whether to use strict schema validation (OpenAI Structured Outputs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// Summary of one tool parameter, as shown to humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    /// Human readable title ("First Int").
    pub title: String,
    /// JSON type name ("integer").
    #[serde(rename = "type")]
    pub kind: String,
    /// Parameter description, when documented.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToolDefinition {
    /// Create a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            strict: None,
        }
    }

    /// Enable strict schema validation (Structured Outputs).
    ///
    /// Strict mode requires `"additionalProperties": false` on the parameters
    /// object, which is inserted unless the schema already sets it.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        if strict
            && let Some(obj) = self.parameters.as_object_mut()
            && !obj.contains_key("additionalProperties")
        {
            obj.insert("additionalProperties".to_owned(), Value::Bool(false));
        }
        self
    }

    /// Check if strict mode is enabled.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        matches!(self.strict, Some(true))
    }

    /// Returns the tool name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Per-parameter summary keyed by parameter name.
    ///
    /// Missing titles fall back to the Title Case of the parameter name and
    /// missing types to `"object"`.
    #[must_use]
    pub fn args(&self) -> BTreeMap<String, ArgSpec> {
        let Some(properties) = self.parameters.get("properties").and_then(Value::as_object) else {
            return BTreeMap::new();
        };

        properties
            .iter()
            .map(|(name, schema)| {
                let title = schema
                    .get("title")
                    .and_then(Value::as_str)
                    .map_or_else(|| title_case(name), ToOwned::to_owned);
                let kind = schema_type(schema);
                let description = schema
                    .get("description")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned);
                (
                    name.clone(),
                    ArgSpec {
                        title,
                        kind,
                        description,
                    },
                )
            })
            .collect()
    }

    /// Names of required parameters, in schema order.
    #[must_use]
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Serialization to the OpenAI function calling format.
impl Serialize for ToolDefinition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut function = serde_json::Map::new();
        function.insert("name".to_owned(), Value::String(self.name.clone()));
        function.insert(
            "description".to_owned(),
            Value::String(self.description.clone()),
        );
        function.insert("parameters".to_owned(), self.parameters.clone());
        if let Some(strict) = self.strict {
            function.insert("strict".to_owned(), Value::Bool(strict));
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry("function", &function)?;
        map.end()
    }
}

/// Type name of a property schema.
///
/// `["integer", "null"]` (an optional parameter) reports the non-null member.
fn schema_type(schema: &Value) -> String {
    match schema.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .find(|kind| *kind != "null")
            .unwrap_or("null")
            .to_owned(),
        _ => "object".to_owned(),
    }
}

/// `"first_int"` -> `"First Int"`.
fn title_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a parameters schema from a Rust type.
///
/// The `$schema` meta key is dropped since the chat API rejects it.
#[must_use]
pub fn schema_for<T: JsonSchema>() -> Value {
    let mut schema = schemars::schema_for!(T).to_value();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }
    schema
}

/// Render tools as plain text, one per line: `name(arg: type, ...) - description`.
#[must_use]
pub fn render_text_description(tools: &[ToolDefinition]) -> String {
    tools
        .iter()
        .map(|tool| {
            let args = tool
                .args()
                .into_iter()
                .map(|(name, spec)| format!("{name}: {}", spec.kind))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({args}) - {}", tool.name, tool.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text form of a tool output, as fed back to the model.
///
/// Strings are passed through without quotes; everything else is compact JSON.
#[must_use]
pub fn output_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// The core trait for all tools a model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static name of the tool.
    const NAME: &'static str;

    /// Arguments type for the tool.
    type Args: for<'de> Deserialize<'de> + Send;

    /// Output type of the tool.
    type Output: Serialize + Send;

    /// Error type for tool execution.
    type Error: Into<ToolError> + Send;

    /// Get the name of the tool.
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Get the description of the tool.
    fn description(&self) -> String;

    /// Get the JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;

    /// Get the tool definition for LLM function calling.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters_schema())
    }

    /// Call the tool with JSON arguments and return JSON output.
    ///
    /// Accepts either an argument object or a JSON-encoded string of one.
    async fn call_json(&self, args: Value) -> Result<Value, ToolError>
    where
        Self::Output: 'static,
    {
        let typed_args: Self::Args = match &args {
            Value::String(s) => {
                serde_json::from_str(s).map_err(|e| ToolError::InvalidArguments(e.to_string()))?
            }
            _ => serde_json::from_value(args)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?,
        };

        let result = self.call(typed_args).await.map_err(Into::into)?;
        serde_json::to_value(result).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

/// A boxed dynamic tool that can be used in collections.
pub type BoxedTool = Box<dyn DynTool>;

/// Object-safe version of the Tool trait for dynamic dispatch.
#[async_trait]
pub trait DynTool: Send + Sync {
    /// Get the name of the tool.
    fn name(&self) -> &str;

    /// Get the description of the tool.
    fn description(&self) -> String;

    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Call the tool with JSON arguments.
    async fn call_json(&self, args: Value) -> Result<Value, ToolError>;
}

#[async_trait]
impl<T: Tool + 'static> DynTool for T
where
    T::Output: 'static,
{
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> String {
        Tool::description(self)
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        Tool::call_json(self, args).await
    }
}

/// An ordered collection of tools, keyed by name.
///
/// Insertion order is kept so definitions reach the model in a stable order.
/// Adding a tool whose name is already present replaces the earlier one in
/// place.
#[derive(Default)]
pub struct ToolBox {
    tools: Vec<BoxedTool>,
}

impl ToolBox {
    /// Create a new empty toolbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool to the toolbox.
    pub fn add<T: Tool + 'static>(&mut self, tool: T)
    where
        T::Output: 'static,
    {
        self.add_boxed(Box::new(tool));
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self
    where
        T::Output: 'static,
    {
        self.add(tool);
        self
    }

    /// Add a boxed tool to the toolbox.
    pub fn add_boxed(&mut self, tool: BoxedTool) {
        match self.position(tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tools.iter().position(|t| t.name() == name)
    }

    /// Get a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Get all tool definitions, in insertion order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Get the names of all tools, in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Check if the toolbox contains a tool with the given name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Get the number of tools in the toolbox.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the toolbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Call a tool by name with JSON arguments.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_owned()))?;
        tool.call_json(args).await
    }
}

impl fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBox")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_parameters() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "first_int": {"title": "First Int", "type": "integer"},
                "second_int": {"type": "integer", "description": "The multiplier"}
            },
            "required": ["first_int", "second_int"]
        })
    }

    mod tool_definition {
        use super::*;

        #[test]
        fn new_creates_definition() {
            let def = ToolDefinition::new(
                "multiply",
                "Multiply two integers together.",
                sample_parameters(),
            );
            assert_eq!(def.name(), "multiply");
            assert_eq!(def.description(), "Multiply two integers together.");
            assert!(def.strict.is_none());
        }

        #[test]
        fn with_strict_adds_additional_properties() {
            let def = ToolDefinition::new("t", "T", sample_parameters()).with_strict(true);
            assert!(def.is_strict());
            assert_eq!(
                def.parameters.get("additionalProperties"),
                Some(&Value::Bool(false))
            );
        }

        #[test]
        fn with_strict_false_leaves_schema_alone() {
            let def = ToolDefinition::new("t", "T", sample_parameters()).with_strict(false);
            assert!(!def.is_strict());
            assert!(def.parameters.get("additionalProperties").is_none());
        }

        #[test]
        fn with_strict_preserves_existing_additional_properties() {
            let params = serde_json::json!({"type": "object", "additionalProperties": true});
            let def = ToolDefinition::new("t", "T", params).with_strict(true);
            assert_eq!(
                def.parameters.get("additionalProperties"),
                Some(&Value::Bool(true))
            );
        }

        #[test]
        fn serializes_to_function_calling_shape() {
            let def = ToolDefinition::new("multiply", "Multiply", sample_parameters());
            let json = serde_json::to_value(&def).unwrap();
            assert_eq!(json["type"], "function");
            assert_eq!(json["function"]["name"], "multiply");
            assert_eq!(json["function"]["description"], "Multiply");
            assert!(json["function"]["parameters"].is_object());
            assert!(json["function"].get("strict").is_none());
        }

        #[test]
        fn serializes_strict_flag() {
            let def = ToolDefinition::new("t", "T", sample_parameters()).with_strict(true);
            let json = serde_json::to_value(&def).unwrap();
            assert_eq!(json["function"]["strict"], true);
        }

        #[test]
        fn args_uses_titles_and_falls_back() {
            let def = ToolDefinition::new("multiply", "Multiply", sample_parameters());
            let args = def.args();
            assert_eq!(args.len(), 2);
            assert_eq!(args["first_int"].title, "First Int");
            assert_eq!(args["first_int"].kind, "integer");
            assert!(args["first_int"].description.is_none());
            assert_eq!(args["second_int"].title, "Second Int");
            assert_eq!(args["second_int"].description.as_deref(), Some("The multiplier"));
        }

        #[test]
        fn args_of_untyped_property_is_object() {
            let params = serde_json::json!({"type": "object", "properties": {"payload": {}}});
            let def = ToolDefinition::new("t", "T", params);
            assert_eq!(def.args()["payload"].kind, "object");
        }

        #[test]
        fn args_of_nullable_property_reports_inner_type() {
            let params = serde_json::json!({
                "type": "object",
                "properties": {"limit": {"type": ["integer", "null"]}}
            });
            let def = ToolDefinition::new("t", "T", params);
            assert_eq!(def.args()["limit"].kind, "integer");
        }

        #[test]
        fn args_without_properties_is_empty() {
            let def = ToolDefinition::new("t", "T", serde_json::json!({"type": "object"}));
            assert!(def.args().is_empty());
        }

        #[test]
        fn required_lists_names() {
            let def = ToolDefinition::new("t", "T", sample_parameters());
            assert_eq!(def.required(), vec!["first_int", "second_int"]);
        }

        #[test]
        fn arg_spec_serializes_type_key() {
            let spec = ArgSpec {
                title: "Base".into(),
                kind: "integer".into(),
                description: None,
            };
            let json = serde_json::to_value(&spec).unwrap();
            assert_eq!(json, serde_json::json!({"title": "Base", "type": "integer"}));
        }
    }

    mod helpers {
        use super::*;

        #[test]
        fn title_case_splits_snake_case() {
            assert_eq!(title_case("first_int"), "First Int");
            assert_eq!(title_case("base"), "Base");
            assert_eq!(title_case("__x__y"), "X Y");
        }

        #[test]
        fn schema_for_drops_meta_key() {
            #[derive(JsonSchema)]
            #[allow(dead_code)]
            struct Pair {
                first_int: i64,
                second_int: i64,
            }

            let schema = schema_for::<Pair>();
            assert_eq!(schema["type"], "object");
            assert!(schema.get("$schema").is_none());
            assert_eq!(schema["required"], serde_json::json!(["first_int", "second_int"]));
            assert!(schema["properties"]["first_int"].is_object());
        }

        #[test]
        fn render_text_description_lists_tools() {
            let defs = vec![
                ToolDefinition::new(
                    "multiply",
                    "Multiply two integers together.",
                    sample_parameters(),
                ),
                ToolDefinition::new("noop", "Does nothing.", serde_json::json!({"type": "object"})),
            ];
            let text = render_text_description(&defs);
            assert_eq!(
                text,
                "multiply(first_int: integer, second_int: integer) - Multiply two integers together.\nnoop() - Does nothing."
            );
        }

        #[test]
        fn output_text_unquotes_strings() {
            assert_eq!(output_text(&serde_json::json!(92)), "92");
            assert_eq!(output_text(&serde_json::json!("done")), "done");
            assert_eq!(output_text(&serde_json::json!({"a": 1})), r#"{"a":1}"#);
        }
    }

    mod tool_box {
        use super::*;

        struct MockTool {
            name: &'static str,
            tag: i64,
        }

        #[async_trait]
        impl Tool for MockTool {
            const NAME: &'static str = "mock_tool";
            type Args = Value;
            type Output = Value;
            type Error = ToolError;

            fn name(&self) -> &'static str {
                self.name
            }

            fn description(&self) -> String {
                format!("Mock tool: {}", self.name)
            }

            fn parameters_schema(&self) -> Value {
                serde_json::json!({"type": "object"})
            }

            async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
                Ok(serde_json::json!({"received": args, "tag": self.tag}))
            }
        }

        fn mock(name: &'static str) -> MockTool {
            MockTool { name, tag: 0 }
        }

        #[test]
        fn new_creates_empty_toolbox() {
            let toolbox = ToolBox::new();
            assert!(toolbox.is_empty());
            assert_eq!(toolbox.len(), 0);
        }

        #[test]
        fn keeps_insertion_order() {
            let toolbox = ToolBox::new()
                .with(mock("multiply"))
                .with(mock("add"))
                .with(mock("exponentiate"));
            assert_eq!(toolbox.names(), vec!["multiply", "add", "exponentiate"]);
            let defs = toolbox.definitions();
            assert_eq!(defs[2].name, "exponentiate");
        }

        #[tokio::test]
        async fn duplicate_replaces_in_place() {
            let mut toolbox = ToolBox::new().with(mock("a")).with(mock("b"));
            toolbox.add(MockTool { name: "a", tag: 7 });
            assert_eq!(toolbox.len(), 2);
            assert_eq!(toolbox.names(), vec!["a", "b"]);
            let out = toolbox.call("a", serde_json::json!({})).await.unwrap();
            assert_eq!(out["tag"], 7);
        }

        #[test]
        fn get_and_contains() {
            let toolbox = ToolBox::new().with(mock("my_tool"));
            assert!(toolbox.contains("my_tool"));
            assert!(!toolbox.contains("other"));
            assert_eq!(toolbox.get("my_tool").unwrap().name(), "my_tool");
            assert!(toolbox.get("other").is_none());
        }

        #[tokio::test]
        async fn call_unknown_tool_is_not_found() {
            let toolbox = ToolBox::new();
            let err = toolbox.call("missing", serde_json::json!({})).await.unwrap_err();
            assert_eq!(err, ToolError::NotFound("missing".into()));
        }

        #[test]
        fn debug_lists_names() {
            let toolbox = ToolBox::new().with(mock("a"));
            assert!(format!("{toolbox:?}").contains("\"a\""));
        }
    }

    mod typed_tool {
        use super::*;

        struct Divide;

        #[derive(Deserialize)]
        struct DivideArgs {
            a: i64,
            b: i64,
        }

        #[async_trait]
        impl Tool for Divide {
            const NAME: &'static str = "divide";
            type Args = DivideArgs;
            type Output = i64;
            type Error = ToolError;

            fn description(&self) -> String {
                "Integer division".to_owned()
            }

            fn parameters_schema(&self) -> Value {
                serde_json::json!({
                    "type": "object",
                    "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                    "required": ["a", "b"]
                })
            }

            async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
                args.a
                    .checked_div(args.b)
                    .ok_or_else(|| ToolError::execution("division by zero"))
            }
        }

        #[tokio::test]
        async fn call_json_with_object() {
            let out = Tool::call_json(&Divide, serde_json::json!({"a": 9, "b": 3})).await.unwrap();
            assert_eq!(out, serde_json::json!(3));
        }

        #[tokio::test]
        async fn call_json_with_string() {
            let out = Tool::call_json(&Divide, Value::String(r#"{"a": 8, "b": 2}"#.into()))
                .await
                .unwrap();
            assert_eq!(out, serde_json::json!(4));
        }

        #[tokio::test]
        async fn call_json_missing_field_is_invalid_arguments() {
            let err = Tool::call_json(&Divide, serde_json::json!({"a": 1})).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }

        #[tokio::test]
        async fn call_json_propagates_execution_error() {
            let err = Tool::call_json(&Divide, serde_json::json!({"a": 1, "b": 0}))
                .await
                .unwrap_err();
            assert_eq!(err, ToolError::Execution("division by zero".into()));
        }

        #[test]
        fn definition_uses_trait_methods() {
            let def = Tool::definition(&Divide);
            assert_eq!(def.name, "divide");
            assert_eq!(def.description, "Integer division");
            assert_eq!(def.required(), vec!["a", "b"]);
        }
    }
}
