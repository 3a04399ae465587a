//! Tool macro implementation.
//!
//! Turns a function into a `Tool` implementation:
//! - metadata comes from the doc comment unless the attribute overrides it
//! - each parameter becomes a titled JSON Schema property
//! - the signature is validated at compile time

use convert_case::{Case, Casing};
use darling::{FromMeta, ast::NestedMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use std::collections::HashMap;
use syn::{
    Attribute, Expr, ExprLit, FnArg, GenericArgument, Ident, ItemFn, Lit, Meta, Pat,
    PathArguments, ReturnType, Type, parse_macro_input,
};

/// JSON Schema type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonSchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl JsonSchemaType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }

    fn from_type_name(name: &str) -> Self {
        match name {
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => Self::Integer,
            "f32" | "f64" => Self::Number,
            "String" | "str" | "Cow" => Self::String,
            "bool" => Self::Boolean,
            "Vec" | "HashSet" | "BTreeSet" => Self::Array,
            _ => Self::Object,
        }
    }
}

/// Schema information extracted from a Rust type.
#[derive(Debug, Clone)]
struct TypeInfo {
    schema_type: JsonSchemaType,
    /// `Option<T>`
    nullable: bool,
    /// Element type of sequences.
    inner: Option<Box<TypeInfo>>,
}

impl TypeInfo {
    fn from_type(ty: &Type) -> Self {
        match ty {
            Type::Path(type_path) => {
                let Some(segment) = type_path.path.segments.last() else {
                    return Self::of(JsonSchemaType::Object);
                };
                let type_name = segment.ident.to_string();

                match type_name.as_str() {
                    "Option" => {
                        let mut info = Self::generic_arg(segment)
                            .map_or_else(|| Self::of(JsonSchemaType::Object), Self::from_type);
                        info.nullable = true;
                        info
                    }
                    "Vec" | "HashSet" | "BTreeSet" => Self {
                        schema_type: JsonSchemaType::Array,
                        nullable: false,
                        inner: Self::generic_arg(segment).map(|ty| Box::new(Self::from_type(ty))),
                    },
                    "HashMap" | "BTreeMap" => Self::of(JsonSchemaType::Object),
                    _ => Self::of(JsonSchemaType::from_type_name(&type_name)),
                }
            }
            Type::Reference(type_ref) => Self::from_type(&type_ref.elem),
            Type::Tuple(tuple) if tuple.elems.is_empty() => Self::of(JsonSchemaType::Null),
            _ => Self::of(JsonSchemaType::Object),
        }
    }

    const fn of(schema_type: JsonSchemaType) -> Self {
        Self {
            schema_type,
            nullable: false,
            inner: None,
        }
    }

    fn generic_arg(segment: &syn::PathSegment) -> Option<&Type> {
        let PathArguments::AngleBracketed(args) = &segment.arguments else {
            return None;
        };
        match args.args.first() {
            Some(GenericArgument::Type(ty)) => Some(ty),
            _ => None,
        }
    }

    /// Key/value tokens for the `json!` object describing this type.
    fn to_schema_tokens(&self) -> TokenStream2 {
        let type_str = self.schema_type.as_str();
        let items = self.inner.as_ref().map(|inner| {
            let inner_schema = inner.to_schema_tokens();
            quote! { , "items": { #inner_schema } }
        });
        let nullable = self.nullable.then(|| quote! { , "nullable": true });
        quote! { "type": #type_str #items #nullable }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DocSection {
    #[default]
    Description,
    Arguments,
    Other,
}

/// Documentation parsed from doc comments.
#[derive(Debug, Default)]
struct DocInfo {
    description: String,
    param_descriptions: HashMap<String, String>,
}

impl DocInfo {
    fn from_attrs(attrs: &[Attribute]) -> Self {
        let doc_lines: Vec<String> = attrs
            .iter()
            .filter(|attr| attr.path().is_ident("doc"))
            .filter_map(|attr| match &attr.meta {
                Meta::NameValue(meta) => match &meta.value {
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(s), ..
                    }) => Some(s.value()),
                    _ => None,
                },
                _ => None,
            })
            .collect();

        let mut info = Self::default();
        let mut section = DocSection::default();
        let mut current_param: Option<String> = None;
        let mut description_lines = Vec::new();

        for line in &doc_lines {
            let trimmed = line.trim();

            if let Some(new_section) = Self::detect_section(trimmed) {
                section = new_section;
                current_param = None;
                continue;
            }

            match section {
                DocSection::Description => description_lines.push(trimmed.to_owned()),
                DocSection::Arguments => {
                    if let Some((name, desc)) = Self::parse_param_line(trimmed) {
                        info.param_descriptions.insert(name.clone(), desc);
                        current_param = Some(name);
                    } else if let Some(param) = &current_param
                        && !trimmed.is_empty()
                        && let Some(desc) = info.param_descriptions.get_mut(param)
                    {
                        desc.push(' ');
                        desc.push_str(trimmed);
                    }
                }
                DocSection::Other => {}
            }
        }

        info.description = description_lines
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        info
    }

    fn detect_section(line: &str) -> Option<DocSection> {
        if line.starts_with("# Arguments") || line.starts_with("# Args") {
            Some(DocSection::Arguments)
        } else if line.starts_with("# ") {
            Some(DocSection::Other)
        } else {
            None
        }
    }

    /// Parse `* `param_name` - Description`.
    fn parse_param_line(line: &str) -> Option<(String, String)> {
        let rest = line.strip_prefix("* `")?;
        let end_pos = rest.find('`')?;
        let param_name = rest[..end_pos].to_owned();
        let desc = rest[end_pos + 1..]
            .trim_start_matches(" - ")
            .trim()
            .to_owned();
        Some((param_name, desc))
    }
}

/// Arguments of the `#[tool(...)]` attribute.
#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct ToolArgs {
    /// Tool description (overrides the doc comment).
    description: Option<String>,
    /// Parameter descriptions as key-value pairs.
    params: ParamDescriptions,
    /// Optional parameters that should still be listed as required.
    #[darling(multiple)]
    required: Vec<String>,
}

#[derive(Debug, Default)]
struct ParamDescriptions(HashMap<String, String>);

impl FromMeta for ParamDescriptions {
    fn from_list(items: &[NestedMeta]) -> darling::Result<Self> {
        let mut map = HashMap::new();
        for item in items {
            let NestedMeta::Meta(Meta::NameValue(nv)) = item else {
                return Err(darling::Error::custom("expected `name = \"description\"`")
                    .with_span(item));
            };
            let (Some(ident), Expr::Lit(ExprLit { lit: Lit::Str(s), .. })) =
                (nv.path.get_ident(), &nv.value)
            else {
                return Err(darling::Error::custom("expected `name = \"description\"`")
                    .with_span(nv));
            };
            map.insert(ident.to_string(), s.value());
        }
        Ok(Self(map))
    }
}

impl ToolArgs {
    fn from_args(args: TokenStream) -> darling::Result<Self> {
        let attr_args = NestedMeta::parse_meta_list(args.into())?;
        Self::from_list(&attr_args)
    }
}

/// Rust keywords that cannot be used as parameter names.
const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn",
];

fn validate_tool_function(input_fn: &ItemFn) -> syn::Result<()> {
    let fn_name = &input_fn.sig.ident;

    match &input_fn.sig.output {
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                fn_name,
                "tool function must return Result<T, E>",
            ));
        }
        ReturnType::Type(_, ty) => {
            if result_types(ty).is_none() {
                return Err(syn::Error::new_spanned(
                    ty,
                    "tool function must return Result<T, E>",
                ));
            }
        }
    }

    for arg in &input_fn.sig.inputs {
        match arg {
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "tool functions cannot take `self`",
                ));
            }
            FnArg::Typed(pat_type) => {
                let Pat::Ident(ident) = &*pat_type.pat else {
                    return Err(syn::Error::new_spanned(
                        &pat_type.pat,
                        "tool parameters must be plain identifiers",
                    ));
                };
                let name = ident.ident.to_string();
                if RUST_KEYWORDS.contains(&name.as_str()) {
                    return Err(syn::Error::new_spanned(
                        &ident.ident,
                        format!("parameter name '{name}' is a Rust keyword"),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Output and error types of `Result<T, E>`.
fn result_types(ty: &Type) -> Option<(&GenericArgument, &GenericArgument)> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let mut iter = args.args.iter();
    match (iter.next(), iter.next(), iter.next()) {
        (Some(output), Some(error), None) => Some((output, error)),
        _ => None,
    }
}

struct ParamInfo {
    name: Ident,
    ty: Type,
    title: String,
    description: Option<String>,
    is_required: bool,
    type_info: TypeInfo,
}

impl ParamInfo {
    fn from_fn_arg(arg: &FnArg, macro_args: &ToolArgs, doc_info: &DocInfo) -> Option<Self> {
        let FnArg::Typed(pat_type) = arg else {
            return None;
        };
        let Pat::Ident(pat_ident) = &*pat_type.pat else {
            return None;
        };

        let name = pat_ident.ident.clone();
        let name_str = name.to_string();
        let ty = (*pat_type.ty).clone();
        let type_info = TypeInfo::from_type(&ty);

        let description = macro_args
            .params
            .0
            .get(&name_str)
            .or_else(|| doc_info.param_descriptions.get(&name_str))
            .cloned();

        let is_required = !type_info.nullable || macro_args.required.contains(&name_str);

        Some(Self {
            title: name_str.to_case(Case::Title),
            name,
            ty,
            description,
            is_required,
            type_info,
        })
    }

    /// Key/value tokens of this parameter's property schema.
    fn schema_tokens(&self) -> TokenStream2 {
        let title = &self.title;
        let type_schema = self.type_info.to_schema_tokens();
        let description = self
            .description
            .as_ref()
            .map(|desc| quote! { , "description": #desc });
        quote! { "title": #title, #type_schema #description }
    }

    fn field_doc(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.title.clone())
    }
}

pub fn tool_impl(args: TokenStream, input: TokenStream) -> TokenStream {
    let macro_args = match ToolArgs::from_args(args) {
        Ok(args) => args,
        Err(err) => return TokenStream::from(err.write_errors()),
    };
    let input_fn = parse_macro_input!(input as ItemFn);

    if let Err(err) = validate_tool_function(&input_fn) {
        return err.to_compile_error().into();
    }

    let fn_name = &input_fn.sig.ident;
    let fn_name_str = fn_name.to_string();
    let is_async = input_fn.sig.asyncness.is_some();
    let fn_visibility = &input_fn.vis;

    let doc_info = DocInfo::from_attrs(&input_fn.attrs);

    let params: Vec<ParamInfo> = input_fn
        .sig
        .inputs
        .iter()
        .filter_map(|arg| ParamInfo::from_fn_arg(arg, &macro_args, &doc_info))
        .collect();

    let (output_type, error_type) = match &input_fn.sig.output {
        ReturnType::Type(_, ty) => match result_types(ty) {
            Some((output, error)) => (quote!(#output), quote!(#error)),
            None => return TokenStream::new(),
        },
        ReturnType::Default => return TokenStream::new(),
    };

    let struct_name = format_ident!("{}", fn_name_str.to_case(Case::Pascal));
    let params_struct_name = format_ident!("{}Args", struct_name);
    let static_name = format_ident!("{}", fn_name_str.to_uppercase());

    let tool_description = macro_args.description.clone().unwrap_or_else(|| {
        if doc_info.description.is_empty() {
            format!("Tool function: {fn_name_str}")
        } else {
            doc_info.description.clone()
        }
    });

    let param_names: Vec<_> = params.iter().map(|p| &p.name).collect();
    let param_types: Vec<_> = params.iter().map(|p| &p.ty).collect();
    let field_docs: Vec<_> = params.iter().map(ParamInfo::field_doc).collect();
    let property_schemas: Vec<_> = params.iter().map(ParamInfo::schema_tokens).collect();
    let required_params: Vec<_> = params
        .iter()
        .filter(|p| p.is_required)
        .map(|p| p.name.to_string())
        .collect();

    let await_call = is_async.then(|| quote!(.await));
    let args_doc = format!("Arguments of the `{fn_name_str}` tool.");

    let expanded = quote! {
        #[derive(Debug, Clone, ::toolbelt::__private::serde::Deserialize, ::toolbelt::__private::serde::Serialize)]
        #[serde(crate = "::toolbelt::__private::serde")]
        #[doc = #args_doc]
        #fn_visibility struct #params_struct_name {
            #(
                #[doc = #field_docs]
                pub #param_names: #param_types,
            )*
        }

        #input_fn

        #[doc = #tool_description]
        #[derive(Debug, Clone, Copy, Default)]
        #fn_visibility struct #struct_name;

        #[::toolbelt::__private::async_trait]
        impl ::toolbelt::tool::Tool for #struct_name {
            const NAME: &'static str = #fn_name_str;

            type Args = #params_struct_name;
            type Output = #output_type;
            type Error = #error_type;

            fn description(&self) -> ::std::string::String {
                ::std::string::String::from(#tool_description)
            }

            fn parameters_schema(&self) -> ::toolbelt::__private::serde_json::Value {
                ::toolbelt::__private::serde_json::json!({
                    "type": "object",
                    "properties": {
                        #(
                            stringify!(#param_names): { #property_schemas }
                        ),*
                    },
                    "required": [#(#required_params),*]
                })
            }

            async fn call(
                &self,
                args: Self::Args,
            ) -> ::std::result::Result<Self::Output, Self::Error> {
                #fn_name(#(args.#param_names,)*) #await_call
            }
        }

        #[doc = #tool_description]
        #fn_visibility static #static_name: #struct_name = #struct_name;
    };

    TokenStream::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    mod doc_info {
        use super::*;

        #[test]
        fn description_joins_leading_lines() {
            let item: ItemFn = parse_quote! {
                /// Multiply two integers
                /// together.
                fn multiply(first_int: i64, second_int: i64) -> Result<i64, E> { todo!() }
            };
            let info = DocInfo::from_attrs(&item.attrs);
            assert_eq!(info.description, "Multiply two integers together.");
            assert!(info.param_descriptions.is_empty());
        }

        #[test]
        fn arguments_section_is_parsed() {
            let item: ItemFn = parse_quote! {
                /// Raise a number to a power.
                ///
                /// # Arguments
                ///
                /// * `base` - The base
                /// * `exponent` - The power,
                ///   must not be negative
                ///
                /// # Errors
                ///
                /// Fails on overflow.
                fn exponentiate(base: i64, exponent: i64) -> Result<i64, E> { todo!() }
            };
            let info = DocInfo::from_attrs(&item.attrs);
            assert_eq!(info.description, "Raise a number to a power.");
            assert_eq!(info.param_descriptions["base"], "The base");
            assert_eq!(
                info.param_descriptions["exponent"],
                "The power, must not be negative"
            );
        }
    }

    mod type_info {
        use super::*;

        #[test]
        fn maps_primitives() {
            let ty: Type = parse_quote!(i64);
            assert_eq!(TypeInfo::from_type(&ty).schema_type, JsonSchemaType::Integer);
            let ty: Type = parse_quote!(&str);
            assert_eq!(TypeInfo::from_type(&ty).schema_type, JsonSchemaType::String);
            let ty: Type = parse_quote!(f64);
            assert_eq!(TypeInfo::from_type(&ty).schema_type, JsonSchemaType::Number);
        }

        #[test]
        fn option_is_nullable() {
            let ty: Type = parse_quote!(Option<u32>);
            let info = TypeInfo::from_type(&ty);
            assert!(info.nullable);
            assert_eq!(info.schema_type, JsonSchemaType::Integer);
        }

        #[test]
        fn vec_has_items() {
            let ty: Type = parse_quote!(Vec<String>);
            let info = TypeInfo::from_type(&ty);
            assert_eq!(info.schema_type, JsonSchemaType::Array);
            assert_eq!(
                info.inner.map(|i| i.schema_type),
                Some(JsonSchemaType::String)
            );
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn requires_result_return() {
            let item: ItemFn = parse_quote! { fn add(a: i64) -> i64 { a } };
            assert!(validate_tool_function(&item).is_err());
            let item: ItemFn = parse_quote! { fn add(a: i64) { } };
            assert!(validate_tool_function(&item).is_err());
        }

        #[test]
        fn accepts_result_return() {
            let item: ItemFn = parse_quote! { fn add(a: i64) -> Result<i64, E> { Ok(a) } };
            assert!(validate_tool_function(&item).is_ok());
        }

        #[test]
        fn rejects_self_receiver() {
            let item: ItemFn = parse_quote! { fn f(&self, a: i64) -> Result<i64, E> { Ok(a) } };
            assert!(validate_tool_function(&item).is_err());
        }

        #[test]
        fn result_types_needs_two_arguments() {
            let ty: Type = parse_quote!(Result<i64>);
            assert!(result_types(&ty).is_none());
            let ty: Type = parse_quote!(std::result::Result<i64, ToolError>);
            assert!(result_types(&ty).is_some());
        }
    }

    #[test]
    fn title_case_of_parameter() {
        assert_eq!("first_int".to_case(Case::Title), "First Int");
        assert_eq!("exponent".to_case(Case::Title), "Exponent");
    }
}
