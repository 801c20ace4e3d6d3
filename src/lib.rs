//! A Go-style text template engine.
//!
//! # Syntax
//!
//! - Fields: `{{ .User.Name }}`
//! - Variables: `{{ $x := .Value }}{{ $x }}`
//! - Conditionals: `{{ if .Cond }} ... {{ else if .Other }} ... {{ else }} ... {{ end }}`
//! - Iteration: `{{ range $i, $v := .Items }} ... {{ else }} ... {{ end }}`
//! - Rebinding dot: `{{ with .User }} {{ .Name }} {{ end }}`
//! - Pipelines: `{{ .Name | printf "Hello, %s!" }}`
//! - Named templates: `{{ define "x" }} ... {{ end }}{{ template "x" . }}`
//! - Blocks with fallback bodies: `{{ block "x" . }} ... {{ end }}`
//! - Whitespace trimming: `{{- ... -}}`
//! - Comments: `{{ /* ... */ }}`
//!
//! # Getting started
//!
//! Compile a [`Template`] once and render it any number of times against a
//! serializable context.
//!
//! ```
//! #[derive(serde::Serialize)]
//! struct Context {
//!     #[serde(rename = "Name")]
//!     name: &'static str,
//! }
//!
//! let template = gotmpl::Template::compile("Hello, {{ .Name }}!")?;
//! let result = template.render(Context { name: "World" })?;
//! assert_eq!(result, "Hello, World!");
//! # Ok::<(), gotmpl::Error>(())
//! ```
//!
//! Without serde, contexts are built from [`Value`]'s `From` impls and
//! rendered with [`Template::render_from`].
//!
//! ```
//! use gotmpl::Value;
//!
//! let template = gotmpl::Template::compile("{{ range .Items }}{{ . }}-{{ end }}")?;
//! let ctx = Value::from([("Items", Value::from(["a", "b", "c"]))]);
//! assert_eq!(template.render_from(ctx)?, "a-b-c-");
//! # Ok::<(), gotmpl::Error>(())
//! ```
//!
//! # Stages
//!
//! The individual stages are also exposed: [`lex`] turns a source string
//! into tokens (lex errors are embedded in the stream, it never fails),
//! [`parse`]
//! builds the AST and [`render_from`] evaluates it.
//!
//! ```
//! let tokens = gotmpl::lex("{{ .Name }}");
//! let tree = gotmpl::parse(&tokens)?;
//! let out = gotmpl::render_from(&tree, gotmpl::Value::from([("Name", "Ada")]))?;
//! assert_eq!(out, "Ada");
//! # Ok::<(), gotmpl::Error>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod builtins;
mod compile;
mod error;
mod render;
mod types;
mod value;

pub use crate::compile::lex::{lex, Token, TokenKind};
pub use crate::compile::parse::parse;
pub use crate::error::{Error, ErrorKind, Result};
#[cfg(feature = "serde")]
pub use crate::render::render;
pub use crate::render::render_from;
pub use crate::types::ast;
#[cfg(feature = "serde")]
pub use crate::value::to_value;
pub use crate::value::{Function, Value};

/// A compiled template, ready to be rendered any number of times.
///
/// The parsed tree is immutable and may be shared between threads; every
/// render call constructs its own evaluation state.
#[derive(Debug, Clone)]
pub struct Template {
    tree: ast::List,
}

impl Template {
    /// Lex and parse a template source.
    pub fn compile(source: &str) -> Result<Self> {
        let tokens = lex(source);
        let tree = parse(&tokens)?;
        Ok(Self { tree })
    }

    /// Render the template using any serializable context.
    ///
    /// Rendering recurses with the template's nesting depth and has no
    /// built-in depth guard; pathologically nested templates are bounded
    /// by the call stack.
    #[cfg(feature = "serde")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        render(&self.tree, ctx)
    }

    /// Render the template using a context built from [`Value`]'s `From`
    /// impls.
    pub fn render_from(&self, ctx: Value) -> Result<String> {
        render_from(&self.tree, ctx)
    }

    /// Returns the parsed syntax tree.
    pub fn tree(&self) -> &ast::List {
        &self.tree
    }
}

/// Compile and render a template in one call.
///
/// ```
/// #[derive(serde::Serialize)]
/// struct Context {
///     #[serde(rename = "Items")]
///     items: Vec<&'static str>,
/// }
///
/// let ctx = Context { items: vec!["x", "y"] };
/// let out = gotmpl::render_str("{{ range .Items }}{{ . }};{{ end }}", ctx)?;
/// assert_eq!(out, "x;y;");
/// # Ok::<(), gotmpl::Error>(())
/// ```
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub fn render_str<S>(source: &str, ctx: S) -> Result<String>
where
    S: serde::Serialize,
{
    Template::compile(source)?.render(ctx)
}
