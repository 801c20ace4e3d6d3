//! A tree-walking renderer that evaluates an AST against a context value.
//!
//! The renderer holds a stack of lexical variable scopes and the registry
//! of `define`d templates. It is constructed fresh for every render call
//! and never reused; the AST itself is read-only and may be shared across
//! calls.

mod stack;

use crate::builtins;
use crate::render::stack::Stack;
use crate::types::ast;
use crate::value::{Map, Value};
use crate::{Error, Result};

/// Render a template AST using a context [`Value`].
pub fn render_from(tree: &ast::List, ctx: Value) -> Result<String> {
    Renderer::new(tree, ctx)?.render()
}

/// Render a template AST using any serializable context.
#[cfg(feature = "serde")]
pub fn render<S>(tree: &ast::List, ctx: S) -> Result<String>
where
    S: serde::Serialize,
{
    render_from(tree, crate::to_value(ctx)?)
}

struct Renderer<'render> {
    root: &'render ast::List,

    /// The stack of variable scopes.
    stack: Stack,

    /// Registry of defined templates, built by a pre-pass over the tree.
    templates: Map<&'render str, &'render ast::List>,
}

impl<'render> Renderer<'render> {
    fn new(root: &'render ast::List, ctx: Value) -> Result<Self> {
        let templates = collect_templates(root)?;
        Ok(Self {
            root,
            stack: Stack::new(ctx),
            templates,
        })
    }

    fn render(&mut self) -> Result<String> {
        let root = self.root;
        let mut buf = String::new();
        self.render_list(&mut buf, root)?;
        Ok(buf)
    }

    fn render_list(&mut self, buf: &mut String, list: &'render ast::List) -> Result<()> {
        for node in &list.nodes {
            self.render_node(buf, node)?;
        }
        Ok(())
    }

    fn render_node(&mut self, buf: &mut String, node: &'render ast::Node) -> Result<()> {
        match node {
            ast::Node::Text(text) => {
                buf.push_str(&text.text);
                Ok(())
            }
            ast::Node::Branch(branch) => match branch.kind {
                ast::BranchKind::If => self.render_if(buf, branch),
                ast::BranchKind::With => self.render_with(buf, branch),
                ast::BranchKind::Range => self.render_range(buf, branch),
            },
            ast::Node::Action(action) => {
                // A pipe containing a declaration is still evaluated for
                // its binding but produces no output.
                let value = self.eval_pipe(&action.pipe)?;
                if action.pipe.declarations.is_empty() {
                    buf.push_str(&value.to_string());
                }
                Ok(())
            }
            ast::Node::Template(node) => self.render_template(buf, node),
            _ => Ok(()),
        }
    }

    fn render_if(&mut self, buf: &mut String, branch: &'render ast::Branch) -> Result<()> {
        let condition = self.eval_pipe(&branch.pipe)?;
        if condition.is_true() {
            self.stack.push_isolated();
            let result = self.render_list(buf, &branch.list);
            self.stack.pop();
            result
        } else if let Some(else_list) = &branch.else_list {
            self.stack.push_isolated();
            let result = self.render_list(buf, else_list);
            self.stack.pop();
            result
        } else {
            Ok(())
        }
    }

    fn render_with(&mut self, buf: &mut String, branch: &'render ast::Branch) -> Result<()> {
        let value = self.eval_pipe(&branch.pipe)?;
        if value.is_true() {
            // Rebind dot to the pipe value; `$` keeps its first-set
            // binding from the enclosing scopes.
            let mut scope = Map::new();
            scope.insert(String::from("$"), self.stack.get_or("$", value.clone()));
            scope.insert(String::from("."), value);
            self.stack.push(scope);
            let result = self.render_list(buf, &branch.list);
            self.stack.pop();
            result
        } else if let Some(else_list) = &branch.else_list {
            self.stack.push_isolated();
            let result = self.render_list(buf, else_list);
            self.stack.pop();
            result
        } else {
            Ok(())
        }
    }

    fn render_range(&mut self, buf: &mut String, branch: &'render ast::Branch) -> Result<()> {
        let target = self.eval_pipe(&branch.pipe)?;
        match target {
            Value::List(items) => {
                if items.is_empty() {
                    return self.render_range_else(buf, branch);
                }
                for (i, item) in items.into_iter().enumerate() {
                    self.bind_loop_vars(branch, Value::Number(i as f64), &item);
                    let mut scope = Map::new();
                    scope.insert(String::from("$"), self.stack.get_or("$", item.clone()));
                    scope.insert(String::from("$index"), Value::Number(i as f64));
                    scope.insert(String::from("."), item);
                    self.stack.push(scope);
                    let result = self.render_list(buf, &branch.list);
                    self.stack.pop();
                    result?;
                }
                Ok(())
            }
            Value::Map(map) => {
                if map.is_empty() {
                    return self.render_range_else(buf, branch);
                }
                for (key, value) in map {
                    self.bind_loop_vars(branch, Value::String(key.clone()), &value);
                    let mut scope = Map::new();
                    scope.insert(String::from("$"), self.stack.get_or("$", value.clone()));
                    scope.insert(String::from("$key"), Value::String(key));
                    scope.insert(String::from("."), value);
                    self.stack.push(scope);
                    let result = self.render_list(buf, &branch.list);
                    self.stack.pop();
                    result?;
                }
                Ok(())
            }
            // A non-iterable target is not an error.
            _ => self.render_range_else(buf, branch),
        }
    }

    /// Bind the declared loop variables for one iteration: one variable
    /// binds the element, two bind the index/key and the element.
    fn bind_loop_vars(&mut self, branch: &ast::Branch, key: Value, item: &Value) {
        match branch.pipe.declarations.as_slice() {
            [first, second] => {
                self.stack.set(&first.name, key);
                self.stack.set(&second.name, item.clone());
            }
            [first] => {
                self.stack.set(&first.name, item.clone());
            }
            _ => {}
        }
    }

    fn render_range_else(&mut self, buf: &mut String, branch: &'render ast::Branch) -> Result<()> {
        match &branch.else_list {
            Some(else_list) => self.render_list(buf, else_list),
            None => Ok(()),
        }
    }

    fn eval_pipe(&mut self, pipe: &'render ast::Pipe) -> Result<Value> {
        // Commands execute left to right, each receiving the previous
        // command's value as an implicit final argument.
        let mut current = Value::None;
        let mut first = true;
        for command in &pipe.commands {
            let previous = if first { None } else { Some(current.clone()) };
            current = self.eval_command(command, previous)?;
            first = false;
        }

        // Exactly one declared variable binds the pipe's value into the
        // innermost scope; two are handled per-iteration by `range`.
        if pipe.declarations.len() == 1 {
            self.stack.set(&pipe.declarations[0].name, current.clone());
        }
        Ok(current)
    }

    fn eval_command(
        &mut self,
        command: &'render ast::Command,
        previous: Option<Value>,
    ) -> Result<Value> {
        let first = match command.args.first() {
            Some(node) => node,
            None => return Ok(Value::None),
        };

        // A builtin invocation, with pipe chaining.
        if let ast::Node::Identifier(ident) = first {
            if let Some(f) = builtins::find(&ident.name) {
                let mut args = Vec::with_capacity(command.args.len());
                for node in &command.args[1..] {
                    args.push(self.eval_arg(node)?);
                }
                if let Some(previous) = previous {
                    args.push(previous);
                }
                return f(&args);
            }
        }

        // Not a builtin: evaluate the arguments in order and yield the
        // last value; chaining does not apply.
        let mut value = Value::None;
        for node in &command.args {
            value = self.eval_arg(node)?;
        }
        Ok(value)
    }

    fn eval_arg(&mut self, node: &'render ast::Node) -> Result<Value> {
        match node {
            // An unknown identifier evaluates to its own name.
            ast::Node::Identifier(ident) => Ok(self
                .stack
                .get_or(&ident.name, Value::String(ident.name.clone()))),
            ast::Node::Variable(var) => Ok(self.stack.get(&var.name)),
            ast::Node::Dot(_) => Ok(self.stack.get(".")),
            ast::Node::Str(s) => Ok(Value::String(s.value.clone())),
            ast::Node::Number(n) => Ok(Value::Number(n.value)),
            ast::Node::Bool(b) => Ok(Value::Bool(b.value)),
            ast::Node::Nil(_) => Ok(Value::None),
            ast::Node::Chain(chain) => {
                let base = self.eval_arg(&chain.base)?;
                Ok(eval_fields(base, &chain.fields))
            }
            _ => Ok(Value::None),
        }
    }

    fn render_template(&mut self, buf: &mut String, node: &'render ast::Template) -> Result<()> {
        // Definitions produce no output; they only populate the registry.
        if node.keyword == ast::TemplateKeyword::Define {
            return Ok(());
        }

        // `template` must resolve from the registry; `block` prefers a
        // same-named define and falls back to its own inline body.
        let body = match node.keyword {
            ast::TemplateKeyword::Template => self.templates.get(node.name.as_str()).copied(),
            _ => self
                .templates
                .get(node.name.as_str())
                .copied()
                .or(node.list.as_ref()),
        };
        let body = match body {
            Some(body) => body,
            None => {
                return Err(Error::render(format!(
                    "template: no such template \"{}\"",
                    node.name
                )))
            }
        };

        // A non-empty pipe becomes the new dot for the invoked body,
        // otherwise the current dot is inherited.
        let dot = if node.pipe.commands.is_empty() {
            self.stack.get(".")
        } else {
            self.eval_pipe(&node.pipe)?
        };

        let mut scope = Map::new();
        scope.insert(String::from("$"), self.stack.get("$"));
        scope.insert(String::from("."), dot);
        self.stack.push(scope);
        let result = self.render_list(buf, body);
        self.stack.pop();
        result
    }
}

/// Walk a dotted field path from a receiver value. Any segment that is not
/// a map key yields nil.
fn eval_fields(receiver: Value, fields: &[String]) -> Value {
    let mut current = receiver;
    for name in fields {
        match current {
            Value::Map(mut map) => match map.remove(name) {
                Some(value) => current = value,
                None => return Value::None,
            },
            _ => return Value::None,
        }
    }
    current
}

/// Collect `define`d templates from the tree, walking lists and branch
/// bodies. Duplicate names fail here, before any output is produced.
fn collect_templates<'render>(
    root: &'render ast::List,
) -> Result<Map<&'render str, &'render ast::List>> {
    let mut templates = Map::new();
    let mut stack = vec![root];
    while let Some(list) = stack.pop() {
        for node in &list.nodes {
            match node {
                ast::Node::Template(t) if t.keyword == ast::TemplateKeyword::Define => {
                    if let Some(body) = &t.list {
                        if templates.insert(t.name.as_str(), body).is_some() {
                            return Err(Error::render(format!(
                                "template: duplicate define for {}",
                                t.name
                            )));
                        }
                    }
                }
                ast::Node::Branch(branch) => {
                    stack.push(&branch.list);
                    if let Some(else_list) = &branch.else_list {
                        stack.push(else_list);
                    }
                }
                _ => {}
            }
        }
    }
    Ok(templates)
}
