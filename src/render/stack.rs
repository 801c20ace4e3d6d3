//! The stack of variable scopes used during rendering.

use crate::value::{Map, Value};

/// A stack of name → value scopes, seeded with `.` and `$` bound to the
/// context. Only the innermost scope is ever mutated by a declaration;
/// lookups scan from innermost to outermost.
pub struct Stack {
    scopes: Vec<Map<String, Value>>,
}

impl Stack {
    pub fn new(ctx: Value) -> Self {
        let mut scope = Map::new();
        scope.insert(String::from("."), ctx.clone());
        scope.insert(String::from("$"), ctx);
        Self {
            scopes: vec![scope],
        }
    }

    /// Push an isolated scope copying only `.` and `$` from the enclosing
    /// scopes. Declarations made inside are dropped on pop and shadow
    /// rather than overwrite outer bindings.
    pub fn push_isolated(&mut self) {
        let mut scope = Map::new();
        scope.insert(String::from("."), self.get("."));
        scope.insert(String::from("$"), self.get("$"));
        self.scopes.push(scope);
    }

    pub fn push(&mut self, scope: Map<String, Value>) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Bind a variable in the innermost scope.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(String::from(name), value);
        }
    }

    /// Look up a variable, innermost scope first, falling back to nil.
    pub fn get(&self, name: &str) -> Value {
        self.get_or(name, Value::None)
    }

    pub fn get_or(&self, name: &str, fallback: Value) -> Value {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return value.clone();
            }
        }
        fallback
    }
}
