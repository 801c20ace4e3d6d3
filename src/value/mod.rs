//! Defines the [`Value`] enum, representing any renderable data.

mod from;
#[cfg(feature = "serde")]
mod ser;

pub use std::collections::btree_map;
pub use std::collections::BTreeMap as Map;
use std::fmt;
use std::fmt::Write;
use std::sync::Arc;
pub use std::vec::Vec as List;

#[cfg(feature = "serde")]
pub use crate::value::ser::to_value;
use crate::Result;

/// Data to be rendered represented as a recursive enum.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Number(f64),
    String(String),
    List(List<Value>),
    Map(Map<String, Value>),
    Func(Function),
}

/// A function value callable from within a template pipe via the `call`
/// builtin.
#[derive(Clone)]
pub struct Function(Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").finish_non_exhaustive()
    }
}

impl Value {
    /// Wrap a Rust function as a [`Value::Func`].
    ///
    /// ```
    /// use gotmpl::Value;
    ///
    /// let double = Value::from_fn(|args| match args {
    ///     [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
    ///     _ => Ok(Value::None),
    /// });
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Func(Function::new(f))
    }

    /// The truthiness of the value, as used by `if`, `with` and the
    /// `and`/`or`/`not` builtins: nil and empty/zero values are false,
    /// functions are always true.
    pub fn is_true(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(list) => !list.is_empty(),
            Self::Map(map) => !map.is_empty(),
            Self::Func(_) => true,
        }
    }

}

impl fmt::Display for Value {
    /// Formats the value the way action output renders it: bools and
    /// numbers literally, lists space-joined, maps as space-joined
    /// `key:value` pairs, nil as the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::List(list) => {
                for (i, value) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
            Self::Map(map) => {
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                Ok(())
            }
            Self::Func(_) => f.write_str("[function]"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(s), Self::Bool(o)) => s == o,
            (Self::Number(s), Self::Number(o)) => s == o,
            (Self::String(s), Self::String(o)) => s == o,
            (Self::List(s), Self::List(o)) => s == o,
            (Self::Map(s), Self::Map(o)) => s == o,
            _ => false,
        }
    }
}
