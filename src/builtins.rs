//! The builtin functions callable from within a template pipe.
//!
//! The table is closed: templates cannot register new functions. Every
//! builtin has the uniform signature `fn(&[Value]) -> Result<Value>`; when
//! a command is chained through `|` the previous command's value arrives as
//! the final argument.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::value::Value;
use crate::{Error, Result};

/// The signature shared by all builtin functions.
pub type BuiltinFn = fn(&[Value]) -> Result<Value>;

/// Look up a builtin by name.
pub fn find(name: &str) -> Option<BuiltinFn> {
    let f: BuiltinFn = match name {
        "len" => len,
        "eq" => eq,
        "ne" => ne,
        "lt" => lt,
        "gt" => gt,
        "le" => le,
        "ge" => ge,
        "and" => and,
        "or" => or,
        "not" => not,
        "print" => print,
        "println" => println,
        "urlquery" => urlquery,
        "index" => index,
        "html" => html,
        "js" => js,
        "call" => call,
        "slice" => slice,
        "printf" => printf,
        _ => return None,
    };
    Some(f)
}

/// Returns the length of a string, list or map.
///
/// ```text
/// {{ len "hello" }}   5
/// {{ len .Items }}    the number of elements
/// ```
pub fn len(args: &[Value]) -> Result<Value> {
    let value = args.first().unwrap_or(&Value::None);
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::List(list) => list.len(),
        Value::Map(map) => map.len(),
        value => {
            return Err(Error::render(format!(
                "len: unsupported type \"{value}\""
            )))
        }
    };
    Ok(Value::Number(len as f64))
}

/// Shallow equality: true if every value equals the first, comparing by
/// kind then value. Nil equals only nil; lists, maps and functions never
/// compare equal.
pub fn eq(args: &[Value]) -> Result<Value> {
    let (first, rest) = match args {
        [first, rest @ ..] if !rest.is_empty() => (first, rest),
        _ => return Err(Error::render("eq: need at least two arguments")),
    };
    for value in rest {
        let equal = match (first, value) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        };
        if !equal {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// Shallow inequality, the negation of [`eq`].
pub fn ne(args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::render("ne: need at least two arguments"));
    }
    let equal = eq(args)?.is_true();
    Ok(Value::Bool(!equal))
}

/// Less-than comparison. Both operands must be numbers.
pub fn lt(args: &[Value]) -> Result<Value> {
    let (a, b) = numbers("lt", args)?;
    Ok(Value::Bool(a < b))
}

/// Greater-than comparison. Both operands must be numbers.
pub fn gt(args: &[Value]) -> Result<Value> {
    let (a, b) = numbers("gt", args)?;
    Ok(Value::Bool(a > b))
}

/// Less-than-or-equal comparison. Both operands must be numbers.
pub fn le(args: &[Value]) -> Result<Value> {
    let (a, b) = numbers("le", args)?;
    Ok(Value::Bool(a <= b))
}

/// Greater-than-or-equal comparison. Both operands must be numbers.
pub fn ge(args: &[Value]) -> Result<Value> {
    let (a, b) = numbers("ge", args)?;
    Ok(Value::Bool(a >= b))
}

fn numbers(name: &str, args: &[Value]) -> Result<(f64, f64)> {
    match args {
        [Value::Number(a), Value::Number(b), ..] => Ok((*a, *b)),
        _ => Err(Error::render(format!("{name}: operands must be numbers"))),
    }
}

/// Logical AND of the truthiness of all values.
pub fn and(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(args.iter().all(Value::is_true)))
}

/// Logical OR of the truthiness of all values.
pub fn or(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(args.iter().any(Value::is_true)))
}

/// Logical NOT of the truthiness of the value.
pub fn not(args: &[Value]) -> Result<Value> {
    let value = args.first().unwrap_or(&Value::None);
    Ok(Value::Bool(!value.is_true()))
}

/// Concatenates the string forms of all values.
pub fn print(args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for value in args {
        out.push_str(&value.to_string());
    }
    Ok(Value::String(out))
}

/// Like [`print`] with a trailing newline.
pub fn println(args: &[Value]) -> Result<Value> {
    let mut out = match print(args)? {
        Value::String(s) => s,
        _ => String::new(),
    };
    out.push('\n');
    Ok(Value::String(out))
}

/// The characters escaped by [`urlquery`]: everything outside the
/// unreserved set that `encodeURIComponent` keeps verbatim.
const URL_QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URL-encodes the string form of the value.
///
/// ```text
/// {{ urlquery "Hello World!" }}   Hello%20World!
/// ```
pub fn urlquery(args: &[Value]) -> Result<Value> {
    let value = args.first().unwrap_or(&Value::None);
    let encoded = utf8_percent_encode(&value.to_string(), URL_QUERY).to_string();
    Ok(Value::String(encoded))
}

/// Retrieves an element from a list or map by key. Out of range indexes and
/// missing keys yield nil rather than an error.
///
/// ```text
/// {{ index .Items 1 }}
/// {{ index .Config "key" }}
/// ```
pub fn index(args: &[Value]) -> Result<Value> {
    let container = args.first().unwrap_or(&Value::None);
    let key = args.get(1).unwrap_or(&Value::None);
    let value = match (container, key) {
        (Value::List(list), Value::Number(n)) => {
            if *n >= 0.0 && n.fract() == 0.0 && (*n as usize) < list.len() {
                list[*n as usize].clone()
            } else {
                Value::None
            }
        }
        (Value::Map(map), Value::String(_) | Value::Number(_)) => map
            .get(&key.to_string())
            .cloned()
            .unwrap_or(Value::None),
        _ => Value::None,
    };
    Ok(value)
}

/// HTML-escapes the string form of the value.
pub fn html(args: &[Value]) -> Result<Value> {
    let value = args.first().unwrap_or(&Value::None);
    Ok(Value::String(escape_html(&value.to_string())))
}

/// Replaces `&`, `<`, `>`, `"` and `'` with their HTML entities.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Escapes the string form of the value for embedding inside a JavaScript
/// string literal. `<`, `>` and `&` become unicode escapes so the result is
/// also safe inside HTML script contexts.
pub fn js(args: &[Value]) -> Result<Value> {
    let value = args.first().unwrap_or(&Value::None);
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000c}' => out.push_str("\\f"),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    Ok(Value::String(out))
}

/// Invokes a function value with the provided arguments.
///
/// ```text
/// {{ call .Fn "arg" 42 }}
/// ```
pub fn call(args: &[Value]) -> Result<Value> {
    match args.first() {
        Some(Value::Func(f)) => f.call(&args[1..]),
        _ => Err(Error::render("call: first argument must be a function")),
    }
}

/// Returns a sub-range of a list or string as `slice value start` or
/// `slice value start end`. The indexes must lie within `[0, len]` with
/// `start <= end`; string indexes count characters.
pub fn slice(args: &[Value]) -> Result<Value> {
    let value = args.first().unwrap_or(&Value::None);
    let start = match args.get(1) {
        Some(Value::Number(n)) => *n,
        _ => return Err(Error::render("slice: indices must be numbers")),
    };
    let end = match args.get(2) {
        None => None,
        Some(Value::Number(n)) => Some(*n),
        Some(_) => return Err(Error::render("slice: indices must be numbers")),
    };

    match value {
        Value::List(list) => {
            let (i, j) = bounds(start, end, list.len())?;
            Ok(Value::List(list[i..j].to_vec()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (i, j) = bounds(start, end, chars.len())?;
            Ok(Value::String(chars[i..j].iter().collect()))
        }
        value => Err(Error::render(format!(
            "slice: unsupported type \"{value}\""
        ))),
    }
}

fn bounds(start: f64, end: Option<f64>, len: usize) -> Result<(usize, usize)> {
    let to = end.unwrap_or(len as f64);
    if start < 0.0 || to < start || to > len as f64 {
        return Err(Error::render("slice: index out of range"));
    }
    Ok((start as usize, to as usize))
}

/// Formats a string using a subset of Go's `fmt` verbs: `%v`, `%s`, `%d`,
/// `%f`, `%t` and `%%`. Verbs are dropped once the arguments are exhausted
/// and unrecognized verbs are left untouched in the output.
///
/// ```text
/// {{ printf "%s is %d" .Name .Age }}
/// ```
pub fn printf(args: &[Value]) -> Result<Value> {
    let format = match args.first() {
        Some(Value::String(s)) => s,
        _ => return Err(Error::render("printf: first argument must be a string")),
    };
    let rest = &args[1..];

    let mut out = String::with_capacity(format.len());
    let mut next = 0;
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let verb = match chars.next() {
            None => {
                out.push('%');
                continue;
            }
            Some('%') => {
                out.push('%');
                continue;
            }
            Some(verb) => verb,
        };
        if next >= rest.len() {
            continue;
        }
        let argument = &rest[next];
        next += 1;
        match verb {
            'v' | 's' => out.push_str(&argument.to_string()),
            'd' => match argument {
                Value::Number(n) => out.push_str(&(n.trunc() as i64).to_string()),
                _ => out.push('0'),
            },
            'f' => match argument {
                Value::Number(n) => out.push_str(&n.to_string()),
                _ => out.push('0'),
            },
            't' => match argument {
                Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
                _ => out.push_str("false"),
            },
            verb => {
                out.push('%');
                out.push(verb);
            }
        }
    }
    Ok(Value::String(out))
}
