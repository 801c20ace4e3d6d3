use std::fmt;

/// A convenient type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur during template parsing or rendering.
///
/// Errors carry a plain message. Parsing and rendering are all-or-nothing,
/// so there is never a partial result to attach.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
}

/// The stage an [`Error`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The template source failed to parse.
    Syntax,
    /// Evaluation failed while rendering.
    Render,
    /// A context value failed to convert.
    Value,
}

impl Error {
    pub(crate) fn syntax(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            msg: msg.into(),
        }
    }

    pub(crate) fn render(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Render,
            msg: msg.into(),
        }
    }

    /// Returns the stage this error originated from.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("msg", &self.msg)
            .finish()
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self {
            kind: ErrorKind::Value,
            msg: msg.to_string(),
        }
    }
}
