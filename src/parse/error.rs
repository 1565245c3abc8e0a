use std::fmt;

use thiserror::Error;

/// Errors produced when parsing a rule document (XML or JSON).
#[derive(Debug)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// An `&name;` reference the dialect does not define.
#[derive(Debug, Error)]
#[error("unknown entity reference '&{0};'")]
pub(crate) struct EntityError(pub(crate) String);
