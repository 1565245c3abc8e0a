use thiserror::Error;

use crate::parse::ParseError;
use crate::LoadError;

/// Unified error type covering parsing, loading, and I/O.
///
/// Returned by convenience methods like
/// [`RuleDocument::from_xml()`](crate::RuleDocument::from_xml) and
/// [`RuleDocument::from_file()`](crate::RuleDocument::from_file).
#[derive(Debug, Error)]
pub enum FormlogicError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
