use thiserror::Error;

/// A well-formed document that is not a rule document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("document root '{root}' contains no validate or preprocess block")]
    NoRuleBlocks { root: String },
}
