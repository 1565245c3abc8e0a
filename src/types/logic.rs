use std::fmt;

/// The element kinds that carry meaning in a rule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Root of a boolean rule tree.
    Validate,
    /// Root of a list of value-transform rules.
    Preprocess,
    /// Inner node combining child rules and blocks.
    Block,
    /// Leaf predicate (or processor, under `preprocess`).
    Rule,
}

impl NodeKind {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Validate => "validate",
            NodeKind::Preprocess => "preprocess",
            NodeKind::Block => "block",
            NodeKind::Rule => "rule",
        }
    }

    /// Whether the node combines children with a `logic` attribute.
    #[must_use]
    pub fn is_combining(self) -> bool {
        matches!(self, NodeKind::Validate | NodeKind::Block)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Authoring-time `logic` attribute of a block.
///
/// `If` only exists before compilation; the preprocessor rewrites it into
/// [`Combinator`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
    If,
}

impl Logic {
    /// Parse the attribute value. Anything other than `or` / `if` reads as `and`.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Logic {
        match value {
            Some("or") => Logic::Or,
            Some("if") => Logic::If,
            _ => Logic::And,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Logic::And => "and",
            Logic::Or => "or",
            Logic::If => "if",
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-compilation combination logic. There is no conditional variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Combinator {
    #[default]
    All,
    Any,
}

impl Combinator {
    /// Fold child results. No short-circuit: callers evaluate every child first.
    #[must_use]
    pub fn combine(self, results: &[bool]) -> bool {
        match self {
            Combinator::All => results.iter().all(|&r| r),
            Combinator::Any => results.is_empty() || results.iter().any(|&r| r),
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::All => write!(f, "and"),
            Combinator::Any => write!(f, "or"),
        }
    }
}
