use std::fmt;
use std::time::Duration;

use super::attrs::Attributes;
use super::form::FieldHandle;
use super::tree::NodeId;

/// Something a rule resolves to: one field, or the form as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Form,
    Field(FieldHandle),
}

impl Target {
    #[must_use]
    pub fn field(self) -> Option<FieldHandle> {
        match self {
            Target::Field(h) => Some(h),
            Target::Form => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Form => write!(f, "form"),
            Target::Field(h) => write!(f, "field {h}"),
        }
    }
}

/// A failed node with an `onerror` code and at least one resolved error
/// target, ready to be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    node: NodeId,
    code: String,
    event: String,
    targets: Vec<Target>,
    attributes: Attributes,
}

impl Failure {
    pub(crate) fn new(
        node: NodeId,
        code: impl Into<String>,
        event: impl Into<String>,
        targets: Vec<Target>,
        attributes: Attributes,
    ) -> Self {
        Self {
            node,
            code: code.into(),
            event: event.into(),
            targets,
            attributes,
        }
    }

    /// The node that failed.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The node's `onerror` code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The event that triggered the pass.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Resolved error targets, never empty: a failure whose targets resolve
    /// to nothing is not reported.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Snapshot of the failed node's attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on [", self.code)?;
        for (i, t) in self.targets.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{t}")?;
        }
        write!(f, "] ({})", self.event)
    }
}

/// Result of one validation pass.
///
/// Returned by [`RuleTree::validate()`](super::RuleTree::validate). Failures
/// are listed in depth-first document order.
#[derive(Debug, Clone)]
#[must_use]
pub struct ValidationOutcome {
    passed: bool,
    root: Option<NodeId>,
    failures: Vec<Failure>,
    duration: Duration,
}

impl ValidationOutcome {
    pub(crate) fn new(
        passed: bool,
        root: Option<NodeId>,
        failures: Vec<Failure>,
        duration: Duration,
    ) -> Self {
        Self {
            passed,
            root,
            failures,
            duration,
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// The `validate` root that was evaluated, `None` if the tree has none.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Error codes of all failures, in firing order.
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        self.failures.iter().map(Failure::code).collect()
    }

    /// Wall-clock duration of the pass.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "passed: {}", self.passed)?;
        write!(f, ", failures: [{}]", self.codes().join(", "))?;
        write!(f, ", duration: {:?}", self.duration)
    }
}
