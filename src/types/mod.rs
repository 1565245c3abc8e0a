mod attrs;
mod document;
mod error;
mod form;
mod logic;
pub(crate) mod node;
mod outcome;
mod tree;

pub use attrs::{Attributes, RuleParams};
pub use document::{NodeBuilder, RuleDocument, RuleDocumentBuilder};
pub use error::LoadError;
pub use form::{ControlType, Field, FieldHandle, Form};
pub use logic::{Combinator, Logic, NodeKind};
pub use node::{FieldRef, RuleNode, TargetDecl, TargetSpec};
pub use outcome::{Failure, Target, ValidationOutcome};
pub use tree::{Node, NodeId, RuleTree};
