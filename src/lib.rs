//! Declarative form validation.
//!
//! Rules are written as a tree of `validate` roots, `block`s combining
//! their children with `and`/`or`/`if` logic, and `rule` leaves naming a
//! predicate over one or more form fields. A document compiles once into
//! an immutable [`RuleTree`]; each pass evaluates it against a [`Form`]
//! and reports the failed nodes that carry an `onerror` code.
//!
//! ```
//! use formlogic::{Field, Form, ResolveCache, RuleCatalog, RuleDocument};
//!
//! let tree = RuleDocument::from_xml(
//!     r#"<validate>
//!          <rule type="required" for="email" onerror="EMAIL_MISSING"/>
//!          <block logic="if">
//!            <rule type="checked" for="newsletter"/>
//!            <rule type="email" for="email" onerror="EMAIL_BAD"/>
//!          </block>
//!        </validate>"#,
//! )
//! .unwrap()
//! .compile();
//!
//! let form = Form::new()
//!     .with(Field::text("email", "not-an-address"))
//!     .with(Field::checkbox("newsletter", true));
//!
//! let mut cache = ResolveCache::new();
//! let outcome = tree.validate(&form, &RuleCatalog::new(), &mut cache, "submit", None);
//! assert!(!outcome.passed());
//! assert_eq!(outcome.codes(), vec!["EMAIL_BAD"]);
//! ```
//!
//! Rule content never makes a pass error out: unknown rule types, invalid
//! patterns, and missing fields pass (or honour `failifnull`), and are
//! logged through `tracing`.

pub mod catalog;
mod compile;
mod error;
mod evaluate;
pub mod parse;
mod preprocess;
mod present;
mod resolve;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod session;
mod types;

pub use catalog::{PredicateFn, ProcessorFn, RuleCatalog, RuleFault};
pub use error::FormlogicError;
pub use preprocess::{Lint, LintKind};
pub use present::{Flow, MessagePresenter, Presenter, PresenterRegistry, TracingPresenter};
pub use resolve::{ResolveCache, ResolveContext};
#[cfg(feature = "binary-cache")]
pub use serial::{DeserializeError, SerializeError};
pub use session::{Options, PassReport, Session};
pub use types::{
    Attributes, Combinator, ControlType, Failure, Field, FieldHandle, FieldRef, Form, LoadError,
    Logic, Node, NodeBuilder, NodeId, NodeKind, RuleDocument, RuleDocumentBuilder, RuleNode,
    RuleParams, RuleTree, Target, TargetDecl, TargetSpec, ValidationOutcome,
};
