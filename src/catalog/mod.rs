pub mod numeric;
mod predicates;
mod processors;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::types::{Field, RuleParams};
use predicates::PatternCache;

/// A predicate: decides a rule over the fields it was given.
///
/// Returning `Err` never fails a pass; the evaluator logs the fault and
/// treats the rule as passing.
pub type PredicateFn =
    dyn Fn(&[&Field], &RuleParams<'_>) -> Result<bool, RuleFault> + Send + Sync;

/// A processor: maps one field value to its replacement.
pub type ProcessorFn = dyn Fn(&str, &RuleParams<'_>) -> String + Send + Sync;

/// Faults a predicate may raise at evaluation time.
#[derive(Debug, Error)]
pub enum RuleFault {
    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{0}")]
    Custom(String),
}

/// Rule-type and processor registry consulted by the evaluator.
///
/// [`RuleCatalog::new()`] registers the built-ins: predicates `required`,
/// `range`, `eq`, `regexp`, `checked`, `selected`, `email` and processors
/// `parseint`, `parsefloat`, `trim`, `normalize`, `nospace`, `uppercase`,
/// `lowercase`. Names are case-sensitive.
///
/// Unknown predicate names pass and unknown processor names do nothing,
/// unless a fallback predicate is installed with
/// [`with_fallback`](Self::with_fallback). An unknown type passes even on
/// an `inverted` rule, since there is no predicate answer to invert. Hosts
/// that want `inverted` to flip that default can install
/// `with_fallback(|_, _| Ok(true))`.
///
/// ```
/// use formlogic::RuleCatalog;
///
/// let catalog = RuleCatalog::new().with_predicate("digits", |fields, _| {
///     Ok(fields.iter().all(|f| f.value().chars().all(|c| c.is_ascii_digit())))
/// });
/// assert!(catalog.predicate("digits").is_some());
/// assert!(catalog.predicate("required").is_some());
/// ```
#[derive(Clone)]
pub struct RuleCatalog {
    predicates: HashMap<String, Arc<PredicateFn>>,
    processors: HashMap<String, Arc<ProcessorFn>>,
    fallback: Option<Arc<PredicateFn>>,
}

impl RuleCatalog {
    /// A catalog with every built-in predicate and processor.
    #[must_use]
    pub fn new() -> Self {
        let patterns = Arc::new(PatternCache::default());
        Self::empty()
            .with_predicate("required", predicates::required)
            .with_predicate("range", predicates::range)
            .with_predicate("eq", predicates::eq)
            .with_predicate("regexp", move |fields, params| patterns.regexp(fields, params))
            .with_predicate("checked", predicates::checked)
            .with_predicate("selected", predicates::selected)
            .with_predicate("email", predicates::email)
            .with_processor("parseint", processors::parse_int)
            .with_processor("parsefloat", processors::parse_float)
            .with_processor("trim", processors::trim)
            .with_processor("normalize", processors::normalize)
            .with_processor("nospace", processors::no_space)
            .with_processor("uppercase", processors::uppercase)
            .with_processor("lowercase", processors::lowercase)
    }

    /// A catalog with nothing registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            predicates: HashMap::new(),
            processors: HashMap::new(),
            fallback: None,
        }
    }

    /// Register (or replace) a predicate.
    #[must_use]
    pub fn with_predicate<F>(mut self, name: &str, predicate: F) -> Self
    where
        F: Fn(&[&Field], &RuleParams<'_>) -> Result<bool, RuleFault> + Send + Sync + 'static,
    {
        self.predicates.insert(name.to_owned(), Arc::new(predicate));
        self
    }

    /// Register (or replace) a processor.
    #[must_use]
    pub fn with_processor<F>(mut self, name: &str, processor: F) -> Self
    where
        F: Fn(&str, &RuleParams<'_>) -> String + Send + Sync + 'static,
    {
        self.processors.insert(name.to_owned(), Arc::new(processor));
        self
    }

    /// Predicate used for rules whose type is not registered.
    ///
    /// Unlike the default fail-open behaviour, its result is subject to the
    /// rule's `inverted` flag like any other predicate.
    #[must_use]
    pub fn with_fallback<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[&Field], &RuleParams<'_>) -> Result<bool, RuleFault> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(predicate));
        self
    }

    #[must_use]
    pub fn predicate(&self, name: &str) -> Option<&PredicateFn> {
        self.predicates.get(name).map(|p| &**p)
    }

    #[must_use]
    pub fn processor(&self, name: &str) -> Option<&ProcessorFn> {
        self.processors.get(name).map(|p| &**p)
    }

    #[must_use]
    pub fn fallback(&self) -> Option<&PredicateFn> {
        self.fallback.as_deref()
    }

    /// Registered predicate names, sorted.
    #[must_use]
    pub fn predicate_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered processor names, sorted.
    #[must_use]
    pub fn processor_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.processors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleCatalog")
            .field("predicates", &self.predicate_names())
            .field("processors", &self.processor_names())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
