use std::collections::HashMap;
use std::fmt;

use crate::types::Failure;

const SUBMIT: &str = "submit";

/// Whether a validation pass should go ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

/// How a host surfaces the failures of a validation pass.
///
/// The hooks run in order: [`before`](Self::before) once, then
/// [`error`](Self::error) once per failure in firing order, then
/// [`after`](Self::after) once.
pub trait Presenter: Send {
    /// Called before preprocessing. Returning [`Flow::Halt`] skips the pass.
    fn before(&mut self, _event: &str) -> Flow {
        Flow::Continue
    }

    fn error(&mut self, failure: &Failure);

    /// Called with the pass result. Returns whether the host should suppress
    /// the default action of `event`.
    fn after(&mut self, _passed: bool, _event: &str) -> bool {
        false
    }

    /// Lines collected during the last pass, for the host to display.
    fn summary(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Collects one readable line per failure.
///
/// Lines come from a message catalog keyed by error code; unknown codes
/// read `Error <code>`. A failed `submit` asks the host to hold the
/// submission.
#[derive(Debug, Clone, Default)]
pub struct MessagePresenter {
    messages: HashMap<String, String>,
    lines: Vec<String>,
}

impl MessagePresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog entry.
    #[must_use]
    pub fn with_message(mut self, code: &str, message: impl Into<String>) -> Self {
        self.messages.insert(code.to_owned(), message.into());
        self
    }

    #[must_use]
    pub fn message_for(&self, code: &str) -> String {
        self.messages
            .get(code)
            .cloned()
            .unwrap_or_else(|| format!("Error {code}"))
    }

    /// Lines of the last pass, in firing order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Presenter for MessagePresenter {
    fn before(&mut self, _event: &str) -> Flow {
        self.lines.clear();
        Flow::Continue
    }

    fn error(&mut self, failure: &Failure) {
        self.lines.push(self.message_for(failure.code()));
    }

    fn after(&mut self, passed: bool, event: &str) -> bool {
        !passed && event == SUBMIT
    }

    fn summary(&self) -> Vec<String> {
        self.lines.clone()
    }
}

/// Logs every failure and the pass result, and records the error codes.
#[derive(Debug, Clone, Default)]
pub struct TracingPresenter {
    codes: Vec<String>,
}

impl TracingPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Codes fired in the last pass.
    #[must_use]
    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl Presenter for TracingPresenter {
    fn before(&mut self, event: &str) -> Flow {
        self.codes.clear();
        tracing::debug!(event, "validation pass starting");
        Flow::Continue
    }

    fn error(&mut self, failure: &Failure) {
        tracing::info!(
            code = failure.code(),
            node = %failure.node(),
            targets = failure.targets().len(),
            "validation failure"
        );
        self.codes.push(failure.code().to_owned());
    }

    fn after(&mut self, passed: bool, event: &str) -> bool {
        tracing::info!(event, passed, failures = self.codes.len(), "validation pass result");
        false
    }

    fn summary(&self) -> Vec<String> {
        self.codes.clone()
    }
}

/// Named presenters. With no name configured the first registration wins.
#[derive(Default)]
pub struct PresenterRegistry {
    entries: Vec<(String, Box<dyn Presenter>)>,
}

impl PresenterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `messages` ([`MessagePresenter`]) then `debug` ([`TracingPresenter`]).
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .with("messages", MessagePresenter::new())
            .with("debug", TracingPresenter::new())
    }

    /// Register a presenter, replacing any earlier one with the same name.
    #[must_use]
    pub fn with(mut self, name: &str, presenter: impl Presenter + 'static) -> Self {
        self.register(name, Box::new(presenter));
        self
    }

    pub fn register(&mut self, name: &str, presenter: Box<dyn Presenter>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = presenter,
            None => self.entries.push((name.to_owned(), presenter)),
        }
    }

    /// The presenter called `name`, or the first one when `name` is `None`
    /// or unknown.
    pub fn select(&mut self, name: Option<&str>) -> Option<&mut dyn Presenter> {
        let index = match name {
            Some(wanted) => match self.entries.iter().position(|(n, _)| n == wanted) {
                Some(i) => Some(i),
                // A misspelt name still reports failures rather than hiding them.
                None => {
                    tracing::warn!(presenter = wanted, "unknown presenter; using the first");
                    (!self.entries.is_empty()).then_some(0)
                }
            },
            None => (!self.entries.is_empty()).then_some(0),
        }?;
        Some(self.entries[index].1.as_mut())
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PresenterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenterRegistry")
            .field("names", &self.names())
            .finish()
    }
}
