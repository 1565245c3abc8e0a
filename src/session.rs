use std::sync::Arc;

use crate::catalog::RuleCatalog;
use crate::present::{Flow, Presenter, PresenterRegistry};
use crate::resolve::ResolveCache;
use crate::types::{Form, RuleTree, ValidationOutcome};

const DEFAULT_TRIGGER: &str = "submit";

/// Host-side settings for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    /// Event names that trigger a validation pass.
    pub triggers: Vec<String>,
    /// Presenter to use; the first registered one when `None`.
    pub presenter: Option<String>,
    /// The form's field set never changes, so resolutions are kept across
    /// passes until [`Session::invalidate`] is called.
    pub immutable: bool,
    pub validate_id: Option<String>,
    pub preprocess_id: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            triggers: vec![DEFAULT_TRIGGER.to_owned()],
            presenter: None,
            immutable: false,
            validate_id: None,
            preprocess_id: None,
        }
    }
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the trigger events.
    #[must_use]
    pub fn triggers<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers = events.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn presenter(mut self, name: &str) -> Self {
        self.presenter = Some(name.to_owned());
        self
    }

    #[must_use]
    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    #[must_use]
    pub fn validate_id(mut self, id: &str) -> Self {
        self.validate_id = Some(id.to_owned());
        self
    }

    #[must_use]
    pub fn preprocess_id(mut self, id: &str) -> Self {
        self.preprocess_id = Some(id.to_owned());
        self
    }
}

/// What a [`Session::run`] did.
#[derive(Debug)]
#[must_use]
pub enum PassReport {
    /// The presenter's `before` hook halted the pass; the host proceeds as
    /// if no validation were bound.
    Skipped,
    Completed {
        outcome: ValidationOutcome,
        /// The presenter asked the host to suppress the event's default action.
        prevent_default: bool,
        /// The presenter's summary lines.
        messages: Vec<String>,
    },
}

impl PassReport {
    /// `None` when skipped.
    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        match self {
            PassReport::Skipped => None,
            PassReport::Completed { outcome, .. } => Some(outcome.passed()),
        }
    }

    #[must_use]
    pub fn prevent_default(&self) -> bool {
        matches!(
            self,
            PassReport::Completed {
                prevent_default: true,
                ..
            }
        )
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&ValidationOutcome> {
        match self {
            PassReport::Skipped => None,
            PassReport::Completed { outcome, .. } => Some(outcome),
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        match self {
            PassReport::Skipped => &[],
            PassReport::Completed { messages, .. } => messages,
        }
    }
}

/// A rule tree bound to one form: the catalog, presenters, and resolve
/// cache a host keeps per form.
///
/// The tree is shared; sessions for different forms can run on different
/// threads against the same [`RuleTree`].
#[derive(Debug)]
pub struct Session {
    tree: Arc<RuleTree>,
    catalog: RuleCatalog,
    cache: ResolveCache,
    options: Options,
    presenters: PresenterRegistry,
}

impl Session {
    /// A session with the built-in catalog, the built-in presenters, and
    /// default options.
    #[must_use]
    pub fn new(tree: impl Into<Arc<RuleTree>>) -> Self {
        Self {
            tree: tree.into(),
            catalog: RuleCatalog::new(),
            cache: ResolveCache::new(),
            options: Options::default(),
            presenters: PresenterRegistry::with_builtins(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_presenters(mut self, presenters: PresenterRegistry) -> Self {
        self.presenters = presenters;
        self
    }

    /// Add or replace one presenter.
    #[must_use]
    pub fn with_presenter(mut self, name: &str, presenter: impl Presenter + 'static) -> Self {
        self.presenters.register(name, Box::new(presenter));
        self
    }

    #[must_use]
    pub fn tree(&self) -> &RuleTree {
        &self.tree
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Whether `event` triggers a validation pass.
    #[must_use]
    pub fn handles(&self, event: &str) -> bool {
        self.options.triggers.iter().any(|t| t == event)
    }

    /// The form's field set changed: drop cached resolutions.
    pub fn invalidate(&mut self) {
        self.cache.reset();
    }

    /// Run a full pass for `event` against the configured `validate` root.
    pub fn run(&mut self, form: &mut Form, event: &str) -> PassReport {
        let root = self.options.validate_id.clone();
        self.run_with(form, event, root.as_deref())
    }

    /// Run a full pass, overriding the `validate` root for this call.
    ///
    /// Order: presenter `before`, cache reset (unless immutable), value
    /// processors, evaluation, presenter `error` per failure, presenter
    /// `after`.
    pub fn run_with(&mut self, form: &mut Form, event: &str, validate_id: Option<&str>) -> PassReport {
        let mut presenter = self.presenters.select(self.options.presenter.as_deref());

        if let Some(p) = presenter.as_deref_mut() {
            if p.before(event) == Flow::Halt {
                tracing::debug!(event, "validation pass halted by presenter");
                return PassReport::Skipped;
            }
        }

        if !self.options.immutable {
            self.cache.reset();
        }

        self.tree.apply_processors(
            form,
            &self.catalog,
            &mut self.cache,
            self.options.preprocess_id.as_deref(),
        );
        let outcome = self
            .tree
            .validate(form, &self.catalog, &mut self.cache, event, validate_id);

        let (prevent_default, messages) = match presenter {
            Some(p) => {
                for failure in outcome.failures() {
                    p.error(failure);
                }
                (p.after(outcome.passed(), event), p.summary())
            }
            None => (false, Vec::new()),
        };

        PassReport::Completed {
            outcome,
            prevent_default,
            messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Failure, Field};
    use crate::RuleDocument;

    fn tree(xml: &str) -> RuleTree {
        RuleDocument::from_xml(xml).unwrap().compile()
    }

    struct Gate;

    impl Presenter for Gate {
        fn before(&mut self, _event: &str) -> Flow {
            Flow::Halt
        }

        fn error(&mut self, _failure: &Failure) {}
    }

    #[test]
    fn default_options() {
        let options = Options::default();
        assert_eq!(options.triggers, vec!["submit"]);
        assert!(!options.immutable);
        assert_eq!(options.presenter, None);
    }

    #[test]
    fn handles_configured_triggers() {
        let session = Session::new(tree("<validate/>"))
            .with_options(Options::new().triggers(["change", "blur"]));
        assert!(session.handles("change"));
        assert!(!session.handles("submit"));
    }

    #[test]
    fn halted_pass_is_skipped() {
        let mut session = Session::new(tree(
            r#"<validate><rule type="required" for="a" onerror="A"/></validate>"#,
        ))
        .with_presenters(PresenterRegistry::new().with("gate", Gate));
        let mut form = Form::new().with(Field::text("a", ""));
        let report = session.run(&mut form, "submit");
        assert!(matches!(report, PassReport::Skipped));
        assert_eq!(report.passed(), None);
        assert!(!report.prevent_default());
    }

    #[test]
    fn processors_run_before_validation() {
        let mut session = Session::new(tree(
            r#"<svarx>
                 <preprocess><rule type="trim" for="a"/></preprocess>
                 <validate><rule type="required" for="a" onerror="A"/></validate>
               </svarx>"#,
        ));
        let mut form = Form::new().with(Field::text("a", "   "));
        let report = session.run(&mut form, "submit");
        assert_eq!(form.value_of("a"), Some(""));
        assert_eq!(report.passed(), Some(false));
        assert!(report.prevent_default());
        assert_eq!(report.messages(), ["Error A"]);
    }

    #[test]
    fn without_presenter_nothing_is_prevented() {
        let mut session = Session::new(tree(
            r#"<validate><rule type="required" for="a" onerror="A"/></validate>"#,
        ))
        .with_presenters(PresenterRegistry::new());
        let mut form = Form::new().with(Field::text("a", ""));
        let report = session.run(&mut form, "submit");
        assert_eq!(report.passed(), Some(false));
        assert!(!report.prevent_default());
        assert_eq!(report.outcome().unwrap().codes(), vec!["A"]);
    }

    #[test]
    fn per_call_root_override() {
        let mut session = Session::new(tree(
            r#"<svarx>
                 <validate id="strict"><rule type="required" for="a" onerror="A"/></validate>
                 <validate id="lenient"/>
               </svarx>"#,
        ))
        .with_options(Options::new().validate_id("lenient"));
        let mut form = Form::new().with(Field::text("a", ""));
        assert_eq!(session.run(&mut form, "submit").passed(), Some(true));
        assert_eq!(
            session.run_with(&mut form, "submit", Some("strict")).passed(),
            Some(false)
        );
    }

    #[test]
    fn immutable_session_keeps_resolutions_until_invalidated() {
        let mut session = Session::new(tree(
            r#"<validate><rule type="required" for="a" onerror="A"/></validate>"#,
        ))
        .with_options(Options::new().immutable(true));
        let mut form = Form::new().with(Field::text("a", ""));
        assert_eq!(session.run(&mut form, "submit").passed(), Some(false));

        // The cached handle still points at the first field, now disabled.
        let mut grown = Form::new()
            .with(Field::text("a", "").with_disabled(true))
            .with(Field::text("a", "filled"));
        assert_eq!(session.run(&mut grown, "submit").passed(), Some(false));
        session.invalidate();
        assert_eq!(session.run(&mut grown, "submit").passed(), Some(true));
    }
}
