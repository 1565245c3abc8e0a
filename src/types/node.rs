use super::attrs::Attributes;
use super::logic::{Logic, NodeKind};

pub(crate) const ATTR_TYPE: &str = "type";
pub(crate) const ATTR_LOGIC: &str = "logic";
pub(crate) const ATTR_INVERTED: &str = "inverted";
pub(crate) const ATTR_FAIL_IF_NULL: &str = "failifnull";
pub(crate) const ATTR_FAIL_IF_NULL_CAMEL: &str = "failIfNull";
pub(crate) const ATTR_FOR: &str = "for";
pub(crate) const ATTR_ITEM: &str = "item";
pub(crate) const ATTR_ERRTARGET: &str = "errtarget";
pub(crate) const ATTR_ERRTARGET_ITEM: &str = "errtargetitem";
pub(crate) const ATTR_ONERROR: &str = "onerror";
pub(crate) const ATTR_ID: &str = "id";
pub(crate) const ATTR_NAME: &str = "name";
pub(crate) const ATTR_ALIAS: &str = "alias";

/// A named form field reference: the `item`-th enabled field called `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldRef {
    pub name: String,
    pub item: usize,
}

impl FieldRef {
    #[must_use]
    pub fn new(name: impl Into<String>, item: usize) -> Self {
        Self {
            name: name.into(),
            item,
        }
    }
}

/// One `el` or `errtarget` child declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetDecl {
    Field(FieldRef),
    /// `alias="children"`: the error targets of every immediate child rule.
    Children,
    /// The whole form. Produced by `alias="form"`, an unknown alias, or a missing name.
    Form,
}

impl TargetDecl {
    /// Interpret an `el` child. Aliases have no meaning for validation targets.
    pub(crate) fn element(attrs: &Attributes) -> Self {
        match attrs.non_empty(ATTR_NAME) {
            Some(name) => TargetDecl::Field(FieldRef::new(name, attrs.index_or(ATTR_ITEM, 0))),
            None => TargetDecl::Form,
        }
    }

    /// Interpret an `errtarget` child.
    pub(crate) fn error_target(attrs: &Attributes) -> Self {
        match attrs.non_empty(ATTR_ALIAS) {
            Some("children") => TargetDecl::Children,
            Some(_) => TargetDecl::Form,
            None => Self::element(attrs),
        }
    }
}

/// Everything a node declares about the fields it applies to, in one context.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetSpec {
    /// A direct name attribute (`for` / `errtarget`).
    Field(FieldRef),
    /// Child declarations, in document order.
    List(Vec<TargetDecl>),
    /// Nothing declared: the whole form.
    Form,
}

impl TargetSpec {
    /// Number of targets the declaration asks for. Used as a rule's field count.
    #[must_use]
    pub fn declared_count(&self) -> usize {
        match self {
            TargetSpec::Field(_) => 1,
            TargetSpec::List(decls) => decls.len(),
            TargetSpec::Form => 0,
        }
    }
}

/// A node of an uncompiled rule document.
///
/// Boolean and enum attributes are parsed once on construction; the raw
/// attribute map is kept alongside and stays in sync when the preprocessor
/// toggles a flag.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleNode {
    pub(crate) kind: NodeKind,
    pub(crate) logic: Logic,
    pub(crate) inverted: bool,
    pub(crate) fail_if_null: bool,
    pub(crate) attrs: Attributes,
    pub(crate) elements: Vec<TargetDecl>,
    pub(crate) error_elements: Vec<TargetDecl>,
    pub(crate) children: Vec<RuleNode>,
    /// Names of `validate`/`preprocess` elements found inside this node and skipped.
    pub(crate) nested: Vec<String>,
}

impl RuleNode {
    pub(crate) fn new(kind: NodeKind, attrs: Attributes) -> Self {
        let logic = if kind.is_combining() {
            Logic::parse(attrs.get(ATTR_LOGIC))
        } else {
            Logic::And
        };
        Self {
            kind,
            logic,
            inverted: attrs.is_truthy(ATTR_INVERTED),
            fail_if_null: attrs.is_truthy(ATTR_FAIL_IF_NULL)
                || attrs
                    .get(ATTR_FAIL_IF_NULL_CAMEL)
                    .is_some_and(|v| super::attrs::is_truthy_value(ATTR_FAIL_IF_NULL_CAMEL, v)),
            attrs,
            elements: Vec::new(),
            error_elements: Vec::new(),
            children: Vec::new(),
            nested: Vec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn logic(&self) -> Logic {
        self.logic
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    #[must_use]
    pub fn fails_if_null(&self) -> bool {
        self.fail_if_null
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    /// Child rules and blocks in document order.
    #[must_use]
    pub fn children(&self) -> &[RuleNode] {
        &self.children
    }

    #[must_use]
    pub fn rule_type(&self) -> Option<&str> {
        self.attrs.non_empty(ATTR_TYPE)
    }

    #[must_use]
    pub fn on_error(&self) -> Option<&str> {
        self.attrs.non_empty(ATTR_ONERROR)
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attrs.get(ATTR_ID)
    }

    /// Which fields are validated.
    #[must_use]
    pub fn target(&self) -> TargetSpec {
        if let Some(name) = self.attrs.non_empty(ATTR_FOR) {
            TargetSpec::Field(FieldRef::new(name, self.attrs.index_or(ATTR_ITEM, 0)))
        } else if !self.elements.is_empty() {
            TargetSpec::List(self.elements.clone())
        } else {
            TargetSpec::Form
        }
    }

    /// Which fields receive the error. `None` means "same as [`target`](Self::target)".
    #[must_use]
    pub fn error_target(&self) -> Option<TargetSpec> {
        if !self.attrs.contains(ATTR_ERRTARGET) && self.error_elements.is_empty() {
            return None;
        }
        Some(if let Some(name) = self.attrs.non_empty(ATTR_ERRTARGET) {
            TargetSpec::Field(FieldRef::new(
                name,
                self.attrs.index_or(ATTR_ERRTARGET_ITEM, 0),
            ))
        } else if !self.error_elements.is_empty() {
            TargetSpec::List(self.error_elements.clone())
        } else {
            TargetSpec::Form
        })
    }

    /// Expected number of live fields for a rule: 1 with `for`, else the `el` count.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.target().declared_count()
    }

    /// Negate this node as a condition: flips both `inverted` and `failifnull`,
    /// so a missing-field outcome is negated along with the predicate outcome.
    pub(crate) fn toggle_inversion(&mut self) {
        self.set_inverted(!self.inverted);
        self.fail_if_null = !self.fail_if_null;
        self.attrs.remove(ATTR_FAIL_IF_NULL_CAMEL);
        if self.fail_if_null {
            self.attrs.insert(ATTR_FAIL_IF_NULL, ATTR_FAIL_IF_NULL);
        } else {
            self.attrs.remove(ATTR_FAIL_IF_NULL);
        }
    }

    pub(crate) fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
        if inverted {
            self.attrs.insert(ATTR_INVERTED, ATTR_INVERTED);
        } else {
            self.attrs.remove(ATTR_INVERTED);
        }
    }

    pub(crate) fn set_logic(&mut self, logic: Logic) {
        self.logic = logic;
        self.attrs.insert(ATTR_LOGIC, logic.as_str());
    }
}
