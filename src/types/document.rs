use std::fmt;
use std::path::Path;

use super::attrs::Attributes;
use super::error::LoadError;
use super::logic::NodeKind;
use super::node::{
    RuleNode, TargetDecl, ATTR_ALIAS, ATTR_ERRTARGET, ATTR_FAIL_IF_NULL, ATTR_FOR, ATTR_ID,
    ATTR_INVERTED, ATTR_ITEM, ATTR_LOGIC, ATTR_NAME, ATTR_ONERROR, ATTR_TYPE,
};
use super::tree::RuleTree;
use crate::parse::Element;
use crate::preprocess::Lint;
use crate::FormlogicError;

const TAG_VALIDATE: &str = "validate";
const TAG_PREPROCESS: &str = "preprocess";
const TAG_BLOCK: &str = "block";
const TAG_RULE: &str = "rule";
const TAG_EL: &str = "el";
const TAG_ERRTARGET: &str = "errtarget";

/// A loaded, not yet compiled rule document.
///
/// Holds the `validate` and `preprocess` roots in document order. Call
/// [`compile`](Self::compile) to unwrap conditionals and obtain an
/// evaluable [`RuleTree`]; compiling consumes the document, so the
/// rewrite runs exactly once per load.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDocument {
    pub(crate) validate: Vec<RuleNode>,
    pub(crate) preprocess: Vec<RuleNode>,
}

impl RuleDocument {
    #[must_use]
    pub fn builder() -> RuleDocumentBuilder {
        RuleDocumentBuilder::new()
    }

    /// Parse the XML dialect.
    ///
    /// # Errors
    ///
    /// Returns [`FormlogicError::Parse`] for malformed XML and
    /// [`FormlogicError::Load`] when the markup is not a rule document.
    pub fn from_xml(input: &str) -> Result<Self, FormlogicError> {
        let root = crate::parse::parse_xml(input)?;
        Ok(Self::from_element(&root)?)
    }

    /// Parse the JSON dialect: objects are elements, scalar members are
    /// attributes, arrays repeat an element.
    ///
    /// # Errors
    ///
    /// Returns [`FormlogicError::Json`] for malformed JSON, otherwise as
    /// [`from_xml`](Self::from_xml).
    pub fn from_json(input: &str) -> Result<Self, FormlogicError> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        let root = crate::parse::json_to_element(&value)?;
        Ok(Self::from_element(&root)?)
    }

    /// Read a rule document from disk. Files ending in `.json` use the JSON
    /// dialect, anything else is read as XML.
    ///
    /// # Errors
    ///
    /// Returns [`FormlogicError`] on I/O, parse, or load failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FormlogicError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&input)
        } else {
            Self::from_xml(&input)
        }
    }

    /// Interpret a generic element tree.
    ///
    /// The root may itself be a `validate` or `preprocess` element; otherwise
    /// its immediate `validate` and `preprocess` children are taken, and any
    /// other children are ignored. A `validate` or `preprocess` nested
    /// below that level is skipped with a warning and reported by
    /// [`lint`](Self::lint).
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when no rule block is found.
    pub fn from_element(root: &Element) -> Result<Self, LoadError> {
        let mut document = Self {
            validate: Vec::new(),
            preprocess: Vec::new(),
        };
        match root.name.as_str() {
            TAG_VALIDATE => document.validate.push(load_node(root, NodeKind::Validate)),
            TAG_PREPROCESS => document
                .preprocess
                .push(load_node(root, NodeKind::Preprocess)),
            _ => {
                for child in &root.children {
                    match child.name.as_str() {
                        TAG_VALIDATE => document.validate.push(load_node(child, NodeKind::Validate)),
                        TAG_PREPROCESS => document
                            .preprocess
                            .push(load_node(child, NodeKind::Preprocess)),
                        other => tracing::debug!(element = other, "ignoring element"),
                    }
                }
            }
        }

        if document.validate.is_empty() && document.preprocess.is_empty() {
            return Err(LoadError::NoRuleBlocks {
                root: root.name.clone(),
            });
        }
        tracing::debug!(
            validate = document.validate.len(),
            preprocess = document.preprocess.len(),
            "rule document loaded"
        );
        Ok(document)
    }

    #[must_use]
    pub fn validate_roots(&self) -> &[RuleNode] {
        &self.validate
    }

    #[must_use]
    pub fn preprocess_roots(&self) -> &[RuleNode] {
        &self.preprocess
    }

    /// Report constructs that load but are probably mistakes: malformed
    /// conditionals, unknown `logic` values, rules without a type, `el`
    /// children without a name, nested `validate`/`preprocess` blocks.
    #[must_use]
    pub fn lint(&self) -> Vec<Lint> {
        crate::preprocess::lint(self)
    }

    /// Unwrap conditionals and flatten into an evaluable [`RuleTree`].
    #[must_use]
    pub fn compile(self) -> RuleTree {
        crate::compile::compile(self)
    }
}

impl fmt::Display for RuleDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn count(node: &RuleNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        let nodes: usize = self.validate.iter().chain(&self.preprocess).map(count).sum();
        write!(
            f,
            "RuleDocument({} validate, {} preprocess, {nodes} nodes)",
            self.validate.len(),
            self.preprocess.len(),
        )
    }
}

fn load_node(element: &Element, kind: NodeKind) -> RuleNode {
    let attrs: Attributes = element
        .attributes
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let mut node = RuleNode::new(kind, attrs);

    for child in &element.children {
        let child_attrs = || -> Attributes {
            child
                .attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect()
        };
        match (kind, child.name.as_str()) {
            (_, TAG_EL) => node.elements.push(TargetDecl::element(&child_attrs())),
            (_, TAG_ERRTARGET) => node
                .error_elements
                .push(TargetDecl::error_target(&child_attrs())),
            (NodeKind::Validate | NodeKind::Block | NodeKind::Preprocess, TAG_RULE) => {
                node.children.push(load_node(child, NodeKind::Rule));
            }
            (NodeKind::Validate | NodeKind::Block, TAG_BLOCK) => {
                node.children.push(load_node(child, NodeKind::Block));
            }
            (_, TAG_VALIDATE | TAG_PREPROCESS) => {
                tracing::warn!(
                    element = %child.name,
                    parent = %element.name,
                    "nested rule block ignored"
                );
                node.nested.push(child.name.clone());
            }
            (_, other) => tracing::debug!(
                element = other,
                parent = kind.tag(),
                "ignoring element"
            ),
        }
    }
    node
}

/// Builder for constructing a [`RuleDocument`] in code.
///
/// # Example
///
/// ```
/// use formlogic::RuleDocument;
///
/// let document = RuleDocument::builder()
///     .preprocess(|p| p.rule("trim", |r| r.field("email")))
///     .validate(|v| {
///         v.rule("required", |r| r.field("email").on_error("EMAIL_MISSING"))
///             .block(|b| {
///                 b.logic("if")
///                     .rule("checked", |r| r.field("subscribe"))
///                     .rule("email", |r| r.field("email").on_error("EMAIL_BAD"))
///             })
///     })
///     .build()
///     .unwrap();
/// assert_eq!(document.validate_roots().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RuleDocumentBuilder {
    roots: Vec<Element>,
}

/// Intermediate builder passed to the node definition closures.
#[derive(Debug)]
pub struct NodeBuilder {
    element: Element,
}

impl RuleDocumentBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `validate` root.
    #[must_use]
    pub fn validate(mut self, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        self.roots.push(f(NodeBuilder::new(TAG_VALIDATE)).element);
        self
    }

    /// Add a `preprocess` root.
    #[must_use]
    pub fn preprocess(mut self, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        self.roots.push(f(NodeBuilder::new(TAG_PREPROCESS)).element);
        self
    }

    /// The element tree the builder has assembled so far.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element {
            name: "svarx".to_owned(),
            attributes: Vec::new(),
            children: self.roots.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns [`LoadError::NoRuleBlocks`] if no root was added.
    pub fn build(self) -> Result<RuleDocument, LoadError> {
        RuleDocument::from_element(&self.to_element())
    }
}

impl NodeBuilder {
    fn new(tag: &str) -> Self {
        Self {
            element: Element::new(tag),
        }
    }

    /// Set an arbitrary attribute, e.g. a predicate parameter.
    #[must_use]
    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.element.set_attr(key, value);
        self
    }

    #[must_use]
    pub fn logic(self, logic: &str) -> Self {
        self.attr(ATTR_LOGIC, logic)
    }

    #[must_use]
    pub fn inverted(self) -> Self {
        self.attr(ATTR_INVERTED, ATTR_INVERTED)
    }

    #[must_use]
    pub fn fail_if_null(self) -> Self {
        self.attr(ATTR_FAIL_IF_NULL, ATTR_FAIL_IF_NULL)
    }

    #[must_use]
    pub fn on_error(self, code: &str) -> Self {
        self.attr(ATTR_ONERROR, code)
    }

    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr(ATTR_ID, id)
    }

    /// Validate a single field (`for`).
    #[must_use]
    pub fn field(self, name: &str) -> Self {
        self.attr(ATTR_FOR, name)
    }

    /// Validate the `item`-th field called `name`.
    #[must_use]
    pub fn field_item(self, name: &str, item: usize) -> Self {
        self.attr(ATTR_FOR, name).attr(ATTR_ITEM, item.to_string())
    }

    /// Add an `el` child: one more validated field.
    #[must_use]
    pub fn el(mut self, name: &str) -> Self {
        self.element = self.element.child(Element::new(TAG_EL).attr(ATTR_NAME, name));
        self
    }

    #[must_use]
    pub fn el_item(mut self, name: &str, item: usize) -> Self {
        self.element = self.element.child(
            Element::new(TAG_EL)
                .attr(ATTR_NAME, name)
                .attr(ATTR_ITEM, item.to_string()),
        );
        self
    }

    /// Send failures to the named field instead of the validated ones.
    #[must_use]
    pub fn error_target(self, name: &str) -> Self {
        self.attr(ATTR_ERRTARGET, name)
    }

    /// Add an `errtarget` child with an alias (`children` or `form`).
    #[must_use]
    pub fn error_target_alias(mut self, alias: &str) -> Self {
        self.element = self
            .element
            .child(Element::new(TAG_ERRTARGET).attr(ATTR_ALIAS, alias));
        self
    }

    /// Add a child rule of the given type.
    #[must_use]
    pub fn rule(mut self, rule_type: &str, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        let rule = f(NodeBuilder::new(TAG_RULE).attr(ATTR_TYPE, rule_type));
        self.element = self.element.child(rule.element);
        self
    }

    /// Add a child block.
    #[must_use]
    pub fn block(mut self, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        let block = f(NodeBuilder::new(TAG_BLOCK));
        self.element = self.element.child(block.element);
        self
    }
}
