use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::attrs::{Attributes, RuleParams};
use super::form::{ControlType, Form};
use super::logic::{Combinator, NodeKind};
use super::node::{TargetSpec, ATTR_ID, ATTR_ONERROR, ATTR_TYPE};
use super::outcome::ValidationOutcome;
use crate::catalog::RuleCatalog;
use crate::resolve::{ResolveCache, ResolveContext};

static NEXT_TREE_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Index of a node inside a [`RuleTree`] arena.
///
/// Assigned once at compile time in depth-first document order and stable
/// for the lifetime of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A compiled node. Read-only outside the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) combinator: Combinator,
    pub(crate) inverted: bool,
    pub(crate) fail_if_null: bool,
    pub(crate) field_count: usize,
    pub(crate) target: TargetSpec,
    pub(crate) error_target: Option<TargetSpec>,
    pub(crate) attrs: Attributes,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    #[must_use]
    pub fn fails_if_null(&self) -> bool {
        self.fail_if_null
    }

    /// Number of live fields a rule expects. Zero marks a global rule.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    #[must_use]
    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    #[must_use]
    pub fn error_target(&self) -> Option<&TargetSpec> {
        self.error_target.as_ref()
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    #[must_use]
    pub fn params(&self) -> RuleParams<'_> {
        RuleParams::new(&self.attrs)
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
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
}

/// A compiled rule document: conditionals unwrapped, field counts set,
/// nodes flattened into an arena.
///
/// Immutable and thread-safe. Per-document mutable state (the resolve
/// cache) is kept outside, in a [`ResolveCache`].
#[derive(Debug, Clone)]
pub struct RuleTree {
    pub(crate) serial: u64,
    pub(crate) nodes: Vec<Node>,
    pub(crate) validate_roots: Vec<NodeId>,
    pub(crate) preprocess_roots: Vec<NodeId>,
}

impl RuleTree {
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        validate_roots: Vec<NodeId>,
        preprocess_roots: Vec<NodeId>,
    ) -> Self {
        Self {
            serial: NEXT_TREE_SERIAL.fetch_add(1, Ordering::Relaxed),
            nodes,
            validate_roots,
            preprocess_roots,
        }
    }

    /// Process-unique identity of this tree, used to bind caches to it.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Arena access for ids produced by this tree.
    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn validate_roots(&self) -> &[NodeId] {
        &self.validate_roots
    }

    #[must_use]
    pub fn preprocess_roots(&self) -> &[NodeId] {
        &self.preprocess_roots
    }

    /// The `validate` root with the given id, falling back to the first root
    /// when no id is given or none matches.
    #[must_use]
    pub fn validate_root(&self, id: Option<&str>) -> Option<NodeId> {
        self.select_root(&self.validate_roots, id)
    }

    /// The `preprocess` block with the given id, with the same fallback as
    /// [`validate_root`](Self::validate_root).
    #[must_use]
    pub fn preprocess_root(&self, id: Option<&str>) -> Option<NodeId> {
        self.select_root(&self.preprocess_roots, id)
    }

    fn select_root(&self, roots: &[NodeId], id: Option<&str>) -> Option<NodeId> {
        id.and_then(|wanted| {
            roots
                .iter()
                .copied()
                .find(|&r| self.get(r).id() == Some(wanted))
        })
        .or_else(|| roots.first().copied())
    }

    /// Run one validation pass: evaluate the selected `validate` root and
    /// collect the failures of every failed node carrying an `onerror` code.
    ///
    /// A tree without a `validate` root passes.
    pub fn validate(
        &self,
        form: &Form,
        catalog: &RuleCatalog,
        cache: &mut ResolveCache,
        event: &str,
        root: Option<&str>,
    ) -> ValidationOutcome {
        let start = Instant::now();
        let Some(root) = self.validate_root(root) else {
            tracing::warn!("rule tree has no validate block; passing");
            return ValidationOutcome::new(true, None, Vec::new(), start.elapsed());
        };
        let (passed, failures) = crate::evaluate::run(self, form, catalog, cache, event, root);
        ValidationOutcome::new(passed, Some(root), failures, start.elapsed())
    }

    /// Apply the value processors of the selected `preprocess` block to the
    /// live form. Returns how many field values were rewritten.
    pub fn apply_processors(
        &self,
        form: &mut Form,
        catalog: &RuleCatalog,
        cache: &mut ResolveCache,
        block: Option<&str>,
    ) -> usize {
        let Some(root) = self.preprocess_root(block) else {
            return 0;
        };
        let mut rewritten = 0;
        for &rule_id in &self.get(root).children {
            let rule = self.get(rule_id);
            let Some(kind) = rule.rule_type() else {
                continue;
            };
            let Some(processor) = catalog.processor(kind) else {
                tracing::debug!(processor = kind, "unknown processor; skipping");
                continue;
            };
            let targets = cache.resolve(self, form, rule_id, ResolveContext::Validation);
            for handle in targets.iter().filter_map(|t| t.field()) {
                let Some(field) = form.field_mut(handle) else {
                    continue;
                };
                let control = field.control();
                if !control.is_text()
                    || control == ControlType::File
                    || field.is_read_only()
                {
                    continue;
                }
                let value = processor(field.value(), &rule.params());
                if value != field.value() {
                    field.set_value(value);
                    rewritten += 1;
                }
            }
        }
        tracing::trace!(rewritten, "value processors applied");
        rewritten
    }
}

impl fmt::Display for RuleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleTree({} nodes, {} validate, {} preprocess)",
            self.nodes.len(),
            self.validate_roots.len(),
            self.preprocess_roots.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::RuleDocument;

    fn tree(xml: &str) -> crate::RuleTree {
        RuleDocument::from_xml(xml).unwrap().compile()
    }

    #[test]
    fn root_selection_by_id_with_fallback() {
        let t = tree(
            r#"<svarx>
                 <validate id="a"/>
                 <validate id="b"/>
                 <preprocess id="p"/>
               </svarx>"#,
        );
        let first = t.validate_roots()[0];
        let second = t.validate_roots()[1];
        assert_eq!(t.validate_root(None), Some(first));
        assert_eq!(t.validate_root(Some("b")), Some(second));
        assert_eq!(t.validate_root(Some("zzz")), Some(first));
        assert_eq!(t.preprocess_root(Some("p")), Some(t.preprocess_roots()[0]));
    }

    #[test]
    fn node_ids_are_preorder() {
        let t = tree(
            r#"<validate>
                 <block><rule type="required" for="a"/></block>
                 <rule type="required" for="b"/>
               </validate>"#,
        );
        let root = t.validate_roots()[0];
        assert_eq!(root.index(), 0);
        let children = t.node(root).unwrap().children();
        assert_eq!(children[0].index(), 1);
        assert_eq!(children[1].index(), 3);
    }

    #[test]
    fn serials_are_unique() {
        let a = tree("<validate/>");
        let b = tree("<validate/>");
        assert_ne!(a.serial(), b.serial());
    }

    #[test]
    fn display_counts() {
        let t = tree(r#"<svarx><validate><rule type="required" for="x"/></validate></svarx>"#);
        assert_eq!(t.to_string(), "RuleTree(2 nodes, 1 validate, 0 preprocess)");
    }
}
