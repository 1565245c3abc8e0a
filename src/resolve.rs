use std::collections::HashMap;

use crate::types::{
    FieldRef, Form, NodeId, NodeKind, RuleTree, Target, TargetDecl, TargetSpec,
};

/// Which declaration set of a node to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveContext {
    /// `for` / `item` / `el`: the fields a rule validates.
    Validation,
    /// `errtarget` / `errtargetitem` / `errtarget` children: the fields that
    /// receive a failure. Falls back to the validation declarations.
    ErrorTarget,
}

/// Memoised field resolution for one [`RuleTree`] against one form.
///
/// Entries are keyed by node index and context. The cache binds itself to
/// the first tree it is used with and clears itself when handed a different
/// tree, so an entry can never be read against the wrong arena.
///
/// Resolution results depend on the form's field set (names, order,
/// disabled state), not on values. Call [`reset`](Self::reset) whenever that
/// set may have changed.
#[derive(Debug, Default)]
pub struct ResolveCache {
    tree: Option<u64>,
    entries: HashMap<(NodeId, ResolveContext), Vec<Target>>,
}

impl ResolveCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached resolution.
    pub fn reset(&mut self) {
        if !self.entries.is_empty() {
            tracing::trace!(entries = self.entries.len(), "resolve cache reset");
        }
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a node's targets in the given context.
    ///
    /// The result is de-duplicated and ordered by first occurrence. A named
    /// reference that matches no live field contributes nothing; an absent
    /// declaration contributes [`Target::Form`].
    pub fn resolve(
        &mut self,
        tree: &RuleTree,
        form: &Form,
        node: NodeId,
        context: ResolveContext,
    ) -> Vec<Target> {
        if self.tree != Some(tree.serial()) {
            self.reset();
            self.tree = Some(tree.serial());
        }
        if let Some(hit) = self.entries.get(&(node, context)) {
            return hit.clone();
        }
        let resolved = self.resolve_uncached(tree, form, node, context);
        self.entries.insert((node, context), resolved.clone());
        resolved
    }

    fn resolve_uncached(
        &mut self,
        tree: &RuleTree,
        form: &Form,
        node: NodeId,
        context: ResolveContext,
    ) -> Vec<Target> {
        let n = tree.get(node);
        let spec = match context {
            ResolveContext::Validation => &n.target,
            ResolveContext::ErrorTarget => n.error_target.as_ref().unwrap_or(&n.target),
        };

        let mut out = Vec::new();
        match spec {
            TargetSpec::Field(r) => push_field(&mut out, form, r),
            TargetSpec::Form => push_unique(&mut out, Target::Form),
            TargetSpec::List(decls) => {
                for decl in decls {
                    match decl {
                        TargetDecl::Field(r) => push_field(&mut out, form, r),
                        TargetDecl::Form => push_unique(&mut out, Target::Form),
                        TargetDecl::Children => {
                            let rules: Vec<NodeId> = n
                                .children
                                .iter()
                                .copied()
                                .filter(|&c| tree.get(c).kind == NodeKind::Rule)
                                .collect();
                            for child in rules {
                                for t in self.resolve(tree, form, child, ResolveContext::ErrorTarget) {
                                    push_unique(&mut out, t);
                                }
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn push_field(out: &mut Vec<Target>, form: &Form, field: &FieldRef) {
    if let Some(handle) = form.find(&field.name, field.item) {
        push_unique(out, Target::Field(handle));
    }
}

fn push_unique(out: &mut Vec<Target>, target: Target) {
    if !out.contains(&target) {
        out.push(target);
    }
}
