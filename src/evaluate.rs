use crate::catalog::RuleCatalog;
use crate::resolve::{ResolveCache, ResolveContext};
use crate::types::{Failure, Field, FieldHandle, Form, Node, NodeId, NodeKind, RuleTree, Target};

const REQUIRED: &str = "required";

/// One validation pass. Fire markers live here, so they start clear on
/// every pass and cannot outlive it.
struct Pass<'a> {
    tree: &'a RuleTree,
    form: &'a Form,
    catalog: &'a RuleCatalog,
    cache: &'a mut ResolveCache,
    fire: Vec<bool>,
}

/// Evaluate `root`, then collect the failures of the marked subtree.
pub(crate) fn run(
    tree: &RuleTree,
    form: &Form,
    catalog: &RuleCatalog,
    cache: &mut ResolveCache,
    event: &str,
    root: NodeId,
) -> (bool, Vec<Failure>) {
    let mut pass = Pass {
        tree,
        form,
        catalog,
        cache,
        fire: vec![false; tree.len()],
    };

    let passed = pass.evaluate(root);
    let mut failures = Vec::new();
    if !passed {
        pass.fire(root, event, &mut failures);
    }

    tracing::debug!(
        event,
        root = %root,
        passed,
        failures = failures.len(),
        "validation pass finished"
    );
    (passed, failures)
}

impl Pass<'_> {
    fn evaluate(&mut self, id: NodeId) -> bool {
        let tree = self.tree;
        let node = tree.get(id);
        let result = match node.kind {
            NodeKind::Rule => self.evaluate_rule(id, node),
            NodeKind::Validate | NodeKind::Block => {
                // Every child is evaluated so every failed descendant is marked.
                let results: Vec<bool> = node.children.iter().map(|&c| self.evaluate(c)).collect();
                node.combinator.combine(&results) != node.inverted
            }
            NodeKind::Preprocess => true,
        };
        if !result {
            self.fire[id.index()] = true;
        }
        result
    }

    fn evaluate_rule(&mut self, id: NodeId, node: &Node) -> bool {
        // Global rule: sees the whole form, no count or emptiness checks.
        if node.field_count == 0 {
            let fields: Vec<&Field> = self.form.iter().map(|(_, f)| f).collect();
            return self.call(node, &fields);
        }

        let form = self.form;
        let targets = self
            .cache
            .resolve(self.tree, form, id, ResolveContext::Validation);

        let mut handles: Vec<FieldHandle> = Vec::with_capacity(targets.len());
        let mut whole_form = false;
        for target in targets {
            match target {
                Target::Field(h) if form.field(h).is_some() => handles.push(h),
                Target::Field(_) => {}
                Target::Form => whole_form = true,
            }
        }

        let found = handles.len() + usize::from(whole_form);
        if found != node.field_count {
            tracing::trace!(
                node = %id,
                expected = node.field_count,
                found,
                "rule targets missing"
            );
            return !node.fail_if_null;
        }

        // An unnamed `el` stands for the form, which is never empty: the
        // predicate sees the named fields followed by the rest of the form.
        if whole_form {
            let fields: Vec<&Field> = handles
                .iter()
                .filter_map(|&h| form.field(h))
                .chain(
                    form.iter()
                        .filter(|(h, _)| !handles.contains(h))
                        .map(|(_, f)| f),
                )
                .collect();
            return self.call(node, &fields);
        }

        let fields: Vec<&Field> = handles.iter().filter_map(|&h| form.field(h)).collect();
        let required = node.rule_type() == Some(REQUIRED);
        if required {
            return self.call(node, &fields);
        }
        let filled: Vec<&Field> = fields.into_iter().filter(|f| !f.is_blank()).collect();
        if filled.is_empty() {
            return true;
        }
        self.call(node, &filled)
    }

    fn call(&self, node: &Node, fields: &[&Field]) -> bool {
        let kind = node.rule_type();
        let predicate = kind
            .and_then(|k| self.catalog.predicate(k))
            .or_else(|| self.catalog.fallback());
        let Some(predicate) = predicate else {
            tracing::debug!(rule_type = kind.unwrap_or_default(), "unknown rule type; passing");
            return true;
        };
        match predicate(fields, &node.params()) {
            Ok(result) => result != node.inverted,
            Err(fault) => {
                tracing::warn!(
                    rule_type = kind.unwrap_or_default(),
                    error = %fault,
                    "rule fault; passing"
                );
                true
            }
        }
    }

    fn fire(&mut self, id: NodeId, event: &str, failures: &mut Vec<Failure>) {
        if !std::mem::take(&mut self.fire[id.index()]) {
            return;
        }
        let tree = self.tree;
        let node = tree.get(id);
        if let Some(code) = node.on_error() {
            let targets = self
                .cache
                .resolve(tree, self.form, id, ResolveContext::ErrorTarget);
            if targets.is_empty() {
                tracing::debug!(node = %id, code, "error target resolves to nothing; not reported");
            } else {
                tracing::trace!(node = %id, code, targets = targets.len(), "firing");
                failures.push(Failure::new(id, code, event, targets, node.attrs.clone()));
            }
        }
        if node.kind != NodeKind::Rule {
            for &child in &node.children {
                self.fire(child, event, failures);
            }
        }
    }
}
