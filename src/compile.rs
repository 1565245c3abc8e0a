use crate::preprocess::unwrap_conditionals;
use crate::types::{Combinator, Logic, Node, NodeId, NodeKind, RuleDocument, RuleNode, RuleTree};

/// Unwrap conditionals in every `validate` root, then flatten the document
/// into a preorder arena.
pub(crate) fn compile(document: RuleDocument) -> RuleTree {
    let mut nodes = Vec::new();

    let validate_roots: Vec<NodeId> = document
        .validate
        .into_iter()
        .map(|root| flatten(unwrap_conditionals(root), &mut nodes))
        .collect();

    let preprocess_roots: Vec<NodeId> = document
        .preprocess
        .into_iter()
        .map(|root| flatten(root, &mut nodes))
        .collect();

    let tree = RuleTree::from_parts(nodes, validate_roots, preprocess_roots);
    tracing::debug!(
        serial = tree.serial(),
        nodes = tree.len(),
        validate = tree.validate_roots().len(),
        preprocess = tree.preprocess_roots().len(),
        "rule tree compiled"
    );
    tree
}

fn flatten(node: RuleNode, nodes: &mut Vec<Node>) -> NodeId {
    let id = NodeId::new(nodes.len());
    let target = node.target();
    let field_count = if node.kind == NodeKind::Rule {
        target.declared_count()
    } else {
        0
    };
    let combinator = match node.logic {
        Logic::Or => Combinator::Any,
        Logic::And | Logic::If => Combinator::All,
    };

    nodes.push(Node {
        kind: node.kind,
        combinator,
        inverted: node.inverted,
        fail_if_null: node.fail_if_null,
        field_count,
        error_target: node.error_target(),
        target,
        attrs: node.attrs,
        children: Vec::new(),
    });

    let children: Vec<NodeId> = node
        .children
        .into_iter()
        .map(|child| flatten(child, nodes))
        .collect();
    nodes[id.index()].children = children;
    id
}
