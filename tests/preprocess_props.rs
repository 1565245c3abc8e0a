
use formlogic::{NodeKind, ResolveCache, RuleCatalog, RuleDocument, RuleTree};
use proptest::prelude::*;
use strategies::{arb_conditional, arb_form, arb_node, GenForm, GenNode};

fn compile(node: &GenNode) -> RuleTree {
    RuleDocument::from_xml(&node.document()).unwrap().compile()
}

fn run(tree: &RuleTree, form: GenForm, cache: &mut ResolveCache) -> (bool, Vec<String>) {
    let outcome = tree.validate(&form.to_form(), &RuleCatalog::new(), cache, "submit", None);
    (
        outcome.passed(),
        outcome.codes().into_iter().map(str::to_owned).collect(),
    )
}

// ---------------------------------------------------------------------------
// Conditional unwrapping preserves meaning
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn conditional_matches_boolean_formula(node in arb_conditional(), form in arb_form()) {
        let tree = compile(&node);
        let (passed, _) = run(&tree, form, &mut ResolveCache::new());
        prop_assert_eq!(passed, node.expected(form));
    }

    #[test]
    fn nested_tree_matches_reference(node in arb_node(), form in arb_form()) {
        let tree = compile(&node);
        let (passed, _) = run(&tree, form, &mut ResolveCache::new());
        prop_assert_eq!(passed, node.expected(form));
    }
}

// ---------------------------------------------------------------------------
// Compiled trees carry no conditionals and consistent field counts
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn compiled_tree_is_plain_logic(node in arb_node()) {
        let tree = compile(&node);
        for (_, n) in tree.nodes() {
            prop_assert_ne!(n.attributes().get("logic"), Some("if"));
            if n.kind() == NodeKind::Rule {
                prop_assert_eq!(n.field_count(), n.target().declared_count());
                prop_assert!(n.children().is_empty());
            } else {
                prop_assert_eq!(n.field_count(), 0);
            }
        }
        prop_assert_eq!(tree.validate_roots().len(), 1);
        let root = tree.node(tree.validate_roots()[0]).unwrap();
        prop_assert_eq!(root.kind(), NodeKind::Validate);
    }

    #[test]
    fn node_ids_are_preorder(node in arb_node()) {
        let tree = compile(&node);
        for (id, n) in tree.nodes() {
            for child in n.children() {
                prop_assert!(child.index() > id.index());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fail-open and determinism
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn unknown_rule_always_passes(
        value in "[a-z ]{0,6}",
        inverted in any::<bool>(),
        fail_if_null in any::<bool>(),
        kind in "[a-z]{3,12}-xyz",
    ) {
        let mut attrs = String::new();
        if inverted {
            attrs.push_str(r#" inverted="yes""#);
        }
        if fail_if_null {
            attrs.push_str(r#" failifnull="yes""#);
        }
        let tree = RuleDocument::from_xml(&format!(
            r#"<validate><rule type="{kind}" for="a"{attrs} onerror="U"/></validate>"#
        ))
        .unwrap()
        .compile();
        let form = formlogic::Form::new().with(formlogic::Field::text("a", &value));
        let outcome = tree.validate(&form, &RuleCatalog::new(), &mut ResolveCache::new(), "submit", None);
        prop_assert!(outcome.passed());
        prop_assert!(outcome.failures().is_empty());
    }

    #[test]
    fn repeated_passes_agree(node in arb_node(), first in arb_form(), second in arb_form()) {
        let tree = compile(&node);
        let mut shared = ResolveCache::new();
        let a = run(&tree, first, &mut shared);
        let _ = run(&tree, second, &mut shared);
        let b = run(&tree, first, &mut shared);
        let c = run(&tree, first, &mut ResolveCache::new());
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(&a, &c);
    }

    #[test]
    fn failures_only_when_failed(node in arb_node(), form in arb_form()) {
        let tree = compile(&node);
        let (passed, codes) = run(&tree, form, &mut ResolveCache::new());
        if passed {
            prop_assert!(codes.is_empty());
        } else if let Some(code) = node.code().filter(|_| !matches!(node, GenNode::Block { .. })) {
            // A failed top-level rule is the only node that can fire first.
            prop_assert_eq!(codes.first().cloned(), Some(format!("E{code}")));
        }
    }
}
