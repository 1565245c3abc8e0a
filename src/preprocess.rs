use std::fmt;

use crate::types::{Attributes, Logic, NodeKind, RuleDocument, RuleNode, TargetDecl};
use crate::types::node::{ATTR_ID, ATTR_INVERTED, ATTR_LOGIC};

/// Rewrite every `logic="if"` node under `node` into plain `and`/`or` logic.
///
/// Children are rewritten first, so a conditional nested anywhere (even as
/// the condition of another conditional) is already plain logic when its
/// parent is unwrapped.
///
/// * `if C then T` becomes `or(¬C, T)`.
/// * `if C then T else E` becomes `and(or(¬C, T), or(C, E))`. The wrapper
///   takes the node's place and its `inverted` flag; both halves keep the
///   node's other attributes and declarations.
/// * Any other branch count degrades to `and` and is logged.
pub(crate) fn unwrap_conditionals(mut node: RuleNode) -> RuleNode {
    node.children = std::mem::take(&mut node.children)
        .into_iter()
        .map(unwrap_conditionals)
        .collect();

    if node.logic != Logic::If {
        return node;
    }

    match node.children.len() {
        2 => implication(node),
        3 => if_then_else(node),
        branches => {
            tracing::warn!(
                branches,
                id = node.id().unwrap_or_default(),
                "conditional block needs 2 or 3 branches; evaluating as 'and'"
            );
            node.set_logic(Logic::And);
            node
        }
    }
}

/// `if C then T` as `or(¬C, T)`.
fn implication(mut node: RuleNode) -> RuleNode {
    node.set_logic(Logic::Or);
    if let Some(condition) = node.children.first_mut() {
        condition.toggle_inversion();
    }
    node
}

/// `if C then T else E` as `and(or(¬C, T), or(C, E))`.
///
/// An inverted conditional negates the whole expression, so `inverted`
/// moves onto the wrapper and both halves are left uninverted.
fn if_then_else(node: RuleNode) -> RuleNode {
    let mut wrapper_attrs = Attributes::new().with(ATTR_LOGIC, Logic::And.as_str());
    if node.inverted {
        wrapper_attrs.insert(ATTR_INVERTED, ATTR_INVERTED);
    }
    // A validate root stays a root, still selectable by id.
    let wrapper_kind = if node.kind == NodeKind::Validate {
        if let Some(id) = node.id() {
            wrapper_attrs.insert(ATTR_ID, id);
        }
        NodeKind::Validate
    } else {
        NodeKind::Block
    };

    let mut half = node;
    half.kind = NodeKind::Block;
    half.set_inverted(false);
    half.set_logic(Logic::Or);

    let mut else_half = half.clone();
    else_half.children.remove(1);

    let mut then_half = half;
    then_half.children.truncate(2);
    then_half.children[0].toggle_inversion();

    let mut wrapper = RuleNode::new(wrapper_kind, wrapper_attrs);
    wrapper.children = vec![then_half, else_half];
    wrapper
}

/// A construct that loads and evaluates, but probably not as intended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lint {
    /// Location such as `validate[0]/block[1]/rule[0]`.
    pub path: String,
    pub kind: LintKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintKind {
    /// `logic="if"` with a branch count other than 2 or 3.
    MalformedConditional { branches: usize },
    /// A `logic` value other than `and`, `or`, `if`; read as `and`.
    UnknownLogic { value: String },
    /// A `rule` without a `type`; it always passes.
    MissingRuleType,
    /// An `el` without a `name`; it stands for the whole form.
    UnnamedElement,
    /// A `validate` or `preprocess` element inside a node; it was skipped.
    NestedRoot { element: String },
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LintKind::MalformedConditional { branches } => write!(
                f,
                "{}: conditional block has {branches} branches, expected 2 or 3",
                self.path
            ),
            LintKind::UnknownLogic { value } => {
                write!(f, "{}: unknown logic '{value}', read as 'and'", self.path)
            }
            LintKind::MissingRuleType => write!(f, "{}: rule has no type", self.path),
            LintKind::UnnamedElement => write!(f, "{}: el without name", self.path),
            LintKind::NestedRoot { element } => {
                write!(f, "{}: nested '{element}' ignored", self.path)
            }
        }
    }
}

pub(crate) fn lint(document: &RuleDocument) -> Vec<Lint> {
    let mut out = Vec::new();
    for (i, root) in document.validate_roots().iter().enumerate() {
        lint_node(root, format!("validate[{i}]"), &mut out);
    }
    for (i, root) in document.preprocess_roots().iter().enumerate() {
        lint_node(root, format!("preprocess[{i}]"), &mut out);
    }
    out
}

fn lint_node(node: &RuleNode, path: String, out: &mut Vec<Lint>) {
    for element in &node.nested {
        out.push(Lint {
            path: path.clone(),
            kind: LintKind::NestedRoot {
                element: element.clone(),
            },
        });
    }
    if node.kind.is_combining() {
        if let Some(value) = node.attrs.get(ATTR_LOGIC) {
            if !matches!(value, "and" | "or" | "if") {
                out.push(Lint {
                    path: path.clone(),
                    kind: LintKind::UnknownLogic {
                        value: value.to_owned(),
                    },
                });
            }
        }
        if node.logic == Logic::If && !matches!(node.children.len(), 2 | 3) {
            out.push(Lint {
                path: path.clone(),
                kind: LintKind::MalformedConditional {
                    branches: node.children.len(),
                },
            });
        }
    }
    if node.kind == NodeKind::Rule {
        if node.rule_type().is_none() {
            out.push(Lint {
                path: path.clone(),
                kind: LintKind::MissingRuleType,
            });
        }
        if node.elements.iter().any(|d| *d == TargetDecl::Form) {
            out.push(Lint {
                path: path.clone(),
                kind: LintKind::UnnamedElement,
            });
        }
    }

    let mut rules = 0;
    let mut blocks = 0;
    for child in &node.children {
        let index = if child.kind == NodeKind::Rule {
            rules += 1;
            rules - 1
        } else {
            blocks += 1;
            blocks - 1
        };
        lint_node(child, format!("{path}/{}[{index}]", child.kind.tag()), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(xml: &str) -> RuleNode {
        RuleDocument::from_xml(xml)
            .unwrap()
            .validate_roots()
            .first()
            .cloned()
            .unwrap()
    }

    fn no_conditionals(node: &RuleNode) -> bool {
        node.logic != Logic::If && node.children.iter().all(no_conditionals)
    }

    #[test]
    fn two_branches_become_implication() {
        let out = unwrap_conditionals(root(
            r#"<validate><block logic="if">
                 <rule type="checked" for="subscribe"/>
                 <rule type="required" for="email"/>
               </block></validate>"#,
        ));
        let block = &out.children()[0];
        assert_eq!(block.logic(), Logic::Or);
        assert_eq!(block.attributes().get("logic"), Some("or"));
        assert!(block.children()[0].is_inverted());
        assert!(block.children()[0].fails_if_null());
        assert!(!block.children()[1].is_inverted());
    }

    #[test]
    fn three_branches_split_into_two_halves() {
        let out = unwrap_conditionals(root(
            r#"<validate><block logic="if" onerror="E" inverted="yes">
                 <rule type="checked" for="c"/>
                 <rule type="required" for="t"/>
                 <rule type="required" for="e"/>
               </block></validate>"#,
        ));
        assert_eq!(out.children().len(), 1);
        let wrapper = &out.children()[0];
        assert_eq!(wrapper.kind(), NodeKind::Block);
        assert_eq!(wrapper.logic(), Logic::And);
        assert!(wrapper.is_inverted());
        assert_eq!(wrapper.on_error(), None);

        let then_half = &wrapper.children()[0];
        let else_half = &wrapper.children()[1];
        for half in [then_half, else_half] {
            assert_eq!(half.kind(), NodeKind::Block);
            assert_eq!(half.logic(), Logic::Or);
            assert!(!half.is_inverted());
            assert_eq!(half.on_error(), Some("E"));
            assert_eq!(half.children().len(), 2);
        }
        assert!(then_half.children()[0].is_inverted());
        assert_eq!(then_half.children()[1].attributes().get("for"), Some("t"));
        assert!(!else_half.children()[0].is_inverted());
        assert_eq!(else_half.children()[1].attributes().get("for"), Some("e"));
    }

    #[test]
    fn conditional_validate_root_keeps_id() {
        let out = unwrap_conditionals(root(
            r#"<validate id="main" logic="if">
                 <rule type="checked" for="c"/>
                 <rule type="required" for="t"/>
                 <rule type="required" for="e"/>
               </validate>"#,
        ));
        assert_eq!(out.kind(), NodeKind::Validate);
        assert_eq!(out.id(), Some("main"));
        assert_eq!(out.children().len(), 2);
        assert!(out.children().iter().all(|h| h.kind() == NodeKind::Block));
    }

    #[test]
    fn nested_conditionals_all_unwrapped() {
        let out = unwrap_conditionals(root(
            r#"<validate><block logic="if">
                 <block logic="if">
                   <rule type="checked" for="a"/>
                   <rule type="checked" for="b"/>
                   <rule type="checked" for="c"/>
                 </block>
                 <block logic="if">
                   <rule type="checked" for="d"/>
                   <rule type="checked" for="e"/>
                 </block>
                 <rule type="required" for="f"/>
               </block></validate>"#,
        ));
        assert!(no_conditionals(&out));
        // The negated condition is the rewritten wrapper.
        let cond = &out.children()[0].children()[0].children()[0];
        assert_eq!(cond.logic(), Logic::And);
        assert!(cond.is_inverted());
    }

    #[test]
    fn malformed_conditional_degrades_to_and() {
        let out = unwrap_conditionals(root(
            r#"<validate><block logic="if"><rule type="required" for="a"/></block></validate>"#,
        ));
        let block = &out.children()[0];
        assert_eq!(block.logic(), Logic::And);
        assert!(!block.children()[0].is_inverted());
    }

    #[test]
    fn lint_reports_malformed_constructs() {
        let doc = RuleDocument::from_xml(
            r#"<svarx>
                 <validate logic="xor">
                   <block logic="if"><rule for="a"/></block>
                   <rule type="eq"><el name="a"/><el/></rule>
                   <block><preprocess/></block>
                 </validate>
                 <preprocess><rule for="x"/></preprocess>
               </svarx>"#,
        )
        .unwrap();
        let lints = doc.lint();
        let kinds: Vec<_> = lints.iter().map(|l| (l.path.as_str(), &l.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("validate[0]", &LintKind::UnknownLogic { value: "xor".into() }),
                ("validate[0]/block[0]", &LintKind::MalformedConditional { branches: 1 }),
                ("validate[0]/block[0]/rule[0]", &LintKind::MissingRuleType),
                ("validate[0]/rule[0]", &LintKind::UnnamedElement),
                (
                    "validate[0]/block[1]",
                    &LintKind::NestedRoot { element: "preprocess".into() }
                ),
                ("preprocess[0]/rule[0]", &LintKind::MissingRuleType),
            ]
        );
        assert_eq!(
            lints[1].to_string(),
            "validate[0]/block[0]: conditional block has 1 branches, expected 2 or 3"
        );
        assert_eq!(lints[4].to_string(), "validate[0]/block[1]: nested 'preprocess' ignored");
    }

    #[test]
    fn clean_document_has_no_lints() {
        let doc = RuleDocument::from_xml(
            r#"<validate><block logic="if">
                 <rule type="checked" for="c"/><rule type="required" for="t"/>
               </block></validate>"#,
        )
        .unwrap();
        assert!(doc.lint().is_empty());
    }
}
