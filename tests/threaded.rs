use std::sync::Arc;
use std::thread;

use formlogic::{Field, Form, ResolveCache, RuleCatalog, RuleDocument, RuleTree, Session};

fn shared_tree() -> Arc<RuleTree> {
    Arc::new(
        RuleDocument::from_xml(
            r#"<validate>
                 <rule type="required" for="user" onerror="USER"/>
                 <rule type="regexp" for="zip" match="[0-9]{5}" onerror="ZIP"/>
                 <block logic="if">
                   <rule type="checked" for="ship"/>
                   <rule type="required" for="address" onerror="ADDRESS"/>
                 </block>
               </validate>"#,
        )
        .unwrap()
        .compile(),
    )
}

fn form(user: &str, zip: &str, ship: bool, address: &str) -> Form {
    Form::new()
        .with(Field::text("user", user))
        .with(Field::text("zip", zip))
        .with(Field::checkbox("ship", ship))
        .with(Field::text("address", address))
}

#[test]
fn evaluate_across_threads() {
    let tree = shared_tree();
    let catalog = RuleCatalog::new();

    let cases = vec![
        (form("ada", "12345", true, "1 Loop"), Vec::<&str>::new()),
        (form("", "12345", false, ""), vec!["USER"]),
        (form("ada", "1234", false, ""), vec!["ZIP"]),
        (form("ada", "12345", true, ""), vec!["ADDRESS"]),
    ];

    let handles: Vec<_> = cases
        .into_iter()
        .map(|(form, expected)| {
            let tree = Arc::clone(&tree);
            let catalog = catalog.clone();
            thread::spawn(move || {
                let mut cache = ResolveCache::new();
                for _ in 0..50 {
                    let outcome = tree.validate(&form, &catalog, &mut cache, "submit", None);
                    assert_eq!(outcome.codes(), expected);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn one_session_per_thread() {
    let tree = shared_tree();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                let mut session = Session::new(tree);
                let zip = if i % 2 == 0 { "12345" } else { "oops" };
                let mut form = form("ada", zip, false, "");
                session.run(&mut form, "submit").passed()
            })
        })
        .collect();

    let results: Vec<Option<bool>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, passed) in results.into_iter().enumerate() {
        assert_eq!(passed, Some(i % 2 == 0));
    }
}

#[test]
fn tree_and_catalog_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RuleTree>();
    assert_send_sync::<RuleCatalog>();
    fn assert_send<T: Send>() {}
    assert_send::<Session>();
    assert_send::<ResolveCache>();
}
