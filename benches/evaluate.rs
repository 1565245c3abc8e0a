use criterion::{black_box, criterion_group, criterion_main, Criterion};
use formlogic::{Field, Form, ResolveCache, RuleCatalog, RuleDocument, RuleTree};

/// A document with `n` conditional blocks, each requiring field `t{i}` when
/// checkbox `c{i}` is ticked and `e{i}` otherwise.
fn build_source(n: usize) -> String {
    let mut xml = String::from("<validate>");
    for i in 0..n {
        xml.push_str(&format!(
            r#"<block logic="if">
                 <rule type="checked" for="c{i}"/>
                 <rule type="required" for="t{i}" onerror="T{i}"/>
                 <rule type="range" for="e{i}" min="0" max="100" onerror="E{i}"/>
               </block>"#
        ));
    }
    xml.push_str("</validate>");
    xml
}

fn build_form(n: usize) -> Form {
    let mut form = Form::new();
    for i in 0..n {
        form.push(Field::checkbox(&format!("c{i}"), i % 2 == 0));
        form.push(Field::text(&format!("t{i}"), "filled"));
        form.push(Field::text(&format!("e{i}"), "42"));
    }
    form
}

fn build_tree(n: usize) -> RuleTree {
    RuleDocument::from_xml(&build_source(n)).unwrap().compile()
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let catalog = RuleCatalog::new();

    for &n in &[5, 20, 50] {
        let tree = build_tree(n);
        let form = build_form(n);

        group.bench_function(&format!("{n}_blocks_warm_cache"), |b| {
            let mut cache = ResolveCache::new();
            b.iter(|| tree.validate(black_box(&form), &catalog, &mut cache, "submit", None));
        });

        group.bench_function(&format!("{n}_blocks_cold_cache"), |b| {
            b.iter(|| {
                let mut cache = ResolveCache::new();
                tree.validate(black_box(&form), &catalog, &mut cache, "submit", None)
            });
        });
    }

    group.finish();
}

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");

    for &n in &[5, 20, 50] {
        let source = build_source(n);
        group.bench_function(&format!("{n}_blocks_parse"), |b| {
            b.iter(|| RuleDocument::from_xml(black_box(&source)).unwrap());
        });
        group.bench_function(&format!("{n}_blocks_parse_and_compile"), |b| {
            b.iter(|| black_box(RuleDocument::from_xml(black_box(&source)).unwrap().compile()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validate, bench_compilation);
criterion_main!(benches);
