use criterion::{black_box, criterion_group, criterion_main, Criterion};
use doenet_parser::parse;

fn parse_small_document(c: &mut Criterion) {
    let source = r#"
<text name="t">hello</text>
<booleanInput name="bi" />
<p>$t and $bi.value</p>
"#;

    c.bench_function("parse_small_document", |b| b.iter(|| parse(black_box(source))));
}

fn parse_nested_graphs(c: &mut Criterion) {
    let mut source = String::new();
    for i in 0..50 {
        source.push_str(&format!(
            r#"<graph name="g{i}" newNamespace>
  <equilibriumLine name="A" switchable>y={i}</equilibriumLine>
  <equilibriumLine name="B" stable="$(../b{i})">y=-{i}</equilibriumLine>
</graph>
<booleanInput name="b{i}" />
"#
        ));
    }

    c.bench_function("parse_nested_graphs", |b| b.iter(|| parse(black_box(&source))));
}

criterion_group!(benches, parse_small_document, parse_nested_graphs);
criterion_main!(benches);
