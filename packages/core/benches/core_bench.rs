use criterion::{black_box, criterion_group, criterion_main, Criterion};
use doenet_core::{snapshot, DoenetCore};
use serde_json::json;

fn graphs_document(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        source.push_str(&format!(
            r#"<graph name="g{i}" newNamespace>
  <equilibriumLine name="A" switchable>y={i}</equilibriumLine>
  <equilibriumLine name="B" stable="$(../b{i})" switchable>y=-{i}</equilibriumLine>
</graph>
<booleanInput name="b{i}" />
$g{i}{{name="copy{i}"}}
"#
        ));
    }
    source
}

fn build_document(c: &mut Criterion) {
    let source = graphs_document(20);
    c.bench_function("build_20_graphs", |b| {
        b.iter(|| DoenetCore::from_source(black_box(&source)))
    });
}

fn full_evaluation(c: &mut Criterion) {
    let source = graphs_document(20);
    c.bench_function("snapshot_20_graphs", |b| {
        b.iter_batched(
            || DoenetCore::from_source(&source).unwrap(),
            |mut core| snapshot(&mut core),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn action_round_trip(c: &mut Criterion) {
    let source = graphs_document(20);
    let mut core = DoenetCore::from_source(&source).unwrap();
    c.bench_function("switch_and_read", |b| {
        b.iter(|| {
            core.dispatch("/g7/B", "switchLine", json!({})).unwrap();
            core.read(black_box("/copy7/B"), "stable").unwrap()
        })
    });
}

fn editor_commit(c: &mut Criterion) {
    let mut core = DoenetCore::from_source(r#"<codeEditor name="ce" showResults/>"#).unwrap();
    let mut n = 0u64;
    c.bench_function("code_editor_commit", |b| {
        b.iter(|| {
            n += 1;
            let text = format!(r#"<p>run {n}</p><math name="m">{n} + 1</math>"#);
            core.dispatch("/ce", "updateImmediateValue", json!({ "text": text }))
                .unwrap();
            core.flush_pending().unwrap();
        })
    });
}

criterion_group!(benches, build_document, full_evaluation, action_round_trip, editor_commit);
criterion_main!(benches);
