/// Variant selection end to end: requested indices and names, saved
/// variants, observers, and components whose children do not count.
use crate::engine::{ActionQueue, CoreObserver, CoreOptions, DoenetCore};
use crate::error::DiagnosticLevel;
use crate::persistence::{PersistedState, SavedVariant};
use crate::snapshot::snapshot;
use crate::value::StateValue;
use crate::variants::{VariantRecord, VariantRequest};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

const FIVE: &str = r#"<selectFromSequence name="s" from="1" to="5" assignNames="n"/>"#;

fn with_variant(source: &str, request: VariantRequest) -> DoenetCore {
    DoenetCore::new(
        source,
        CoreOptions {
            variant: Some(request),
            ..Default::default()
        },
    )
    .unwrap()
}

fn selected(core: &mut DoenetCore) -> f64 {
    core.read("/n", "value").unwrap().as_f64().unwrap()
}

#[test]
fn test_index_selects_value() {
    let mut core = with_variant(FIVE, VariantRequest::Index(3));
    assert_eq!(core.variant().index, 3);
    assert_eq!(core.variant().name, "c");
    assert_eq!(core.variant().all_possible_variants, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(selected(&mut core), 3.0);
    assert_eq!(core.read("/s", "selectedIndex").unwrap(), StateValue::Integer(3));
}

#[test]
fn test_name_and_wrapping() {
    let mut by_name = with_variant(FIVE, VariantRequest::Name("b".into()));
    assert_eq!(selected(&mut by_name), 2.0);

    let mut wrapped = with_variant(FIVE, VariantRequest::Index(7));
    assert_eq!(wrapped.variant().index, 2);
    assert_eq!(selected(&mut wrapped), 2.0);

    let negative = with_variant(FIVE, VariantRequest::Index(0));
    assert_eq!(negative.variant().index, 5);
}

#[test]
fn test_unknown_name_falls_back_with_warning() {
    let mut core = with_variant(FIVE, VariantRequest::Name("zz".into()));
    assert_eq!(core.variant().index, 1);
    assert_eq!(selected(&mut core), 1.0);
    assert!(core
        .diagnostics()
        .iter()
        .any(|d| d.level == DiagnosticLevel::Warning && d.message.contains("zz")));
}

#[test]
fn test_same_variant_same_document() {
    let source = r#"<p><selectFromSequence name="x" to="4" assignNames="a"/></p>
<selectFromSequence name="y" from="10" to="12" assignNames="b"/>"#;
    for index in 1..=12 {
        let mut first = with_variant(source, VariantRequest::Index(index));
        let mut second = with_variant(source, VariantRequest::Index(index));
        assert_eq!(
            first.read("/a", "value").unwrap(),
            second.read("/a", "value").unwrap()
        );
        assert_eq!(
            first.read("/b", "value").unwrap(),
            second.read("/b", "value").unwrap()
        );
    }

    // 12 variants cover every combination exactly once
    let mut seen = std::collections::HashSet::new();
    for index in 1..=12 {
        let mut core = with_variant(source, VariantRequest::Index(index));
        let a = core.read("/a", "value").unwrap().to_text();
        let b = core.read("/b", "value").unwrap().to_text();
        seen.insert((a, b));
    }
    assert_eq!(seen.len(), 12);
}

#[test]
fn test_saved_variant_is_reused() {
    let state = PersistedState {
        variant: Some(SavedVariant {
            index: 4,
            name: "d".into(),
        }),
        ..Default::default()
    };
    let mut core = DoenetCore::new(
        FIVE,
        CoreOptions {
            state: Some(state),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(core.variant().name, "d");
    assert_eq!(selected(&mut core), 4.0);
}

#[test]
fn test_editor_children_do_not_count() {
    let core = DoenetCore::from_source(
        r#"<codeEditor name="ce"><selectFromSequence to="7"/></codeEditor>
<selectFromSequence to="3"/>"#,
    )
    .unwrap();
    assert_eq!(core.variant().all_possible_variants.len(), 3);
}

#[test]
fn test_generated_components_get_stable_indices() {
    let read_generated = |index: i64| {
        let mut core = with_variant(
            r#"<codeEditor name="ce" showResults/><selectFromSequence to="2"/>"#,
            VariantRequest::Index(index),
        );
        core.dispatch(
            "/ce",
            "updateImmediateValue",
            json!({"text": r#"<selectFromSequence name="s" to="10" assignNames="v"/>"#}),
        )
        .unwrap();
        core.flush_pending().unwrap();
        core.read("/ce/v", "value").unwrap().as_f64().unwrap()
    };

    let value = read_generated(2);
    assert!((1.0..=10.0).contains(&value));
    assert_eq!(read_generated(2), value);
}

#[test]
fn test_shared_parameters_on_document() {
    let mut core = with_variant(FIVE, VariantRequest::Index(2));
    let root = core.root_name().to_string();
    let snapshots = snapshot(&mut core);
    let shared = snapshots[&root].shared_parameters.as_ref().unwrap();
    assert_eq!(shared.variant_index, 2);
    assert_eq!(shared.variant_name, "b");
    assert!(snapshots["/s"].shared_parameters.is_none());
}

#[derive(Default)]
struct Recorder {
    variants: Rc<RefCell<Vec<String>>>,
    persists: Rc<RefCell<usize>>,
}

impl CoreObserver for Recorder {
    fn on_variant(&mut self, variant: &VariantRecord, queue: &mut ActionQueue) {
        self.variants.borrow_mut().push(variant.name.clone());
        queue.push("/bi", "toggle", json!({}));
    }

    fn on_persist(&mut self, _state: &PersistedState, _queue: &mut ActionQueue) {
        *self.persists.borrow_mut() += 1;
    }
}

#[test]
fn test_observer_sees_variant_and_queues_actions() {
    let mut core = with_variant(
        &format!("{FIVE}<booleanInput name=\"bi\"/>"),
        VariantRequest::Index(5),
    );
    let recorder = Recorder::default();
    let variants = recorder.variants.clone();
    let persists = recorder.persists.clone();

    core.add_observer(Box::new(recorder)).unwrap();

    assert_eq!(*variants.borrow(), vec!["e".to_string()]);
    // the queued toggle ran after registration and was persisted
    assert_eq!(core.read("/bi", "value").unwrap(), StateValue::Boolean(true));
    assert_eq!(*persists.borrow(), 1);
}

#[test]
fn test_enormous_sequence_is_capped() {
    let source = r#"<selectFromSequence name="s" to="1e300" assignNames="n"/>"#;
    let mut core = with_variant(source, VariantRequest::Index(42));
    assert_eq!(core.variant().all_possible_variants.len(), 1000);
    assert_eq!(selected(&mut core), 42.0);
    assert_eq!(core.read("/s", "count").unwrap(), StateValue::Integer(i64::MAX));

    let snapshots = snapshot(&mut core);
    let listed = snapshots["/s"].value("possibleValues").unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(1000));
}

#[test]
fn test_extreme_requested_indices() {
    let core = with_variant(FIVE, VariantRequest::Index(i64::MIN));
    assert_eq!(core.variant().index, 2);
    let core = with_variant(FIVE, VariantRequest::Index(i64::MAX));
    assert_eq!(core.variant().index, 2);
}

#[test]
fn test_referenced_bound_counts_defaults_but_selects_from_value() {
    let source = r#"<number name="m">3</number><selectFromSequence name="s" to="$m" assignNames="n"/>"#;
    let mut core = with_variant(source, VariantRequest::Index(5));

    // the space is sized with the default `to` of 10
    assert_eq!(core.variant().all_possible_variants.len(), 10);
    assert!(core
        .diagnostics()
        .iter()
        .any(|d| d.level == DiagnosticLevel::Warning && d.message.contains("to")));

    // at runtime the sequence is 1..=3 and index 5 wraps to its second value
    assert_eq!(core.read("/s", "count").unwrap(), StateValue::Integer(3));
    assert_eq!(selected(&mut core), 2.0);
}
