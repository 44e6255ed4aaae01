/// Number inputs: typed text parsed into a number, committed after the
/// debounce delay or on an explicit commit.
use crate::changes::Command;
use crate::engine::{CoreOptions, DoenetCore};
use crate::value::StateValue;
use serde_json::json;

const INPUT: &str = r#"<numberInput name="n" prefill="5"/>"#;

fn type_text(core: &mut DoenetCore, text: &str) {
    core.dispatch("/n", "updateImmediateValue", json!({ "text": text }))
        .unwrap();
}

fn number(core: &mut DoenetCore, var: &str) -> f64 {
    core.read("/n", var).unwrap().as_f64().unwrap()
}

#[test]
fn test_prefill_sets_both_values() {
    let mut core = DoenetCore::from_source(INPUT).unwrap();
    assert_eq!(number(&mut core, "value"), 5.0);
    assert_eq!(number(&mut core, "immediateValue"), 5.0);
    assert_eq!(core.read("/n", "rawRendererValue").unwrap(), StateValue::from("5"));
    assert!(!core.has_changed("/n", "value").unwrap());
}

#[test]
fn test_commit_waits_for_debounce() {
    let mut core = DoenetCore::from_source(INPUT).unwrap();

    type_text(&mut core, "7.5");
    assert_eq!(number(&mut core, "immediateValue"), 7.5);
    assert_eq!(number(&mut core, "value"), 5.0);
    assert!(core.has_changed("/n", "immediateValue").unwrap());
    assert!(!core.has_changed("/n", "value").unwrap());

    core.advance_time(999).unwrap();
    assert_eq!(number(&mut core, "value"), 5.0);

    core.advance_time(1).unwrap();
    assert_eq!(number(&mut core, "value"), 7.5);
    assert!(core.has_changed("/n", "value").unwrap());
    assert_eq!(
        core.command_log("/n"),
        &[Command::Immediate("7.5".into()), Command::Commit("7.5".into())]
    );
}

#[test]
fn test_unparseable_text_commits_nan() {
    let mut core = DoenetCore::from_source(INPUT).unwrap();
    type_text(&mut core, "abc");
    assert!(number(&mut core, "immediateValue").is_nan());
    assert_eq!(number(&mut core, "value"), 5.0);

    core.flush_pending().unwrap();
    assert!(number(&mut core, "value").is_nan());
    assert_eq!(core.read("/n", "rawRendererValue").unwrap(), StateValue::from("abc"));
}

#[test]
fn test_reload_restores_committed_number() {
    let mut core = DoenetCore::from_source(INPUT).unwrap();
    type_text(&mut core, "12");
    core.flush_pending().unwrap();
    let saved = core.persisted_state();

    let mut reloaded = DoenetCore::new(
        INPUT,
        CoreOptions {
            state: Some(saved),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(number(&mut reloaded, "value"), 12.0);
    assert_eq!(number(&mut reloaded, "immediateValue"), 12.0);
}

#[test]
fn test_undo_restores_previous_commit() {
    let mut core = DoenetCore::from_source(INPUT).unwrap();
    type_text(&mut core, "8");
    core.flush_pending().unwrap();
    assert_eq!(number(&mut core, "value"), 8.0);

    assert!(core.undo().unwrap());
    assert_eq!(number(&mut core, "value"), 5.0);
}
