/// Code editors: debounced commits, bindings between editors, changed
/// flags, results built from the committed value, and reloading saved state.
use crate::changes::Command;
use crate::engine::{CoreOptions, DoenetCore};
use crate::error::{CoreError, DiagnosticLevel};
use crate::persistence::PersistedState;
use crate::snapshot::{snapshot, ActiveChild};
use crate::value::StateValue;
use serde_json::json;

const EDITOR: &str = r#"<codeEditor name="ce" showResults/>"#;

fn type_text(core: &mut DoenetCore, component: &str, text: &str) {
    core.dispatch(component, "updateImmediateValue", json!({ "text": text }))
        .unwrap();
}

fn text(core: &mut DoenetCore, component: &str, var: &str) -> String {
    core.read(component, var).unwrap().to_text()
}

/// Types of the components shown as the editor's results.
fn result_types(core: &mut DoenetCore, editor: &str) -> Vec<String> {
    let snapshots = snapshot(core);
    snapshots[editor]
        .active_children
        .iter()
        .filter_map(|child| match child {
            ActiveChild::Component { component_name } => {
                Some(snapshots[component_name].component_type.clone())
            }
            ActiveChild::Text(_) => None,
        })
        .collect()
}

#[test]
fn test_commit_waits_for_debounce() {
    let mut core = DoenetCore::from_source(EDITOR).unwrap();
    let source = r#"<text name="t">hello</text>"#;

    type_text(&mut core, "/ce", source);
    assert_eq!(text(&mut core, "/ce", "immediateValue"), source);
    assert_eq!(text(&mut core, "/ce", "value"), "");
    assert!(core.has_pending_commits());
    assert!(matches!(
        core.read("/ce/t", "value"),
        Err(CoreError::ComponentNotFound(_))
    ));

    core.advance_time(999).unwrap();
    assert_eq!(text(&mut core, "/ce", "value"), "");

    core.advance_time(1).unwrap();
    assert_eq!(text(&mut core, "/ce", "value"), source);
    assert_eq!(text(&mut core, "/ce/t", "value"), "hello");
    assert!(!core.has_pending_commits());
}

#[test]
fn test_new_edit_restarts_debounce() {
    let mut core = DoenetCore::from_source(EDITOR).unwrap();

    type_text(&mut core, "/ce", "a");
    core.advance_time(600).unwrap();
    type_text(&mut core, "/ce", "ab");
    core.advance_time(600).unwrap();
    assert_eq!(text(&mut core, "/ce", "value"), "");

    core.advance_time(400).unwrap();
    assert_eq!(text(&mut core, "/ce", "value"), "ab");
    assert_eq!(
        core.command_log("/ce"),
        &[
            Command::Immediate("a".into()),
            Command::Immediate("ab".into()),
            Command::Commit("ab".into()),
        ]
    );
}

#[test]
fn test_explicit_commit_cancels_pending() {
    let mut core = DoenetCore::from_source(EDITOR).unwrap();

    type_text(&mut core, "/ce", "now");
    core.dispatch("/ce", "updateValue", json!({})).unwrap();
    assert_eq!(text(&mut core, "/ce", "value"), "now");
    assert!(!core.has_pending_commits());

    // nothing left to fire, and a second commit is a no-op
    core.advance_time(5000).unwrap();
    core.dispatch("/ce", "updateValue", json!({})).unwrap();
    assert_eq!(core.command_log("/ce").len(), 2);
}

#[test]
fn test_changed_flags() {
    let mut core = DoenetCore::from_source(EDITOR).unwrap();
    assert!(!core.has_changed("/ce", "value").unwrap());
    assert!(!core.has_changed("/ce", "immediateValue").unwrap());

    type_text(&mut core, "/ce", "x");
    assert!(!core.has_changed("/ce", "value").unwrap());
    assert!(core.has_changed("/ce", "immediateValue").unwrap());

    core.flush_pending().unwrap();
    assert!(core.has_changed("/ce", "value").unwrap());
    assert!(core.has_changed("/ce", "immediateValue").unwrap());
}

#[test]
fn test_bound_editors_converge() {
    let mut core = DoenetCore::from_source(
        r#"
<codeEditor name="ce1"/>
<codeEditor name="ce2" bindValueTo="$ce1"/>
<codeEditor name="ce3" bindValueTo="$ce2.immediateValue"/>
"#,
    )
    .unwrap();

    type_text(&mut core, "/ce1", "x");
    assert_eq!(text(&mut core, "/ce2", "value"), "");
    core.flush_pending().unwrap();
    for editor in ["/ce1", "/ce2", "/ce3"] {
        assert_eq!(text(&mut core, editor, "value"), "x", "{editor}");
    }

    // ce3 follows ce2 while it is being typed in
    type_text(&mut core, "/ce2", "z");
    assert_eq!(text(&mut core, "/ce3", "value"), "z");
    assert_eq!(text(&mut core, "/ce1", "value"), "x");
    core.flush_pending().unwrap();
    assert_eq!(text(&mut core, "/ce1", "value"), "z");

    // committing the last editor writes back through both bindings
    type_text(&mut core, "/ce3", "y");
    assert_eq!(text(&mut core, "/ce1", "value"), "z");
    core.flush_pending().unwrap();
    for editor in ["/ce1", "/ce2", "/ce3"] {
        assert_eq!(text(&mut core, editor, "value"), "y", "{editor}");
        assert_eq!(text(&mut core, editor, "immediateValue"), "y", "{editor}");
    }
    assert!(core.has_changed("/ce1", "value").unwrap());
}

#[test]
fn test_results_rebuild_only_when_value_changes() {
    let mut core = DoenetCore::from_source(EDITOR).unwrap();
    type_text(&mut core, "/ce", r#"<booleanInput name="bi"/> plain text"#);
    core.flush_pending().unwrap();
    assert_eq!(result_types(&mut core, "/ce"), vec!["booleanInput", "text"]);

    core.dispatch("/ce/bi", "toggle", json!({})).unwrap();
    assert_eq!(core.read("/ce/bi", "value").unwrap(), StateValue::Boolean(true));

    // an edit that is not committed leaves the results alone
    type_text(&mut core, "/ce", "<p/>");
    assert_eq!(core.read("/ce/bi", "value").unwrap(), StateValue::Boolean(true));

    core.flush_pending().unwrap();
    assert_eq!(result_types(&mut core, "/ce"), vec!["p"]);
    assert!(core.read("/ce/bi", "value").is_err());
}

#[test]
fn test_recover_from_invalid_markup() {
    let mut core = DoenetCore::from_source(EDITOR).unwrap();

    type_text(&mut core, "/ce", "<p>unclosed");
    core.flush_pending().unwrap();
    assert_eq!(result_types(&mut core, "/ce"), vec!["_error"]);
    assert!(core
        .diagnostics()
        .iter()
        .any(|d| d.level == DiagnosticLevel::Error && d.message.contains("Invalid DoenetML")));

    type_text(&mut core, "/ce", r#"<p name="p">fixed</p>"#);
    core.flush_pending().unwrap();
    assert_eq!(result_types(&mut core, "/ce"), vec!["p"]);
    assert_eq!(text(&mut core, "/ce/p", "text"), "fixed");
}

#[test]
fn test_recover_from_circular_results() {
    let mut core = DoenetCore::from_source(
        r#"<codeEditor name="ce" showResults/><text name="outside">still here</text>"#,
    )
    .unwrap();

    type_text(&mut core, "/ce", r#"<math name="a">$b</math><math name="b">$a</math>"#);
    core.flush_pending().unwrap();
    assert!(core
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("Circular dependency")));
    assert_eq!(text(&mut core, "/outside", "value"), "still here");
    assert!(snapshot(&mut core)
        .values()
        .any(|component| component.component_type == "_error"));

    type_text(&mut core, "/ce", r#"<math name="a">2</math><math name="b">$a + 1</math>"#);
    core.flush_pending().unwrap();
    assert_eq!(result_types(&mut core, "/ce"), vec!["math", "math"]);
    assert_eq!(core.read("/ce/b", "value").unwrap().to_json(), json!(3));
    assert!(!snapshot(&mut core)
        .values()
        .any(|component| component.component_type == "_error"));
}

#[test]
fn test_reload_restores_values_and_results() {
    let mut core = DoenetCore::from_source(EDITOR).unwrap();
    let source = r#"<booleanInput name="bi"/>"#;
    type_text(&mut core, "/ce", source);
    core.flush_pending().unwrap();
    core.dispatch("/ce/bi", "toggle", json!({})).unwrap();

    let json = core.persisted_state().to_json().unwrap();
    let state = PersistedState::from_json(&json).unwrap();
    let mut reloaded = DoenetCore::new(
        EDITOR,
        CoreOptions {
            state: Some(state),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(text(&mut reloaded, "/ce", "value"), source);
    assert_eq!(text(&mut reloaded, "/ce", "immediateValue"), source);
    assert!(reloaded.has_changed("/ce", "value").unwrap());
    assert_eq!(reloaded.read("/ce/bi", "value").unwrap(), StateValue::Boolean(true));
    assert_eq!(reloaded.persisted_state(), core.persisted_state());
}
