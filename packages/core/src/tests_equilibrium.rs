/// Switchable equilibrium lines, attribute bindings and copied graphs.
///
/// Lines read `stable` from a literal, from the default, or from a boolean
/// input through a reference; the graph is copied so every line exists twice
/// and both copies must agree after each action.
use crate::engine::DoenetCore;
use crate::value::StateValue;
use serde_json::json;

const GRAPHS: &str = r#"
<graph name="g" newNamespace>
  <equilibriumLine name="A" switchable>y=4</equilibriumLine>
  <equilibriumLine name="B" stable="false">y=7</equilibriumLine>
  <equilibriumLine name="C" stable="$(../b1)">y=-9</equilibriumLine>
  <equilibriumLine name="D" stable="$(../b2)" switchable>y=-3</equilibriumLine>
</graph>
<booleanInput name="b1"/>
<booleanInput name="b2"/>
$g{name="g2"}
"#;

fn stable(core: &mut DoenetCore, name: &str) -> bool {
    core.read(name, "stable")
        .unwrap()
        .as_bool()
        .unwrap_or_else(|| panic!("{name}.stable is not a boolean"))
}

fn stable_everywhere(core: &mut DoenetCore, local: &str) -> (bool, bool) {
    (
        stable(core, &format!("/g/{local}")),
        stable(core, &format!("/g2/{local}")),
    )
}

#[test]
fn test_initial_state() {
    let mut core = DoenetCore::from_source(GRAPHS).unwrap();

    assert_eq!(stable_everywhere(&mut core, "A"), (true, true));
    assert_eq!(stable_everywhere(&mut core, "B"), (false, false));
    assert_eq!(stable_everywhere(&mut core, "C"), (false, false));
    assert_eq!(stable_everywhere(&mut core, "D"), (false, false));

    assert_eq!(core.read("/g/A", "switchable").unwrap(), StateValue::Boolean(true));
    assert_eq!(core.read("/g2/B", "switchable").unwrap(), StateValue::Boolean(false));
    assert_eq!(core.read("/g/A", "equation").unwrap().to_json(), json!(["=", "y", 4]));
    assert_eq!(core.read("/g2/D", "equation").unwrap().to_json(), json!(["=", "y", -3]));
}

#[test]
fn test_switch_default_line_updates_copy() {
    let mut core = DoenetCore::from_source(GRAPHS).unwrap();

    core.dispatch("/g/A", "switchLine", json!({})).unwrap();
    assert_eq!(stable_everywhere(&mut core, "A"), (false, false));

    core.dispatch("/g2/A", "switchLine", json!({})).unwrap();
    assert_eq!(stable_everywhere(&mut core, "A"), (true, true));
}

#[test]
fn test_unswitchable_lines_ignore_action() {
    let mut core = DoenetCore::from_source(GRAPHS).unwrap();
    let before = core.persisted_state();

    core.dispatch("/g/B", "switchLine", json!({})).unwrap();
    core.dispatch("/g2/C", "switchLine", json!({})).unwrap();

    assert_eq!(stable_everywhere(&mut core, "B"), (false, false));
    assert_eq!(stable_everywhere(&mut core, "C"), (false, false));
    assert_eq!(core.persisted_state(), before);
    assert!(!core.can_undo());
}

#[test]
fn test_bound_line_follows_input() {
    let mut core = DoenetCore::from_source(GRAPHS).unwrap();

    core.dispatch("/b1", "updateBoolean", json!({"boolean": true})).unwrap();
    assert_eq!(stable_everywhere(&mut core, "C"), (true, true));

    core.dispatch("/b1", "toggle", json!({})).unwrap();
    assert_eq!(stable_everywhere(&mut core, "C"), (false, false));
}

#[test]
fn test_switching_bound_line_writes_through() {
    let mut core = DoenetCore::from_source(GRAPHS).unwrap();

    core.dispatch("/g2/D", "switchLine", json!({})).unwrap();
    assert_eq!(core.read("/b2", "value").unwrap(), StateValue::Boolean(true));
    assert_eq!(stable_everywhere(&mut core, "D"), (true, true));

    core.dispatch("/b2", "toggle", json!({})).unwrap();
    assert_eq!(stable_everywhere(&mut core, "D"), (false, false));
}

#[test]
fn test_switch_is_undoable() {
    let mut core = DoenetCore::from_source(GRAPHS).unwrap();

    core.dispatch("/g/D", "switchLine", json!({})).unwrap();
    assert!(core.undo().unwrap());
    assert_eq!(core.read("/b2", "value").unwrap(), StateValue::Boolean(false));
    assert_eq!(stable_everywhere(&mut core, "D"), (false, false));

    assert!(core.redo().unwrap());
    assert_eq!(stable_everywhere(&mut core, "D"), (true, true));
}

#[test]
fn test_copies_share_identity_across_actions() {
    let mut core = DoenetCore::from_source(GRAPHS).unwrap();
    let names = core.component_names();

    core.dispatch("/g/A", "switchLine", json!({})).unwrap();
    core.dispatch("/b1", "toggle", json!({})).unwrap();

    assert_eq!(core.component_names(), names);
}
