/// Copies, collects and shadows: what they expand into, when they expand
/// again, and that unrelated changes leave their replacements in place.
use crate::engine::DoenetCore;
use crate::snapshot::snapshot;
use crate::value::StateValue;
use serde_json::json;

fn replacements(core: &mut DoenetCore, composite: &str) -> Vec<String> {
    snapshot(core)[composite]
        .replacements
        .clone()
        .unwrap_or_default()
}

#[test]
fn test_macro_of_primitive_shadows_value() {
    let mut core = DoenetCore::from_source(
        r#"<textInput name="ti" prefill="hello"/>
<p name="p">$ti{name="shown"}</p>
<text name="t" copySource="ti"/>
<copy name="cp" source="ti" prop="immediateValue" assignNames="imm"/>"#,
    )
    .unwrap();

    assert_eq!(core.component_type("/shown"), Some("text"));
    assert_eq!(core.read("/shown", "value").unwrap(), StateValue::from("hello"));
    assert_eq!(core.read("/p", "text").unwrap(), StateValue::from("hello"));
    assert_eq!(core.read("/t", "value").unwrap(), StateValue::from("hello"));

    core.dispatch("/ti", "updateImmediateValue", json!({"text": "bye"}))
        .unwrap();
    assert_eq!(core.read("/imm", "value").unwrap(), StateValue::from("bye"));
    assert_eq!(core.read("/shown", "value").unwrap(), StateValue::from("hello"));

    core.flush_pending().unwrap();
    assert_eq!(core.read("/shown", "value").unwrap(), StateValue::from("bye"));
    assert_eq!(core.read("/t", "value").unwrap(), StateValue::from("bye"));
}

#[test]
fn test_copy_source_of_same_type_shares_state() {
    let mut core = DoenetCore::from_source(
        r#"<booleanInput name="b"/><booleanInput name="b2" copySource="b"/>"#,
    )
    .unwrap();

    core.dispatch("/b2", "toggle", json!({})).unwrap();
    assert_eq!(core.read("/b", "value").unwrap(), StateValue::Boolean(true));
    assert_eq!(core.read("/b2", "value").unwrap(), StateValue::Boolean(true));

    core.dispatch("/b", "updateBoolean", json!({"boolean": false}))
        .unwrap();
    assert_eq!(core.read("/b2", "value").unwrap(), StateValue::Boolean(false));
}

#[test]
fn test_overrides_apply_to_replacement() {
    let mut core =
        DoenetCore::from_source(r#"<booleanInput name="b"/>$b{name="hid" hidden="true"}"#).unwrap();
    assert_eq!(core.read("/hid", "hidden").unwrap(), StateValue::Boolean(true));
    assert_eq!(core.read("/b", "hidden").unwrap(), StateValue::Boolean(false));
}

#[test]
fn test_duplicate_renames_descendants() {
    let mut core = DoenetCore::from_source(
        r#"<section name="sec"><text name="t">x</text> and <text>y</text></section>
<copy name="cp" source="sec" assignNames="sec2"/>"#,
    )
    .unwrap();

    assert_eq!(replacements(&mut core, "/cp"), vec!["/sec2"]);
    assert_eq!(core.read("/sec2", "text").unwrap(), StateValue::from("x and y"));
    assert_eq!(core.read("/cp_1", "value").unwrap(), StateValue::from("x"));
    assert_eq!(core.component_type("/cp_2"), Some("text"));
}

#[test]
fn test_unrelated_changes_preserve_replacements() {
    let mut core = DoenetCore::from_source(
        r#"<booleanInput name="b"/>
<section name="s" newNamespace><booleanInput name="inner"/></section>
$s{name="s2"}"#,
    )
    .unwrap();
    let copy = core.lookup("/s2").unwrap();
    let inner = core.lookup("/s2/inner").unwrap();

    core.dispatch("/b", "toggle", json!({})).unwrap();
    core.dispatch("/s2/inner", "toggle", json!({})).unwrap();

    assert_eq!(core.lookup("/s2"), Some(copy));
    assert_eq!(core.lookup("/s2/inner"), Some(inner));
    // the copy shares essential state with its source
    assert_eq!(core.read("/s/inner", "value").unwrap(), StateValue::Boolean(true));
}

#[test]
fn test_collect_matching_descendants() {
    let mut core = DoenetCore::from_source(
        r#"<section name="s">
  <math name="m1">1</math>
  <p><math name="m2">x</math><text>skip</text></p>
</section>
<collect name="c" source="s" componentTypes="math" assignNames="c1 c2"/>"#,
    )
    .unwrap();

    assert_eq!(replacements(&mut core, "/c"), vec!["/c1", "/c2"]);
    assert_eq!(core.read("/c1", "value").unwrap().to_json(), json!(1));
    assert_eq!(core.read("/c2", "value").unwrap().to_json(), json!("x"));
}

#[test]
fn test_collect_follows_changing_source() {
    let mut core = DoenetCore::from_source(
        r#"<codeEditor name="ce" showResults/>
<collect name="c" source="ce" componentTypes="math"/>"#,
    )
    .unwrap();
    assert!(replacements(&mut core, "/c").is_empty());

    let commit = |core: &mut DoenetCore, text: &str| {
        core.dispatch("/ce", "updateImmediateValue", json!({ "text": text }))
            .unwrap();
        core.flush_pending().unwrap();
    };

    commit(&mut core, "<math>1</math><text>t</text><math>2</math>");
    let collected = replacements(&mut core, "/c");
    assert_eq!(collected.len(), 2);
    assert_eq!(core.read(&collected[1], "value").unwrap().to_json(), json!(2));

    commit(&mut core, "<math>5</math>");
    let collected = replacements(&mut core, "/c");
    assert_eq!(collected.len(), 1);
    assert_eq!(core.read(&collected[0], "value").unwrap().to_json(), json!(5));
}

#[test]
fn test_missing_reference_is_empty() {
    let mut core = DoenetCore::from_source(r#"<text name="t">a $missing b</text>"#).unwrap();
    assert_eq!(core.read("/t", "value").unwrap(), StateValue::from("a  b"));
}

#[test]
fn test_reference_resolves_once_target_exists() {
    let mut core = DoenetCore::from_source(
        r#"<p name="p">$(ce/late)</p><codeEditor name="ce" showResults/>"#,
    )
    .unwrap();
    assert_eq!(core.read("/p", "text").unwrap(), StateValue::from(""));

    core.dispatch(
        "/ce",
        "updateImmediateValue",
        json!({"text": r#"<text name="late">arrived</text>"#}),
    )
    .unwrap();
    core.flush_pending().unwrap();
    assert_eq!(core.read("/p", "text").unwrap(), StateValue::from("arrived"));
}

#[test]
fn test_self_copy_becomes_error() {
    let mut core =
        DoenetCore::from_source(r#"<p name="p">before $p after</p><text name="ok">fine</text>"#)
            .unwrap();

    let snapshots = snapshot(&mut core);
    let errors: Vec<_> = snapshots
        .iter()
        .filter(|(_, c)| c.component_type == "_error")
        .collect();
    assert_eq!(errors.len(), 1);
    let message = errors[0].1.value("message").unwrap().as_str().unwrap();
    assert!(message.contains("Circular dependency"), "{message}");
    assert_eq!(core.read("/ok", "value").unwrap(), StateValue::from("fine"));
}

#[test]
fn test_unknown_tag_is_reported() {
    let mut core = DoenetCore::from_source(r#"<vaporware/><text name="t">x</text>"#).unwrap();
    assert!(core
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("Invalid component type: vaporware")));
    assert_eq!(core.read("/t", "value").unwrap(), StateValue::from("x"));
}
