use doenet_core::{
    render_tree, snapshot, ActiveChild, CoreConfig, CoreError, CoreOptions, DoenetCore,
    PersistedState, RenderChild, StateValue, VariantRequest,
};
use serde_json::json;

const DOCUMENT: &str = r#"<p name="greeting">Hello <text name="who">world</text>!</p>
<booleanInput name="agree"/>
<p name="echo">agreed: $agree</p>"#;

#[test]
fn test_read_and_lookup() {
    let mut core = DoenetCore::from_source(DOCUMENT).unwrap();
    assert_eq!(core.root_name(), "/_document1");
    assert_eq!(core.component_type("greeting"), Some("p"));
    assert_eq!(core.component_type("/who"), Some("text"));
    assert_eq!(
        core.read("/greeting", "text").unwrap(),
        StateValue::from("Hello world!")
    );
    assert!(matches!(
        core.read("/nobody", "value"),
        Err(CoreError::ComponentNotFound(_))
    ));
    assert!(matches!(
        core.read("/who", "nonsense"),
        Err(CoreError::StateVarNotFound { .. })
    ));
}

#[test]
fn test_state_variable_names_are_case_insensitive() {
    let mut core = DoenetCore::from_source(DOCUMENT).unwrap();
    assert_eq!(
        core.read("/agree", "VALUE").unwrap(),
        core.read("/agree", "value").unwrap()
    );
}

#[test]
fn test_dispatch_updates_dependents() {
    let mut core = DoenetCore::from_source(DOCUMENT).unwrap();
    assert_eq!(core.read("/echo", "text").unwrap(), StateValue::from("agreed: false"));

    core.dispatch("/agree", "toggle", json!({})).unwrap();
    assert_eq!(core.read("/echo", "text").unwrap(), StateValue::from("agreed: true"));
}

#[test]
fn test_invalid_arguments_are_errors() {
    let mut core = DoenetCore::from_source(DOCUMENT).unwrap();
    let err = core
        .dispatch("/agree", "updateBoolean", json!({"boolean": "yes"}))
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArguments { .. }));
    assert_eq!(core.read("/agree", "value").unwrap(), StateValue::Boolean(false));
}

#[test]
fn test_unknown_actions_and_components_are_ignored() {
    let mut core = DoenetCore::from_source(DOCUMENT).unwrap();
    core.dispatch("/agree", "explode", json!({})).unwrap();
    core.dispatch("/ghost", "toggle", json!({})).unwrap();
    assert!(core.persisted_state().cells.is_empty());
}

#[test]
fn test_disabled_input_ignores_actions() {
    let mut core = DoenetCore::from_source(r#"<booleanInput name="b" disabled/>"#).unwrap();
    core.dispatch("/b", "toggle", json!({})).unwrap();
    assert_eq!(core.read("/b", "value").unwrap(), StateValue::Boolean(false));
}

#[test]
fn test_snapshot_shape() {
    let mut core = DoenetCore::from_source(DOCUMENT).unwrap();
    let snapshots = snapshot(&mut core);

    let greeting = &snapshots["/greeting"];
    assert_eq!(greeting.component_type, "p");
    assert_eq!(greeting.value("text"), Some(&json!("Hello world!")));
    assert_eq!(
        greeting.active_children,
        vec![
            ActiveChild::Text("Hello ".into()),
            ActiveChild::Component {
                component_name: "/who".into()
            },
            ActiveChild::Text("!".into()),
        ]
    );
    assert!(greeting.replacements.is_none());

    let json = serde_json::to_value(&snapshots["/greeting"]).unwrap();
    assert_eq!(json["componentType"], "p");
    assert_eq!(json["activeChildren"][1], json!({"componentName": "/who"}));
}

#[test]
fn test_render_tree_follows_active_children() {
    let mut core = DoenetCore::from_source(DOCUMENT).unwrap();
    let tree = render_tree(&mut core);
    assert_eq!(tree.component_type, "document");

    let echo = tree
        .children
        .iter()
        .find_map(|child| match child {
            RenderChild::Node(node) if node.component_name == "/echo" => Some(node),
            _ => None,
        })
        .unwrap();
    // the macro is rendered as what it stands for
    assert!(matches!(
        &echo.children[1],
        RenderChild::Node(node) if node.component_type == "boolean"
    ));
}

#[test]
fn test_persisted_state_round_trip() {
    let mut core = DoenetCore::from_source(DOCUMENT).unwrap();
    core.dispatch("/agree", "toggle", json!({})).unwrap();

    let json = core.persisted_state().to_json().unwrap();
    let mut reloaded = DoenetCore::new(
        DOCUMENT,
        CoreOptions {
            state: Some(PersistedState::from_json(&json).unwrap()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(reloaded.read("/echo", "text").unwrap(), StateValue::from("agreed: true"));
}

#[test]
fn test_future_persisted_version_is_rejected() {
    let err = PersistedState::from_json(r#"{"version": 99, "cells": {}}"#).unwrap_err();
    assert!(matches!(err, CoreError::Persistence(_)));
}

#[test]
fn test_parse_errors_surface() {
    let err = DoenetCore::from_source("<p>").unwrap_err();
    assert!(matches!(err, CoreError::Parse(_)));
}

#[test]
fn test_custom_debounce_and_simplify() {
    let config: CoreConfig =
        serde_json::from_str(r#"{"debounceMs": 10, "defaultSimplify": "full"}"#).unwrap();
    let mut core = DoenetCore::new(
        r#"<textInput name="ti"/><math name="m">x + 0</math>"#,
        CoreOptions {
            config,
            variant: Some(VariantRequest::Index(1)),
            state: None,
        },
    )
    .unwrap();
    assert_eq!(core.read("/m", "value").unwrap().to_json(), json!("x"));

    core.dispatch("/ti", "updateImmediateValue", json!({"text": "quick"}))
        .unwrap();
    core.advance_time(10).unwrap();
    assert_eq!(core.read("/ti", "value").unwrap(), StateValue::from("quick"));
    assert_eq!(core.now(), 10);
}

#[test]
fn test_undo_redo_round_trip() {
    let mut core = DoenetCore::from_source(r#"<textInput name="ti"/>"#).unwrap();
    core.dispatch("/ti", "updateImmediateValue", json!({"text": "first"}))
        .unwrap();
    core.flush_pending().unwrap();
    assert!(core.can_undo());

    assert!(core.undo().unwrap());
    assert_eq!(core.read("/ti", "value").unwrap(), StateValue::from(""));
    assert!(core.can_redo());

    assert!(core.redo().unwrap());
    assert_eq!(core.read("/ti", "value").unwrap(), StateValue::from("first"));
    assert!(!core.redo().unwrap());
}
