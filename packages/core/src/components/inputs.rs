use super::common::{attribute_bool, essential_inverse, essential_value, group_bool, DISABLED, HIDDEN};
use super::{
    ActionContext, ActionDefinition, ActionGate, ActionWrite, CompositeKind, ComponentDefinition,
    ConstValue, CopyMode, DependencyInstruction, Initial, StateVarDefinition,
};
use crate::graph::{DependencyValues, UpdateRequest};
use crate::value::{StateValue, ValueType};

const BIND_BOOLEAN: (&str, DependencyInstruction) = (
    "bind",
    DependencyInstruction::Attribute {
        name: "bindValueTo",
        value_type: ValueType::Boolean,
        default: None,
    },
);

const BIND_TEXT: (&str, DependencyInstruction) = (
    "bind",
    DependencyInstruction::Attribute {
        name: "bindValueTo",
        value_type: ValueType::String,
        default: None,
    },
);

const SYNC: (&str, DependencyInstruction) = (
    "sync",
    DependencyInstruction::Essential {
        key: "syncImmediate",
        initial: Initial::Value(ConstValue::Bool(true)),
    },
);

pub static BOOLEAN_INPUT: ComponentDefinition = ComponentDefinition {
    component_type: "booleanInput",
    state_vars: &[
        HIDDEN,
        DISABLED,
        StateVarDefinition {
            name: "value",
            value_type: ValueType::Boolean,
            for_renderer: true,
            public: true,
            dependencies: &[
                BIND_BOOLEAN,
                (
                    "essential",
                    DependencyInstruction::Essential {
                        key: "value",
                        initial: Initial::Attribute {
                            name: "prefill",
                            value_type: ValueType::Boolean,
                            fallback: ConstValue::Bool(false),
                        },
                    },
                ),
            ],
            calculate: bound_boolean,
            inverse: Some(bound_inverse),
        },
    ],
    primary: Some("value"),
    actions: &[
        ActionDefinition {
            name: "updateBoolean",
            gate: ActionGate::WhenFalse("disabled"),
            reads: &[],
            handler: update_boolean,
            schedules: None,
            commits: false,
            undoable: true,
        },
        ActionDefinition {
            name: "toggle",
            gate: ActionGate::WhenFalse("disabled"),
            reads: &["value"],
            handler: toggle,
            schedules: None,
            commits: false,
            undoable: true,
        },
    ],
    composite: None,
    copy_mode: CopyMode::Shadow,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

const TEXT_VALUE: StateVarDefinition = StateVarDefinition {
    name: "value",
    value_type: ValueType::String,
    for_renderer: true,
    public: true,
    dependencies: &[
        BIND_TEXT,
        (
            "essential",
            DependencyInstruction::Essential {
                key: "value",
                initial: Initial::Attribute {
                    name: "prefill",
                    value_type: ValueType::String,
                    fallback: ConstValue::Text(""),
                },
            },
        ),
        SYNC,
    ],
    calculate: bound_text,
    inverse: Some(committed_inverse),
};

/// What the user sees while typing. Follows `value` until an immediate
/// edit breaks the sync, and rejoins it on commit.
const IMMEDIATE_VALUE: StateVarDefinition = StateVarDefinition {
    name: "immediateValue",
    value_type: ValueType::String,
    for_renderer: true,
    public: true,
    dependencies: &[
        ("value", DependencyInstruction::StateVar("value")),
        SYNC,
        (
            "immediate",
            DependencyInstruction::Essential {
                key: "immediateValue",
                initial: Initial::Value(ConstValue::Text("")),
            },
        ),
    ],
    calculate: immediate_value,
    inverse: Some(immediate_inverse),
};

/// Set the first time a request lands on `value`
const VALUE_CHANGED: StateVarDefinition = StateVarDefinition {
    name: "valueChanged",
    value_type: ValueType::Boolean,
    for_renderer: false,
    public: true,
    dependencies: &[(
        "essential",
        DependencyInstruction::Essential {
            key: "valueChanged",
            initial: Initial::Value(ConstValue::Bool(false)),
        },
    )],
    calculate: essential_value,
    inverse: Some(essential_inverse),
};

const IMMEDIATE_VALUE_CHANGED: StateVarDefinition = StateVarDefinition {
    name: "immediateValueChanged",
    value_type: ValueType::Boolean,
    for_renderer: false,
    public: true,
    dependencies: &[(
        "essential",
        DependencyInstruction::Essential {
            key: "immediateValueChanged",
            initial: Initial::Value(ConstValue::Bool(false)),
        },
    )],
    calculate: essential_value,
    inverse: Some(essential_inverse),
};

const SYNC_IMMEDIATE_VALUE: StateVarDefinition = StateVarDefinition {
    name: "syncImmediateValue",
    value_type: ValueType::Boolean,
    for_renderer: false,
    public: false,
    dependencies: &[(
        "essential",
        DependencyInstruction::Essential {
            key: "syncImmediate",
            initial: Initial::Value(ConstValue::Bool(true)),
        },
    )],
    calculate: essential_value,
    inverse: Some(essential_inverse),
};

const SHOW_RESULTS: StateVarDefinition = StateVarDefinition {
    name: "showResults",
    value_type: ValueType::Boolean,
    for_renderer: true,
    public: true,
    dependencies: &[(
        "attribute",
        DependencyInstruction::Attribute {
            name: "showResults",
            value_type: ValueType::Boolean,
            default: Some(ConstValue::Bool(false)),
        },
    )],
    calculate: attribute_bool,
    inverse: None,
};

const EDITABLE_ACTIONS: &[ActionDefinition] = &[
    ActionDefinition {
        name: "updateImmediateValue",
        gate: ActionGate::WhenFalse("disabled"),
        reads: &[],
        handler: update_immediate_value,
        schedules: Some("updateValue"),
        commits: false,
        undoable: false,
    },
    ActionDefinition {
        name: "updateValue",
        gate: ActionGate::WhenFalse("disabled"),
        reads: &["syncImmediateValue", "immediateValue"],
        handler: update_value,
        schedules: None,
        commits: true,
        undoable: true,
    },
];

pub static TEXT_INPUT: ComponentDefinition = ComponentDefinition {
    component_type: "textInput",
    state_vars: &[
        HIDDEN,
        DISABLED,
        TEXT_VALUE,
        IMMEDIATE_VALUE,
        VALUE_CHANGED,
        IMMEDIATE_VALUE_CHANGED,
        SYNC_IMMEDIATE_VALUE,
    ],
    primary: Some("value"),
    actions: EDITABLE_ACTIONS,
    composite: None,
    copy_mode: CopyMode::Shadow,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

pub static CODE_EDITOR: ComponentDefinition = ComponentDefinition {
    component_type: "codeEditor",
    state_vars: &[
        HIDDEN,
        DISABLED,
        TEXT_VALUE,
        IMMEDIATE_VALUE,
        VALUE_CHANGED,
        IMMEDIATE_VALUE_CHANGED,
        SYNC_IMMEDIATE_VALUE,
        SHOW_RESULTS,
    ],
    primary: Some("value"),
    actions: EDITABLE_ACTIONS,
    composite: Some(CompositeKind::EditorResults),
    copy_mode: CopyMode::Shadow,
    variant_count: None,
    ignore_variants_from_children: true,
    new_namespace: true,
};

/// Text as typed. `immediateValue` is parsed from it.
const RAW_RENDERER_VALUE: StateVarDefinition = StateVarDefinition {
    name: "rawRendererValue",
    value_type: ValueType::String,
    for_renderer: true,
    public: true,
    dependencies: &[(
        "essential",
        DependencyInstruction::Essential {
            key: "rawRendererValue",
            initial: Initial::Attribute {
                name: "prefill",
                value_type: ValueType::String,
                fallback: ConstValue::Text(""),
            },
        },
    )],
    calculate: essential_value,
    inverse: Some(essential_inverse),
};

pub static NUMBER_INPUT: ComponentDefinition = ComponentDefinition {
    component_type: "numberInput",
    state_vars: &[
        HIDDEN,
        DISABLED,
        StateVarDefinition {
            name: "value",
            value_type: ValueType::Number,
            for_renderer: true,
            public: true,
            dependencies: &[
                ("last", DependencyInstruction::StateVar("lastValue")),
                ("immediate", DependencyInstruction::StateVar("immediateValue")),
                ("sync", DependencyInstruction::StateVar("syncImmediateValue")),
            ],
            calculate: number_value,
            inverse: Some(number_value_inverse),
        },
        StateVarDefinition {
            name: "immediateValue",
            value_type: ValueType::Number,
            for_renderer: false,
            public: true,
            dependencies: &[("raw", DependencyInstruction::StateVar("rawRendererValue"))],
            calculate: parsed_number,
            inverse: Some(parsed_number_inverse),
        },
        StateVarDefinition {
            name: "lastValue",
            value_type: ValueType::Number,
            for_renderer: false,
            public: true,
            dependencies: &[(
                "essential",
                DependencyInstruction::Essential {
                    key: "lastValue",
                    initial: Initial::Attribute {
                        name: "prefill",
                        value_type: ValueType::Number,
                        fallback: ConstValue::Number(f64::NAN),
                    },
                },
            )],
            calculate: essential_value,
            inverse: Some(essential_inverse),
        },
        RAW_RENDERER_VALUE,
        VALUE_CHANGED,
        IMMEDIATE_VALUE_CHANGED,
        SYNC_IMMEDIATE_VALUE,
    ],
    primary: Some("value"),
    actions: &[
        ActionDefinition {
            name: "updateImmediateValue",
            gate: ActionGate::WhenFalse("disabled"),
            reads: &[],
            handler: update_raw_value,
            schedules: Some("updateValue"),
            commits: false,
            undoable: false,
        },
        ActionDefinition {
            name: "updateValue",
            gate: ActionGate::WhenFalse("disabled"),
            reads: &["syncImmediateValue", "immediateValue"],
            handler: update_last_value,
            schedules: None,
            commits: true,
            undoable: true,
        },
    ],
    composite: None,
    copy_mode: CopyMode::Shadow,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

fn bound_boolean(values: &DependencyValues) -> StateValue {
    if values.has("bind") {
        StateValue::Boolean(group_bool(values, "bind").unwrap_or(false))
    } else {
        StateValue::Boolean(values.bool_or("essential", false))
    }
}

fn bound_text(values: &DependencyValues) -> StateValue {
    if values.has("bind") {
        StateValue::String(values.text("bind"))
    } else {
        StateValue::String(values.text("essential"))
    }
}

fn bound_inverse(
    values: &DependencyValues,
    requested: &StateValue,
    _is_direct: bool,
) -> Option<Vec<UpdateRequest>> {
    let target = bind_target(values)?;
    Some(vec![UpdateRequest::new(target, requested.clone())])
}

fn committed_inverse(
    values: &DependencyValues,
    requested: &StateValue,
    _is_direct: bool,
) -> Option<Vec<UpdateRequest>> {
    let target = bind_target(values)?;
    Some(vec![
        UpdateRequest::new(target, requested.clone()),
        UpdateRequest::new("sync", true),
    ])
}

/// `None` when the binding mixes text and references and cannot be written.
fn bind_target(values: &DependencyValues) -> Option<&'static str> {
    match values.group("bind").len() {
        0 => Some("essential"),
        1 => Some("bind"),
        _ => None,
    }
}

fn immediate_value(values: &DependencyValues) -> StateValue {
    if values.bool_or("sync", true) {
        values.first("value").cloned().unwrap_or_default()
    } else {
        values.first("immediate").cloned().unwrap_or_default()
    }
}

fn immediate_inverse(
    _values: &DependencyValues,
    requested: &StateValue,
    is_direct: bool,
) -> Option<Vec<UpdateRequest>> {
    if is_direct {
        Some(vec![
            UpdateRequest::new("immediate", requested.clone()),
            UpdateRequest::new("sync", false),
        ])
    } else {
        // a write arriving through a binding commits
        Some(vec![UpdateRequest::new("value", requested.clone())])
    }
}

fn update_boolean(ctx: &ActionContext) -> Result<Vec<ActionWrite>, String> {
    Ok(vec![ActionWrite::new("value", ctx.arg_bool("boolean")?)])
}

fn toggle(ctx: &ActionContext) -> Result<Vec<ActionWrite>, String> {
    let current = ctx.state("value").as_bool().unwrap_or(false);
    Ok(vec![ActionWrite::new("value", !current)])
}

fn update_immediate_value(ctx: &ActionContext) -> Result<Vec<ActionWrite>, String> {
    Ok(vec![ActionWrite::new("immediateValue", ctx.arg_str("text")?)])
}

fn update_value(ctx: &ActionContext) -> Result<Vec<ActionWrite>, String> {
    if ctx.state("syncImmediateValue").as_bool().unwrap_or(true) {
        return Ok(Vec::new());
    }
    Ok(vec![ActionWrite::new("value", ctx.state("immediateValue"))])
}

/// Committed number: the typed value while in sync, otherwise the last commit.
fn number_value(values: &DependencyValues) -> StateValue {
    let group = if values.bool_or("sync", true) { "immediate" } else { "last" };
    StateValue::Number(values.first(group).and_then(StateValue::as_f64).unwrap_or(f64::NAN))
}

fn number_value_inverse(
    _values: &DependencyValues,
    requested: &StateValue,
    _is_direct: bool,
) -> Option<Vec<UpdateRequest>> {
    Some(vec![
        UpdateRequest::new("last", requested.clone()),
        UpdateRequest::new("immediate", requested.clone()),
        UpdateRequest::new("sync", true),
    ])
}

fn parsed_number(values: &DependencyValues) -> StateValue {
    let raw = values.text("raw");
    StateValue::Number(StateValue::String(raw).as_f64().unwrap_or(f64::NAN))
}

fn parsed_number_inverse(
    _values: &DependencyValues,
    requested: &StateValue,
    _is_direct: bool,
) -> Option<Vec<UpdateRequest>> {
    Some(vec![UpdateRequest::new("raw", requested.to_text())])
}

fn update_raw_value(ctx: &ActionContext) -> Result<Vec<ActionWrite>, String> {
    Ok(vec![
        ActionWrite::new("rawRendererValue", ctx.arg_str("text")?),
        ActionWrite::new("syncImmediateValue", false),
    ])
}

fn update_last_value(ctx: &ActionContext) -> Result<Vec<ActionWrite>, String> {
    if ctx.state("syncImmediateValue").as_bool().unwrap_or(true) {
        return Ok(Vec::new());
    }
    Ok(vec![
        ActionWrite::new("lastValue", ctx.state("immediateValue")),
        ActionWrite::new("syncImmediateValue", true),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_immediate_follows_value_while_synced() {
        let mut deps = DependencyValues::new();
        deps.push_group("value", vec!["committed".into()]);
        deps.push_group("sync", vec![true.into()]);
        deps.push_group("immediate", vec!["typing".into()]);
        assert_eq!(immediate_value(&deps), StateValue::from("committed"));

        let mut deps = DependencyValues::new();
        deps.push_group("value", vec!["committed".into()]);
        deps.push_group("sync", vec![false.into()]);
        deps.push_group("immediate", vec!["typing".into()]);
        assert_eq!(immediate_value(&deps), StateValue::from("typing"));
    }

    #[test]
    fn test_immediate_inverse_direct_and_bound() {
        let deps = DependencyValues::new();
        let direct = immediate_inverse(&deps, &"x".into(), true).unwrap();
        assert_eq!(
            direct,
            vec![UpdateRequest::new("immediate", "x"), UpdateRequest::new("sync", false)]
        );
        let bound = immediate_inverse(&deps, &"x".into(), false).unwrap();
        assert_eq!(bound, vec![UpdateRequest::new("value", "x")]);
    }

    #[test]
    fn test_committed_inverse_prefers_binding() {
        let mut deps = DependencyValues::new();
        deps.push_group("bind", vec!["source".into()]);
        let requests = committed_inverse(&deps, &"y".into(), true).unwrap();
        assert_eq!(requests[0], UpdateRequest::new("bind", "y"));

        let mut mixed = DependencyValues::new();
        mixed.push_group("bind", vec!["a".into(), "b".into()]);
        assert!(committed_inverse(&mixed, &"y".into(), true).is_none());
    }

    #[test]
    fn test_update_value_is_noop_when_synced() {
        let state = HashMap::from([
            ("syncImmediateValue", StateValue::Boolean(true)),
            ("immediateValue", StateValue::from("x")),
        ]);
        let args = json!({});
        let ctx = ActionContext { state: &state, args: &args };
        assert!(update_value(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_number_value_follows_sync() {
        let mut deps = DependencyValues::new();
        deps.push_group("last", vec![StateValue::Number(1.0)]);
        deps.push_group("immediate", vec![StateValue::Number(2.0)]);
        deps.push_group("sync", vec![false.into()]);
        assert_eq!(number_value(&deps), StateValue::Number(1.0));

        let mut raw = DependencyValues::new();
        raw.push_group("raw", vec![" 2.5 ".into()]);
        assert_eq!(parsed_number(&raw), StateValue::Number(2.5));

        let mut junk = DependencyValues::new();
        junk.push_group("raw", vec!["abc".into()]);
        assert!(parsed_number(&junk).as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_update_boolean_requires_argument() {
        let state = HashMap::new();
        let args = json!({"bool": true});
        let ctx = ActionContext { state: &state, args: &args };
        assert!(update_boolean(&ctx).is_err());
    }
}
