use super::{ConstValue, DependencyInstruction, StateVarDefinition};
use crate::graph::{DependencyValues, UpdateRequest};
use crate::math::{parse_math, MathExpr};
use crate::value::{parse_bool, StateValue, ValueType};
use std::collections::HashMap;

pub const HIDDEN: StateVarDefinition = StateVarDefinition {
    name: "hidden",
    value_type: ValueType::Boolean,
    for_renderer: true,
    public: true,
    dependencies: &[(
        "attribute",
        DependencyInstruction::Attribute {
            name: "hidden",
            value_type: ValueType::Boolean,
            default: Some(ConstValue::Bool(false)),
        },
    )],
    calculate: attribute_bool,
    inverse: Some(attribute_inverse),
};

pub const DISABLED: StateVarDefinition = StateVarDefinition {
    name: "disabled",
    value_type: ValueType::Boolean,
    for_renderer: true,
    public: true,
    dependencies: &[(
        "attribute",
        DependencyInstruction::Attribute {
            name: "disabled",
            value_type: ValueType::Boolean,
            default: Some(ConstValue::Bool(false)),
        },
    )],
    calculate: attribute_bool,
    inverse: Some(attribute_inverse),
};

/// `text` of a container: its children's text concatenated
pub const TEXT_FROM_CHILDREN: StateVarDefinition = StateVarDefinition {
    name: "text",
    value_type: ValueType::String,
    for_renderer: true,
    public: true,
    dependencies: &[("children", DependencyInstruction::Children)],
    calculate: children_text,
    inverse: None,
};

/// Boolean from an attribute group.
///
/// A single referenced value is converted directly; mixed text and
/// references are concatenated and parsed.
pub fn attribute_bool(values: &DependencyValues) -> StateValue {
    StateValue::Boolean(group_bool(values, "attribute").unwrap_or(false))
}

pub fn attribute_number(values: &DependencyValues) -> StateValue {
    StateValue::Number(group_number(values, "attribute").unwrap_or(f64::NAN))
}

pub fn attribute_text(values: &DependencyValues) -> StateValue {
    StateValue::String(values.text("attribute"))
}

pub fn attribute_inverse(
    values: &DependencyValues,
    requested: &StateValue,
    _is_direct: bool,
) -> Option<Vec<UpdateRequest>> {
    // only a single source can be written back
    if values.group("attribute").len() != 1 {
        return None;
    }
    Some(vec![UpdateRequest::new("attribute", requested.clone())])
}

pub fn essential_value(values: &DependencyValues) -> StateValue {
    values.first("essential").cloned().unwrap_or_default()
}

pub fn essential_inverse(
    _values: &DependencyValues,
    requested: &StateValue,
    _is_direct: bool,
) -> Option<Vec<UpdateRequest>> {
    Some(vec![UpdateRequest::new("essential", requested.clone())])
}

pub fn children_text(values: &DependencyValues) -> StateValue {
    StateValue::String(values.text("children"))
}

/// Value of a primitive that mirrors another component's state variable.
pub fn shadow_value(values: &DependencyValues) -> StateValue {
    values.first("shadow").cloned().unwrap_or_default()
}

pub fn shadow_inverse(
    values: &DependencyValues,
    requested: &StateValue,
    _is_direct: bool,
) -> Option<Vec<UpdateRequest>> {
    if !values.has("shadow") {
        return None;
    }
    Some(vec![UpdateRequest::new("shadow", requested.clone())])
}

pub fn group_bool(values: &DependencyValues, group: &str) -> Option<bool> {
    match values.group(group) {
        [] => None,
        [single] => single.as_bool(),
        _ => parse_bool(&values.text(group)),
    }
}

pub fn group_number(values: &DependencyValues, group: &str) -> Option<f64> {
    match values.group(group) {
        [] => None,
        [single] => single.as_f64(),
        _ => StateValue::String(values.text(group)).as_f64(),
    }
}

/// Build one expression from mixed text and value children.
///
/// Text is spliced in as written; other values enter as placeholders that
/// are substituted after parsing, so `2$x` multiplies by the value of `x`.
pub fn expression_from_pieces(pieces: &[StateValue]) -> MathExpr {
    let mut source = String::new();
    let mut bindings = HashMap::new();

    for (index, piece) in pieces.iter().enumerate() {
        match piece {
            StateValue::String(text) => source.push_str(text),
            StateValue::Undefined => {}
            other => {
                let placeholder = format!("__v{index}");
                source.push(' ');
                source.push_str(&placeholder);
                source.push(' ');
                bindings.insert(placeholder, other.to_math());
            }
        }
    }

    match parse_math(&source) {
        Ok(expr) => expr.substitute(&bindings),
        Err(_) => MathExpr::blank(),
    }
}
