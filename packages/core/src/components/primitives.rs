use super::common::{
    attribute_text, children_text, expression_from_pieces, group_bool, HIDDEN,
};
use super::{ComponentDefinition, ConstValue, CopyMode, DependencyInstruction, StateVarDefinition};
use crate::config::SimplifyPolicy;
use crate::graph::DependencyValues;
use crate::math::simplify;
use crate::value::{StateValue, ValueType};

pub static TEXT: ComponentDefinition = ComponentDefinition {
    component_type: "text",
    state_vars: &[
        HIDDEN,
        StateVarDefinition {
            name: "value",
            value_type: ValueType::String,
            for_renderer: true,
            public: true,
            dependencies: &[("children", DependencyInstruction::Children)],
            calculate: children_text,
            inverse: None,
        },
    ],
    primary: Some("value"),
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Shadow,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

pub static BOOLEAN: ComponentDefinition = ComponentDefinition {
    component_type: "boolean",
    state_vars: &[
        HIDDEN,
        StateVarDefinition {
            name: "value",
            value_type: ValueType::Boolean,
            for_renderer: true,
            public: true,
            dependencies: &[("children", DependencyInstruction::Children)],
            calculate: boolean_from_children,
            inverse: None,
        },
    ],
    primary: Some("value"),
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Shadow,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

pub static NUMBER: ComponentDefinition = ComponentDefinition {
    component_type: "number",
    state_vars: &[
        HIDDEN,
        StateVarDefinition {
            name: "value",
            value_type: ValueType::Number,
            for_renderer: true,
            public: true,
            dependencies: &[("children", DependencyInstruction::Children)],
            calculate: number_from_children,
            inverse: None,
        },
    ],
    primary: Some("value"),
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Shadow,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

pub static MATH: ComponentDefinition = ComponentDefinition {
    component_type: "math",
    state_vars: &[
        HIDDEN,
        StateVarDefinition {
            name: "simplify",
            value_type: ValueType::String,
            for_renderer: false,
            public: true,
            dependencies: &[(
                "attribute",
                DependencyInstruction::Attribute {
                    name: "simplify",
                    value_type: ValueType::String,
                    default: Some(ConstValue::DefaultSimplify),
                },
            )],
            calculate: attribute_text,
            inverse: None,
        },
        StateVarDefinition {
            name: "value",
            value_type: ValueType::Math,
            for_renderer: true,
            public: true,
            dependencies: &[
                ("children", DependencyInstruction::Children),
                ("simplify", DependencyInstruction::StateVar("simplify")),
            ],
            calculate: math_from_children,
            inverse: None,
        },
    ],
    primary: Some("value"),
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Shadow,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

fn boolean_from_children(values: &DependencyValues) -> StateValue {
    StateValue::Boolean(group_bool(values, "children").unwrap_or(false))
}

fn number_from_children(values: &DependencyValues) -> StateValue {
    let expr = expression_from_pieces(values.group("children"));
    StateValue::Number(expr.evaluate().unwrap_or(f64::NAN))
}

fn math_from_children(values: &DependencyValues) -> StateValue {
    let policy = values
        .first("simplify")
        .and_then(StateValue::as_str)
        .and_then(SimplifyPolicy::from_attribute)
        .unwrap_or_default();
    let expr = expression_from_pieces(values.group("children"));
    StateValue::Math(simplify(&expr, policy))
}
