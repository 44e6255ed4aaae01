//! A line on a graph that is either a stable or an unstable equilibrium.
//!
//! `stable` is an attribute-backed state variable: a literal or absent
//! attribute stores it locally, while `stable="$ref"` binds it to another
//! component and `switchLine` then writes through to that component.

use super::common::{attribute_bool, attribute_inverse, expression_from_pieces, HIDDEN};
use super::{
    ActionContext, ActionDefinition, ActionGate, ActionWrite, ComponentDefinition, ConstValue,
    CopyMode, DependencyInstruction, StateVarDefinition,
};
use crate::config::SimplifyPolicy;
use crate::graph::DependencyValues;
use crate::math::simplify;
use crate::value::{StateValue, ValueType};

pub static EQUILIBRIUM_LINE: ComponentDefinition = ComponentDefinition {
    component_type: "equilibriumLine",
    state_vars: &[
        HIDDEN,
        StateVarDefinition {
            name: "equation",
            value_type: ValueType::Math,
            for_renderer: true,
            public: true,
            dependencies: &[("children", DependencyInstruction::Children)],
            calculate: equation,
            inverse: None,
        },
        StateVarDefinition {
            name: "stable",
            value_type: ValueType::Boolean,
            for_renderer: true,
            public: true,
            dependencies: &[(
                "attribute",
                DependencyInstruction::Attribute {
                    name: "stable",
                    value_type: ValueType::Boolean,
                    default: Some(ConstValue::Bool(true)),
                },
            )],
            calculate: attribute_bool,
            inverse: Some(attribute_inverse),
        },
        StateVarDefinition {
            name: "switchable",
            value_type: ValueType::Boolean,
            for_renderer: true,
            public: true,
            dependencies: &[(
                "attribute",
                DependencyInstruction::Attribute {
                    name: "switchable",
                    value_type: ValueType::Boolean,
                    default: Some(ConstValue::Bool(false)),
                },
            )],
            calculate: attribute_bool,
            inverse: None,
        },
    ],
    primary: None,
    actions: &[ActionDefinition {
        name: "switchLine",
        gate: ActionGate::WhenTrue("switchable"),
        reads: &["stable"],
        handler: switch_line,
        schedules: None,
        commits: false,
        undoable: true,
    }],
    composite: None,
    copy_mode: CopyMode::Duplicate,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

fn equation(values: &DependencyValues) -> StateValue {
    let expr = expression_from_pieces(values.group("children"));
    StateValue::Math(simplify(&expr, SimplifyPolicy::Numbers))
}

fn switch_line(ctx: &ActionContext) -> Result<Vec<ActionWrite>, String> {
    let stable = ctx.state("stable").as_bool().unwrap_or(true);
    Ok(vec![ActionWrite::new("stable", !stable)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_equation_from_children() {
        let mut deps = DependencyValues::new();
        deps.push_group("children", vec!["y=4".into()]);
        assert_eq!(equation(&deps).to_json(), json!(["=", "y", 4]));
    }

    #[test]
    fn test_switch_line_flips_stable() {
        let state = HashMap::from([("stable", StateValue::Boolean(false))]);
        let args = json!({});
        let writes = switch_line(&ActionContext { state: &state, args: &args }).unwrap();
        assert_eq!(writes, vec![ActionWrite::new("stable", true)]);
    }
}
