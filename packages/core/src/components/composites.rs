use super::common::{attribute_number, attribute_text, HIDDEN};
use super::{
    CompositeKind, ComponentDefinition, ConstValue, CopyMode, DependencyInstruction,
    StateVarDefinition,
};
use crate::graph::DependencyValues;
use crate::value::{StateValue, ValueType};
use doenet_parser::Element;

const SEQUENCE_DEFAULTS: (f64, f64, f64) = (1.0, 10.0, 1.0);

const SEQUENCE_BOUNDS: &[(&str, DependencyInstruction)] = &[
    ("from", DependencyInstruction::StateVar("from")),
    ("to", DependencyInstruction::StateVar("to")),
    ("step", DependencyInstruction::StateVar("step")),
    ("exclude", DependencyInstruction::StateVar("exclude")),
];

pub static SELECT_FROM_SEQUENCE: ComponentDefinition = ComponentDefinition {
    component_type: "selectFromSequence",
    state_vars: &[
        HIDDEN,
        StateVarDefinition {
            name: "from",
            value_type: ValueType::Number,
            for_renderer: false,
            public: true,
            dependencies: &[(
                "attribute",
                DependencyInstruction::Attribute {
                    name: "from",
                    value_type: ValueType::Number,
                    default: Some(ConstValue::Number(SEQUENCE_DEFAULTS.0)),
                },
            )],
            calculate: attribute_number,
            inverse: None,
        },
        StateVarDefinition {
            name: "to",
            value_type: ValueType::Number,
            for_renderer: false,
            public: true,
            dependencies: &[(
                "attribute",
                DependencyInstruction::Attribute {
                    name: "to",
                    value_type: ValueType::Number,
                    default: Some(ConstValue::Number(SEQUENCE_DEFAULTS.1)),
                },
            )],
            calculate: attribute_number,
            inverse: None,
        },
        StateVarDefinition {
            name: "step",
            value_type: ValueType::Number,
            for_renderer: false,
            public: true,
            dependencies: &[(
                "attribute",
                DependencyInstruction::Attribute {
                    name: "step",
                    value_type: ValueType::Number,
                    default: Some(ConstValue::Number(SEQUENCE_DEFAULTS.2)),
                },
            )],
            calculate: attribute_number,
            inverse: None,
        },
        StateVarDefinition {
            name: "exclude",
            value_type: ValueType::List,
            for_renderer: false,
            public: true,
            dependencies: &[(
                "attribute",
                DependencyInstruction::Attribute {
                    name: "exclude",
                    value_type: ValueType::List,
                    default: None,
                },
            )],
            calculate: number_list,
            inverse: None,
        },
        StateVarDefinition {
            name: "possibleValues",
            value_type: ValueType::List,
            for_renderer: false,
            public: true,
            dependencies: SEQUENCE_BOUNDS,
            calculate: possible_values,
            inverse: None,
        },
        StateVarDefinition {
            name: "count",
            value_type: ValueType::Integer,
            for_renderer: false,
            public: true,
            dependencies: SEQUENCE_BOUNDS,
            calculate: value_count,
            inverse: None,
        },
        StateVarDefinition {
            name: "selectedIndex",
            value_type: ValueType::Integer,
            for_renderer: false,
            public: true,
            dependencies: &[("variant", DependencyInstruction::VariantIndex)],
            calculate: selected_index,
            inverse: None,
        },
        StateVarDefinition {
            name: "selectedValue",
            value_type: ValueType::Number,
            for_renderer: false,
            public: true,
            dependencies: &[
                ("from", DependencyInstruction::StateVar("from")),
                ("to", DependencyInstruction::StateVar("to")),
                ("step", DependencyInstruction::StateVar("step")),
                ("exclude", DependencyInstruction::StateVar("exclude")),
                ("index", DependencyInstruction::StateVar("selectedIndex")),
            ],
            calculate: selected_value,
            inverse: None,
        },
    ],
    primary: None,
    actions: &[],
    composite: Some(CompositeKind::SelectFromSequence),
    copy_mode: CopyMode::Duplicate,
    variant_count: Some(sequence_variant_count),
    ignore_variants_from_children: false,
    new_namespace: false,
};

/// `<copy source="..." prop="..." assignNames="..."/>` and every `$macro`
pub static COPY: ComponentDefinition = ComponentDefinition {
    component_type: "copy",
    state_vars: &[],
    primary: None,
    actions: &[],
    composite: Some(CompositeKind::Copy),
    copy_mode: CopyMode::Duplicate,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

pub static COLLECT: ComponentDefinition = ComponentDefinition {
    component_type: "collect",
    state_vars: &[],
    primary: None,
    actions: &[],
    composite: Some(CompositeKind::Collect),
    copy_mode: CopyMode::Duplicate,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

/// Placeholder standing in for content that could not be built
pub static ERROR: ComponentDefinition = ComponentDefinition {
    component_type: "_error",
    state_vars: &[StateVarDefinition {
        name: "message",
        value_type: ValueType::String,
        for_renderer: true,
        public: true,
        dependencies: &[(
            "attribute",
            DependencyInstruction::Attribute {
                name: "message",
                value_type: ValueType::String,
                default: Some(ConstValue::Text("")),
            },
        )],
        calculate: attribute_text,
        inverse: None,
    }],
    primary: None,
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Duplicate,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

/// Values listed in `possibleValues`; selection never needs the full list
const LISTED_VALUES: usize = 1000;

/// Length of the grid `from, from + step, ..., <= to`, saturating.
fn grid_len(from: f64, to: f64, step: f64) -> usize {
    if !(from.is_finite() && to.is_finite() && step.is_finite()) || step <= 0.0 {
        return 0;
    }
    let last = ((to - from) / step + 1e-9).floor();
    if last < 0.0 {
        return 0;
    }
    // float to int casts saturate
    (last as usize).saturating_add(1)
}

/// Grid positions of the excluded values, ascending and deduplicated.
fn excluded_positions(from: f64, step: f64, len: usize, exclude: &[f64]) -> Vec<usize> {
    let mut positions: Vec<usize> = exclude
        .iter()
        .filter_map(|value| {
            let position = ((value - from) / step).round();
            if !(position >= 0.0 && position < len as f64) {
                return None;
            }
            let on_grid = (from + step * position - value).abs() < 1e-9;
            on_grid.then_some(position as usize)
        })
        .collect();
    positions.sort_unstable();
    positions.dedup();
    positions
}

/// Number of values in the sequence, computed without listing them.
pub fn sequence_count(from: f64, to: f64, step: f64, exclude: &[f64]) -> usize {
    let len = grid_len(from, to, step);
    if len == 0 {
        return 0;
    }
    len - excluded_positions(from, step, len, exclude).len()
}

/// The `index`-th (0-based) value, wrapping past the end.
pub fn sequence_value(from: f64, to: f64, step: f64, exclude: &[f64], index: usize) -> Option<f64> {
    let len = grid_len(from, to, step);
    if len == 0 {
        return None;
    }
    let excluded = excluded_positions(from, step, len, exclude);
    let count = len - excluded.len();
    if count == 0 {
        return None;
    }
    let mut position = index % count;
    for skipped in excluded {
        if skipped <= position {
            position += 1;
        } else {
            break;
        }
    }
    Some(from + step * position as f64)
}

/// Values `from, from + step, ..., <= to`, minus the excluded ones, at most `limit` of them.
pub fn sequence(from: f64, to: f64, step: f64, exclude: &[f64], limit: usize) -> Vec<f64> {
    let count = sequence_count(from, to, step, exclude).min(limit);
    (0..count)
        .filter_map(|index| sequence_value(from, to, step, exclude, index))
        .collect()
}

fn literal_number(element: &Element, name: &str, default: f64) -> f64 {
    element
        .literal_attribute(name)
        .and_then(|text| text.trim().parse().ok())
        .unwrap_or(default)
}

fn sequence_variant_count(element: &Element) -> usize {
    let (from, to, step) = SEQUENCE_DEFAULTS;
    let exclude: Vec<f64> = element
        .literal_attribute("exclude")
        .map(|text| {
            text.split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(|item| item.parse().ok())
                .collect()
        })
        .unwrap_or_default();
    sequence_count(
        literal_number(element, "from", from),
        literal_number(element, "to", to),
        literal_number(element, "step", step),
        &exclude,
    )
    .max(1)
}

fn number_list(values: &DependencyValues) -> StateValue {
    let mut numbers = Vec::new();
    for value in values.group("attribute") {
        match value {
            StateValue::List(items) => numbers.extend(items.iter().filter_map(StateValue::as_f64)),
            other => numbers.extend(other.as_f64()),
        }
    }
    StateValue::List(numbers.into_iter().map(StateValue::Number).collect())
}

/// `from`, `to`, `step` and the excluded values of a sequence.
fn bounds(values: &DependencyValues) -> (f64, f64, f64, Vec<f64>) {
    let number = |group: &str| values.first(group).and_then(StateValue::as_f64).unwrap_or(f64::NAN);
    let exclude = match values.first("exclude") {
        Some(StateValue::List(items)) => items.iter().filter_map(StateValue::as_f64).collect(),
        _ => Vec::new(),
    };
    (number("from"), number("to"), number("step"), exclude)
}

fn possible_values(values: &DependencyValues) -> StateValue {
    let (from, to, step, exclude) = bounds(values);
    let listed = sequence(from, to, step, &exclude, LISTED_VALUES);
    StateValue::List(listed.into_iter().map(StateValue::Number).collect())
}

fn value_count(values: &DependencyValues) -> StateValue {
    let (from, to, step, exclude) = bounds(values);
    let count = sequence_count(from, to, step, &exclude);
    StateValue::Integer(i64::try_from(count).unwrap_or(i64::MAX))
}

fn selected_index(values: &DependencyValues) -> StateValue {
    StateValue::Integer(values.first("variant").and_then(StateValue::as_i64).unwrap_or(1))
}

fn selected_value(values: &DependencyValues) -> StateValue {
    let (from, to, step, exclude) = bounds(values);
    let index = values.first("index").and_then(StateValue::as_i64).unwrap_or(1).max(1);
    let position = usize::try_from(index - 1).unwrap_or(0);
    StateValue::Number(sequence_value(from, to, step, &exclude, position).unwrap_or(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doenet_parser::parse;

    fn first_element(source: &str) -> Element {
        let doc = parse(source).unwrap();
        doc.children[0].as_element().unwrap().clone()
    }

    fn bounds_with_index(to: f64, exclude: Vec<f64>, index: i64) -> DependencyValues {
        let mut deps = DependencyValues::new();
        deps.push_group("from", vec![StateValue::Number(1.0)]);
        deps.push_group("to", vec![StateValue::Number(to)]);
        deps.push_group("step", vec![StateValue::Number(1.0)]);
        deps.push_group(
            "exclude",
            vec![StateValue::List(exclude.into_iter().map(StateValue::Number).collect())],
        );
        deps.push_group("index", vec![StateValue::Integer(index)]);
        deps
    }

    #[test]
    fn test_sequence_with_exclusions() {
        assert_eq!(sequence(1.0, 5.0, 1.0, &[2.0, 4.0], 100), vec![1.0, 3.0, 5.0]);
        assert_eq!(sequence(0.0, 1.0, 0.5, &[], 100), vec![0.0, 0.5, 1.0]);
        assert!(sequence(5.0, 1.0, 1.0, &[], 100).is_empty());
        assert_eq!(sequence(1.0, 5.0, 1.0, &[], 2), vec![1.0, 2.0]);
    }

    #[test]
    fn test_count_ignores_off_grid_and_repeated_exclusions() {
        assert_eq!(sequence_count(1.0, 5.0, 1.0, &[2.0, 2.0, 2.5, 9.0]), 4);
        assert_eq!(sequence_count(1.0, 3.0, 1.0, &[1.0, 2.0, 3.0]), 0);
        assert_eq!(sequence_value(1.0, 3.0, 1.0, &[1.0, 2.0, 3.0], 0), None);
    }

    #[test]
    fn test_huge_sequence_is_counted_not_listed() {
        assert_eq!(sequence_count(1.0, 1e300, 1.0, &[]), usize::MAX);
        assert_eq!(sequence_value(1.0, 1e300, 1.0, &[], 41), Some(42.0));
        assert_eq!(sequence(1.0, 1e300, 1.0, &[], 3), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_variant_count_from_literal_attributes() {
        let element = first_element(r#"<selectFromSequence from="1" to="20" exclude="3 5"/>"#);
        assert_eq!(sequence_variant_count(&element), 18);
        assert_eq!(sequence_variant_count(&first_element("<selectFromSequence/>")), 10);
        let huge = first_element(r#"<selectFromSequence to="1e300"/>"#);
        assert_eq!(sequence_variant_count(&huge), usize::MAX);
    }

    #[test]
    fn test_selected_value_skips_exclusions_and_wraps() {
        assert_eq!(selected_value(&bounds_with_index(5.0, vec![2.0, 4.0], 2)), StateValue::Number(3.0));
        assert_eq!(selected_value(&bounds_with_index(5.0, vec![2.0, 4.0], 4)), StateValue::Number(1.0));
        assert_eq!(value_count(&bounds_with_index(5.0, vec![2.0, 4.0], 1)), StateValue::Integer(3));
    }
}
