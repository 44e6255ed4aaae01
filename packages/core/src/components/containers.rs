use super::common::{HIDDEN, TEXT_FROM_CHILDREN};
use super::{ComponentDefinition, CopyMode};

pub static DOCUMENT: ComponentDefinition = ComponentDefinition {
    component_type: "document",
    state_vars: &[TEXT_FROM_CHILDREN],
    primary: None,
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Duplicate,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

pub static SECTION: ComponentDefinition = ComponentDefinition {
    component_type: "section",
    state_vars: &[HIDDEN, TEXT_FROM_CHILDREN],
    primary: None,
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Duplicate,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

pub static P: ComponentDefinition = ComponentDefinition {
    component_type: "p",
    state_vars: &[HIDDEN, TEXT_FROM_CHILDREN],
    primary: None,
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Duplicate,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};

pub static GRAPH: ComponentDefinition = ComponentDefinition {
    component_type: "graph",
    state_vars: &[HIDDEN],
    primary: None,
    actions: &[],
    composite: None,
    copy_mode: CopyMode::Duplicate,
    variant_count: None,
    ignore_variants_from_children: false,
    new_namespace: false,
};
