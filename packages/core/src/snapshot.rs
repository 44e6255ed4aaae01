//! Read-only views of a live document.
//!
//! [`snapshot`] is the debugging/testing surface: every component with its
//! public state, active children and replacements. [`render_tree`] is what a
//! renderer consumes: the active tree from the root with renderer values.

use crate::engine::DoenetCore;
use crate::instance::{Child, ComponentId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActiveChild {
    Text(String),
    #[serde(rename_all = "camelCase")]
    Component { component_name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedParameters {
    pub variant_index: usize,
    pub variant_name: String,
    pub all_possible_variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSnapshot {
    pub component_type: String,
    pub state_values: BTreeMap<String, serde_json::Value>,
    pub active_children: Vec<ActiveChild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_parameters: Option<SharedParameters>,
}

impl ComponentSnapshot {
    pub fn value(&self, var: &str) -> Option<&serde_json::Value> {
        self.state_values.get(var)
    }
}

fn component_name(core: &DoenetCore, id: ComponentId) -> String {
    core.components
        .get(id)
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

/// Values of the variables selected by `include`; one that fails to
/// evaluate shows as `null`.
fn state_values(
    core: &mut DoenetCore,
    id: ComponentId,
    include: fn(&crate::components::StateVarDefinition) -> bool,
) -> BTreeMap<String, serde_json::Value> {
    let Some(instance) = core.components.get(id) else {
        return BTreeMap::new();
    };
    let vars: Vec<&'static str> = instance
        .definition
        .state_vars
        .iter()
        .filter(|var| include(var))
        .map(|var| var.name)
        .collect();
    vars.into_iter()
        .map(|var| {
            let value = core
                .read_var(id, var)
                .map(|value| value.to_json())
                .unwrap_or(serde_json::Value::Null);
            (var.to_string(), value)
        })
        .collect()
}

/// Every live component by full name.
pub fn snapshot(core: &mut DoenetCore) -> BTreeMap<String, ComponentSnapshot> {
    let ids: Vec<ComponentId> = core.components.iter().map(|(id, _)| id).collect();
    let mut out = BTreeMap::new();
    for id in ids {
        let Some(instance) = core.components.get(id) else {
            continue;
        };
        let name = instance.name.clone();
        let component_type = instance.component_type().to_string();
        let replacements = instance.composite().map(|_| {
            core.replacements(id)
                .iter()
                .map(|r| component_name(core, *r))
                .collect()
        });
        let active_children = core
            .active_children(id)
            .into_iter()
            .map(|child| match child {
                Child::Text(text) => ActiveChild::Text(text),
                Child::Component(child) => ActiveChild::Component {
                    component_name: component_name(core, child),
                },
            })
            .collect();
        let shared_parameters = (id == core.root).then(|| SharedParameters {
            variant_index: core.variant.index,
            variant_name: core.variant.name.clone(),
            all_possible_variants: core.variant.all_possible_variants.clone(),
        });
        let state_values = state_values(core, id, |var| var.public);
        out.insert(
            name,
            ComponentSnapshot {
                component_type,
                state_values,
                active_children,
                replacements,
                shared_parameters,
            },
        );
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderChild {
    Text(String),
    Node(RenderNode),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub component_name: String,
    pub component_type: String,
    pub state_values: BTreeMap<String, serde_json::Value>,
    pub children: Vec<RenderChild>,
}

/// The renderer's view, starting at the document.
pub fn render_tree(core: &mut DoenetCore) -> RenderNode {
    let root = core.root;
    render_node(core, root)
}

fn render_node(core: &mut DoenetCore, id: ComponentId) -> RenderNode {
    let component_name = component_name(core, id);
    let component_type = core
        .components
        .get(id)
        .map(|c| c.component_type().to_string())
        .unwrap_or_default();
    let state_values = state_values(core, id, |var| var.for_renderer);
    let children = core
        .active_children(id)
        .into_iter()
        .filter_map(|child| match child {
            Child::Text(text) if text.trim().is_empty() => None,
            Child::Text(text) => Some(RenderChild::Text(text)),
            Child::Component(child) => Some(RenderChild::Node(render_node(core, child))),
        })
        .collect();
    RenderNode {
        component_name,
        component_type,
        state_values,
        children,
    }
}
