//! Turning dependency instructions into graph edges.
//!
//! Wiring is repeated after every structural change. Declaring identical
//! inputs is a no-op in the graph, so only cells whose sources actually
//! moved are invalidated.

use crate::components::{
    shadow_inverse, shadow_value, ConstValue, DependencyInstruction, Initial, StateVarDefinition,
};
use crate::engine::DoenetCore;
use crate::error::Diagnostic;
use crate::graph::{CalculateFn, CellId, InputGroup, InputSource, InverseFn};
use crate::instance::{Child, ComponentId, Shadow};
use crate::value::{StateValue, ValueType};
use doenet_parser::{AttrPiece, Attribute};
use tracing::{debug, warn};

/// Literal attribute text as a value of `value_type`.
pub(crate) fn parse_literal(text: &str, value_type: ValueType) -> StateValue {
    match value_type {
        ValueType::List => StateValue::List(
            text.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|item| !item.is_empty())
                .map(StateValue::from)
                .collect(),
        ),
        ValueType::String => StateValue::String(text.to_string()),
        other => StateValue::String(text.to_string()).coerce(other),
    }
}

fn attribute_key(name: &str) -> String {
    format!("attr:{name}")
}

impl DoenetCore {
    pub(crate) fn wire_all(&mut self) {
        let ids: Vec<ComponentId> = self.components.iter().map(|(id, _)| id).collect();
        for id in &ids {
            self.link(*id);
        }
        for id in &ids {
            self.ensure_cells(*id);
        }
        for id in &ids {
            self.wire_component(*id);
        }
    }

    /// Resolve `copySource` into shared state or a shadowed primary value.
    fn link(&mut self, id: ComponentId) {
        let Some(instance) = self.components.get(id) else {
            return;
        };
        if instance.linked || instance.composite().is_some() {
            return;
        }
        let Some(reference) = instance.copy_source.clone() else {
            return;
        };
        let Some(target) = self.resolve_path(&reference.path, &instance.scope) else {
            debug!(component = %instance.name, %reference, "copySource not resolved yet");
            return;
        };
        let Some(target_instance) = self.components.get(target) else {
            return;
        };

        let same_type = std::ptr::eq(instance.definition, target_instance.definition);
        let primary = instance.primary();
        let mut extends = None;
        let mut shadow = None;
        if reference.prop.is_none() && same_type && target != id {
            extends = Some(target);
        } else {
            let var = match reference.prop.as_deref() {
                Some(prop) => target_instance.definition.state_var(prop).map(|def| def.name),
                None => target_instance.definition.value_for_parent(),
            };
            match (primary, var) {
                (Some(_), Some(var)) if target != id => {
                    shadow = Some(Shadow {
                        component: target,
                        var,
                    })
                }
                _ => {
                    warn!(component = %instance.name, %reference, "copySource has no value to mirror");
                }
            }
        }

        let primary_cell = primary.and_then(|primary| instance.cell(primary));
        if let Some(instance) = self.components.get_mut(id) {
            instance.linked = true;
            if instance.extends.is_none() {
                instance.extends = extends;
            }
            instance.shadow = shadow;
        }
        if let (Some(_), Some(cell)) = (shadow, primary_cell) {
            if let Err(error) = self.graph.set_rule(cell, shadow_value, Some(shadow_inverse)) {
                warn!(%error, "could not switch to shadow");
            }
        }
    }

    fn ensure_cells(&mut self, id: ComponentId) {
        let Some(instance) = self.components.get(id) else {
            return;
        };
        let missing: Vec<&'static StateVarDefinition> = instance
            .definition
            .state_vars
            .iter()
            .filter(|var| instance.cell(var.name).is_none())
            .collect();
        if missing.is_empty() {
            return;
        }

        let name = instance.name.clone();
        let shadowed = instance.shadow.and(instance.primary());
        let mut created = Vec::with_capacity(missing.len());
        for var in missing {
            let (calculate, inverse): (CalculateFn, Option<InverseFn>) = if shadowed == Some(var.name) {
                (shadow_value, Some(shadow_inverse))
            } else {
                (var.calculate, var.inverse)
            };
            let cell = self.graph.add_derived(
                id,
                var.name,
                format!("{name}.{}", var.name),
                var.value_type,
                calculate,
                inverse,
            );
            created.push((var.name, cell));
        }
        if let Some(instance) = self.components.get_mut(id) {
            instance.cells.extend(created);
        }
    }

    fn wire_component(&mut self, id: ComponentId) {
        let Some(instance) = self.components.get(id) else {
            return;
        };
        let definition = instance.definition;
        let shadow = instance.shadow;
        let primary = instance.primary();

        for var in definition.state_vars {
            let Some(cell) = self.components.get(id).and_then(|c| c.cell(var.name)) else {
                continue;
            };
            let groups = match shadow {
                Some(shadow) if primary == Some(var.name) => {
                    let source = self
                        .value_cell(shadow.component, Some(shadow.var))
                        .map(InputSource::Cell)
                        .unwrap_or(InputSource::Constant(StateValue::Undefined));
                    vec![InputGroup::new("shadow", vec![source])]
                }
                _ => var
                    .dependencies
                    .iter()
                    .map(|(group, instruction)| {
                        InputGroup::new(group, self.input_sources(id, instruction))
                    })
                    .collect(),
            };
            if let Err(error) = self.graph.declare_dependency(cell, groups) {
                warn!(%error, "could not wire state variable");
            }
        }
    }

    fn input_sources(
        &mut self,
        id: ComponentId,
        instruction: &DependencyInstruction,
    ) -> Vec<InputSource> {
        match *instruction {
            DependencyInstruction::Essential { key, initial } => {
                let owner = self.essential_root(id);
                let (value_type, value) = self.initial_value(id, initial);
                vec![InputSource::Cell(self.essential_cell(owner, key, value_type, value))]
            }
            DependencyInstruction::StateVar(name) => self
                .components
                .get(id)
                .and_then(|c| c.cell(name))
                .map(InputSource::Cell)
                .into_iter()
                .collect(),
            DependencyInstruction::Attribute {
                name,
                value_type,
                default,
            } => self.attribute_sources(id, name, value_type, default),
            DependencyInstruction::Children => self
                .active_children(id)
                .into_iter()
                .filter_map(|child| match child {
                    Child::Text(text) => Some(InputSource::Constant(StateValue::String(text))),
                    Child::Component(child) => self.value_cell(child, None).map(InputSource::Cell),
                })
                .collect(),
            DependencyInstruction::VariantIndex => {
                let index = self.components.get(id).map(|c| c.variant_index).unwrap_or(1);
                vec![InputSource::Constant(StateValue::Integer(index as i64))]
            }
        }
    }

    fn initial_value(&self, id: ComponentId, initial: Initial) -> (ValueType, StateValue) {
        let policy = self.config.default_simplify;
        match initial {
            Initial::Value(value) => {
                let value = value.to_state_value(policy);
                (value.value_type().unwrap_or(ValueType::String), value)
            }
            Initial::Attribute {
                name,
                value_type,
                fallback,
            } => {
                let literal = self
                    .find_attribute(id, name)
                    .and_then(|(_, attribute)| attribute.value.as_literal());
                let value = match literal {
                    Some(text) => parse_literal(&text, value_type),
                    None => fallback.to_state_value(policy).coerce(value_type),
                };
                (value_type, value)
            }
        }
    }

    /// Essential cell `key` of `owner`, created on first use.
    ///
    /// A saved value for the owner is applied when the cell is created.
    pub(crate) fn essential_cell(
        &mut self,
        owner: ComponentId,
        key: &str,
        value_type: ValueType,
        initial: StateValue,
    ) -> CellId {
        let Some(instance) = self.components.get(owner) else {
            return CellId::INVALID;
        };
        if let Some(cell) = instance.essential(key) {
            return cell;
        }
        let name = instance.name.clone();
        let value = match self.saved.value(&name, key) {
            Some(saved) => {
                debug!(component = %name, key, "restored saved value");
                saved.clone()
            }
            None => initial,
        };
        let cell = self
            .graph
            .add_essential(owner, key, format!("{name}.{key}"), value_type, value);
        if let Some(instance) = self.components.get_mut(owner) {
            instance.essentials.push((key.to_string(), cell));
        }
        cell
    }

    /// The attribute on `id` or, when absent, on what it extends.
    pub(crate) fn find_attribute(
        &self,
        id: ComponentId,
        name: &str,
    ) -> Option<(ComponentId, Attribute)> {
        let mut current = Some(id);
        while let Some(node) = current {
            let instance = self.components.get(node)?;
            if let Some(attribute) = instance.attribute(name) {
                return Some((node, attribute.clone()));
            }
            current = instance.extends;
        }
        None
    }

    /// Furthest component along `extends` that declares the same value,
    /// so copies share one cell for an attribute they inherited.
    fn attribute_owner(
        &self,
        declarer: ComponentId,
        name: &str,
        attribute: &Attribute,
    ) -> ComponentId {
        let mut owner = declarer;
        let mut current = self.components.get(declarer).and_then(|c| c.extends);
        while let Some(node) = current {
            let Some(instance) = self.components.get(node) else {
                break;
            };
            if instance.attribute(name).map(|a| &a.value) == Some(&attribute.value) {
                owner = node;
            }
            current = instance.extends;
        }
        owner
    }

    fn attribute_sources(
        &mut self,
        id: ComponentId,
        name: &str,
        value_type: ValueType,
        default: Option<ConstValue>,
    ) -> Vec<InputSource> {
        match self.find_attribute(id, name) {
            Some((declarer, attribute)) if attribute.value.has_macros() => {
                let scope = self
                    .components
                    .get(declarer)
                    .map(|c| c.scope.clone())
                    .unwrap_or_default();
                attribute
                    .value
                    .0
                    .iter()
                    .filter_map(|piece| match piece {
                        AttrPiece::Text(text) if text.is_empty() => None,
                        AttrPiece::Text(text) => {
                            Some(InputSource::Constant(StateValue::String(text.clone())))
                        }
                        AttrPiece::Macro(reference) => Some(
                            self.resolve_path(&reference.path, &scope)
                                .and_then(|target| self.value_cell(target, reference.prop.as_deref()))
                                .map(InputSource::Cell)
                                .unwrap_or(InputSource::Constant(StateValue::Undefined)),
                        ),
                    })
                    .collect()
            }
            Some((declarer, attribute)) => {
                let text = attribute.value.as_literal().unwrap_or_default();
                let owner = self.attribute_owner(declarer, name, &attribute);
                let value = parse_literal(&text, value_type);
                vec![InputSource::Cell(self.essential_cell(
                    owner,
                    &attribute_key(name),
                    value_type,
                    value,
                ))]
            }
            None => match default {
                Some(default) => {
                    let owner = self.essential_root(id);
                    let value = default
                        .to_state_value(self.config.default_simplify)
                        .coerce(value_type);
                    vec![InputSource::Cell(self.essential_cell(
                        owner,
                        &attribute_key(name),
                        value_type,
                        value,
                    ))]
                }
                None => Vec::new(),
            },
        }
    }

    /// Read every cell once, recording cycles as diagnostics.
    pub(crate) fn validate_all(&mut self) {
        let cells: Vec<CellId> = self
            .components
            .iter()
            .flat_map(|(_, c)| c.cells.iter().map(|(_, cell)| *cell).collect::<Vec<_>>())
            .collect();
        for cell in cells {
            if let Err(error) = self.graph.read(cell) {
                let component = self
                    .graph
                    .cell(cell)
                    .and_then(|c| self.components.get(c.component))
                    .map(|c| c.name.clone());
                self.push_diagnostic(Diagnostic::error(
                    error.to_string(),
                    component.as_deref(),
                ));
            }
        }
    }
}
