//! Composite replacement engine.
//!
//! Each settle pass wires the graph, then walks the tree in document order
//! and asks every composite what it would expand into. The answer carries
//! a signature (the component ids and values it was derived from); when it
//! matches the recorded one the existing replacements are kept as they
//! are. Otherwise the old subtree is freed and a new one is built, wired
//! and read once so that a cycle it introduced turns into an `_error`
//! placeholder scoped to that composite.

use crate::builder::Origin;
use crate::components::{self, CompositeKind, CopyMode};
use crate::engine::{DoenetCore, ExpansionRecord, ExpansionSignature};
use crate::error::{CoreError, Diagnostic};
use crate::graph::{CellId, GraphError};
use crate::instance::{Child, ComponentId, ComponentInstance, Shadow};
use crate::value::ValueType;
use doenet_parser::{Attribute, MacroRef};
use tracing::{debug, instrument, warn};

/// Attributes that configure a composite rather than its replacements
const COMPOSITE_ATTRIBUTES: &[&str] = &[
    "name",
    "assignNames",
    "source",
    "prop",
    "componentTypes",
    "newNamespace",
];

#[derive(Debug, Clone, PartialEq)]
enum Replacement {
    /// A new subtree sharing the source's essential state
    Duplicate(ComponentId),
    /// A primitive mirroring one state variable
    Shadow(Shadow),
    /// A `number` holding this text
    Number(String),
    /// Markup to parse and build
    Markup(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
struct ExpansionPlan {
    signature: ExpansionSignature,
    replacements: Vec<Replacement>,
}

impl ExpansionPlan {
    fn new(targets: Vec<ComponentId>, key: impl Into<String>, replacements: Vec<Replacement>) -> Self {
        Self {
            signature: ExpansionSignature {
                targets,
                key: key.into(),
            },
            replacements,
        }
    }
}

/// Local names for what one expansion creates: `{composite}_{n}`.
struct Naming {
    prefix: String,
    counter: usize,
}

impl Naming {
    fn next(&mut self) -> String {
        self.counter += 1;
        format!("{}_{}", self.prefix, self.counter)
    }
}

impl DoenetCore {
    /// Expand composites until nothing changes.
    #[instrument(skip(self))]
    pub(crate) fn settle(&mut self) {
        let depth = self.config.max_expansion_depth;
        for pass in 0..depth {
            self.wire_all();
            if !self.expand_pass() {
                debug!(passes = pass + 1, "settled");
                return;
            }
        }
        self.wire_all();
        let error = CoreError::ExpansionDepthExceeded {
            component: self.root_name().to_string(),
            depth,
        };
        warn!(%error, "expansion did not settle");
        self.push_diagnostic(Diagnostic::error(error.to_string(), None));
    }

    fn expand_pass(&mut self) -> bool {
        let composites: Vec<ComponentId> = self
            .subtree(self.root)
            .into_iter()
            .filter(|id| self.components.get(*id).is_some_and(|c| c.composite().is_some()))
            .collect();

        let mut changed = false;
        for id in composites {
            if !self.components.contains(id) {
                continue;
            }
            let plan = self.plan_expansion(id);
            if self
                .expansions
                .get(&id)
                .is_some_and(|record| record.signature == plan.signature)
            {
                continue;
            }
            self.expand(id, plan);
            changed = true;
        }
        changed
    }

    fn plan_expansion(&mut self, id: ComponentId) -> ExpansionPlan {
        match self.components.get(id).and_then(|c| c.composite()) {
            Some(CompositeKind::Copy) => self.plan_copy(id),
            Some(CompositeKind::Collect) => self.plan_collect(id),
            Some(CompositeKind::SelectFromSequence) => self.plan_select(id),
            Some(CompositeKind::EditorResults) => self.plan_editor(id),
            None => ExpansionPlan::new(Vec::new(), "", Vec::new()),
        }
    }

    /// Source reference and `prop` of a copy or collect.
    fn composite_source(&self, id: ComponentId) -> Option<(MacroRef, Option<String>, String)> {
        let instance = self.components.get(id)?;
        let reference = instance.copy_source.clone()?;
        let prop = reference
            .prop
            .clone()
            .or_else(|| instance.literal_attribute("prop"));
        Some((reference, prop, instance.scope.clone()))
    }

    fn plan_copy(&mut self, id: ComponentId) -> ExpansionPlan {
        let Some((reference, prop, scope)) = self.composite_source(id) else {
            return ExpansionPlan::new(Vec::new(), "no source", Vec::new());
        };
        let Some(target) = self.resolve_path(&reference.path, &scope) else {
            debug!(%reference, "copy target missing");
            return ExpansionPlan::new(Vec::new(), format!("missing {reference}"), Vec::new());
        };
        if self.is_ancestor_or_self(target, id) {
            let name = self.components.get(target).map(|c| c.name.clone()).unwrap_or_default();
            return ExpansionPlan::new(
                vec![target],
                "cycle",
                vec![Replacement::Error(format!(
                    "Circular dependency: {name} contains a copy of itself"
                ))],
            );
        }

        let sources = self.follow_replacements(target);
        let replacements = sources
            .iter()
            .filter_map(|source| self.copy_replacement(*source, prop.as_deref()))
            .collect();
        let mut targets = vec![target];
        targets.extend(sources);
        ExpansionPlan::new(targets, prop.unwrap_or_default(), replacements)
    }

    fn plan_collect(&mut self, id: ComponentId) -> ExpansionPlan {
        let Some((reference, prop, scope)) = self.composite_source(id) else {
            return ExpansionPlan::new(Vec::new(), "no source", Vec::new());
        };
        let Some(target) = self.resolve_path(&reference.path, &scope) else {
            return ExpansionPlan::new(Vec::new(), format!("missing {reference}"), Vec::new());
        };
        let types: Vec<String> = self
            .components
            .get(id)
            .and_then(|c| c.literal_attribute("componentTypes"))
            .map(|text| text.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let mut members = Vec::new();
        self.active_descendants(target, id, &mut members);
        members.retain(|member| {
            self.components.get(*member).is_some_and(|c| {
                types.is_empty() || types.iter().any(|t| t.eq_ignore_ascii_case(c.component_type()))
            })
        });

        let replacements = members
            .iter()
            .filter_map(|member| self.copy_replacement(*member, prop.as_deref()))
            .collect();
        ExpansionPlan::new(members, prop.unwrap_or_default(), replacements)
    }

    fn plan_select(&mut self, id: ComponentId) -> ExpansionPlan {
        match self.read_var(id, "selectedValue") {
            Ok(value) => {
                let text = value.to_text();
                ExpansionPlan::new(Vec::new(), text.clone(), vec![Replacement::Number(text)])
            }
            Err(error) => ExpansionPlan::new(
                Vec::new(),
                error.to_string(),
                vec![Replacement::Error(error.to_string())],
            ),
        }
    }

    fn plan_editor(&mut self, id: ComponentId) -> ExpansionPlan {
        let show = self
            .read_var(id, "showResults")
            .ok()
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if !show {
            return ExpansionPlan::new(Vec::new(), "", Vec::new());
        }
        match self.read_var(id, "value") {
            Ok(value) => {
                let text = value.to_text();
                ExpansionPlan::new(Vec::new(), format!("results:{text}"), vec![Replacement::Markup(text)])
            }
            Err(error) => ExpansionPlan::new(
                Vec::new(),
                error.to_string(),
                vec![Replacement::Error(error.to_string())],
            ),
        }
    }

    /// How `source` appears in a copy: a shadow of `prop` or of its value,
    /// or a duplicate of the whole subtree.
    fn copy_replacement(&mut self, source: ComponentId, prop: Option<&str>) -> Option<Replacement> {
        let instance = self.components.get(source)?;
        match prop {
            Some(prop) => match instance.definition.state_var(prop) {
                Some(var) => Some(Replacement::Shadow(Shadow {
                    component: source,
                    var: var.name,
                })),
                None => {
                    let message = format!("{} has no state variable {prop}", instance.name);
                    let component = instance.name.clone();
                    self.push_diagnostic(Diagnostic::warning(message, Some(&component)));
                    None
                }
            },
            None if instance.definition.copy_mode == CopyMode::Shadow => {
                instance.primary().map(|var| {
                    Replacement::Shadow(Shadow {
                        component: source,
                        var,
                    })
                })
            }
            None => Some(Replacement::Duplicate(source)),
        }
    }

    #[instrument(skip(self, plan))]
    fn expand(&mut self, id: ComponentId, plan: ExpansionPlan) {
        if let Some(old) = self.expansions.remove(&id) {
            for replacement in old.replacements {
                self.destroy(replacement);
            }
        }
        let Some(instance) = self.components.get(id) else {
            return;
        };
        let name = instance.name.clone();
        let replacing = instance.is_replacing();
        let scope = if replacing {
            instance.scope.clone()
        } else {
            instance.child_scope.clone()
        };
        let assign_names: Vec<String> = instance
            .literal_attribute("assignNames")
            .map(|text| text.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let overrides: Vec<Attribute> = instance
            .attributes
            .iter()
            .filter(|attr| {
                !COMPOSITE_ATTRIBUTES
                    .iter()
                    .any(|reserved| reserved.eq_ignore_ascii_case(&attr.name))
            })
            .cloned()
            .collect();
        let mut naming = Naming {
            prefix: instance.local_name().to_string(),
            counter: 0,
        };
        if !replacing {
            // owned results are renamed from scratch on every rebuild
            self.name_generators.remove(&scope);
        }

        let signature = plan.signature;
        let mut replacements = Vec::new();
        for (index, replacement) in plan.replacements.into_iter().enumerate() {
            let requested = assign_names.get(index).cloned();
            match replacement {
                Replacement::Duplicate(source) => {
                    let source_scope = self
                        .components
                        .get(source)
                        .map(|c| c.scope.clone())
                        .unwrap_or_default();
                    let local = requested.unwrap_or_else(|| naming.next());
                    replacements.extend(self.duplicate(
                        source,
                        id,
                        &scope,
                        Some(local),
                        &mut naming,
                        &source_scope,
                        &overrides,
                    ));
                }
                Replacement::Shadow(shadow) => {
                    let local = requested.unwrap_or_else(|| naming.next());
                    replacements.extend(self.build_shadow(shadow, id, &scope, &local, &overrides));
                }
                Replacement::Number(text) => {
                    let local = requested.unwrap_or_else(|| naming.next());
                    replacements.push(self.build_number(&text, id, &scope, &local));
                }
                Replacement::Markup(text) => {
                    replacements.extend(self.build_results(&text, id, &scope));
                }
                Replacement::Error(message) => {
                    replacements.push(self.expansion_error(id, &scope, &mut naming, &message));
                }
            }
        }
        debug!(component = %name, replacements = replacements.len(), "expanded");
        self.expansions.insert(
            id,
            ExpansionRecord {
                signature: signature.clone(),
                replacements,
            },
        );

        self.wire_all();
        if let Some(error) = self.find_cycle(id) {
            if let Some(old) = self.expansions.remove(&id) {
                for replacement in old.replacements {
                    self.destroy(replacement);
                }
            }
            let mut naming = Naming {
                prefix: naming.prefix,
                counter: 0,
            };
            let placeholder = self.expansion_error(id, &scope, &mut naming, &error.to_string());
            self.expansions.insert(
                id,
                ExpansionRecord {
                    signature,
                    replacements: vec![placeholder],
                },
            );
            self.wire_all();
        }
    }

    fn expansion_error(
        &mut self,
        composite: ComponentId,
        scope: &str,
        naming: &mut Naming,
        message: &str,
    ) -> ComponentId {
        let component = self.components.get(composite).map(|c| c.name.clone());
        warn!(component = ?component, reason = message, "composite replaced by error");
        self.push_diagnostic(Diagnostic::error(message, component.as_deref()));
        let local = naming.next();
        self.build_error(composite, scope, Some(&local), message)
    }

    /// First cycle reachable from the cells of `id`'s replacements.
    fn find_cycle(&mut self, id: ComponentId) -> Option<GraphError> {
        let cells: Vec<CellId> = self
            .replacements(id)
            .to_vec()
            .into_iter()
            .flat_map(|replacement| self.subtree(replacement))
            .filter_map(|component| self.components.get(component))
            .flat_map(|component| component.cells.iter().map(|(_, cell)| *cell).collect::<Vec<_>>())
            .collect();
        cells.into_iter().find_map(|cell| match self.graph.read(cell) {
            Err(error @ GraphError::CircularDependency { .. }) => Some(error),
            _ => None,
        })
    }

    /// Copy `source` and its defining children under `parent`.
    ///
    /// Descendants named in the source root's namespace get `{composite}_{n}`
    /// names; those inside a deeper namespace keep their local names there.
    #[allow(clippy::too_many_arguments)]
    fn duplicate(
        &mut self,
        source: ComponentId,
        parent: ComponentId,
        scope: &str,
        requested: Option<String>,
        naming: &mut Naming,
        source_scope: &str,
        overrides: &[Attribute],
    ) -> Option<ComponentId> {
        let src = self.components.get(source)?.clone();
        let local = match requested {
            Some(local) => local,
            None if src.scope == source_scope => naming.next(),
            None => src.local_name().to_string(),
        };
        let name = self.claim_name(scope, Some(&local), src.component_type());
        let child_scope = if src.child_scope != src.scope {
            name.clone()
        } else {
            scope.to_string()
        };

        let mut instance =
            ComponentInstance::new(name, src.definition, scope.to_string(), child_scope.clone());
        instance.attributes = src.attributes.clone();
        for attribute in overrides {
            instance.set_attribute(attribute.clone());
        }
        instance.extends = Some(source);
        instance.copy_source = src.copy_source.clone();
        instance.shadow = src.shadow;
        instance.linked = src.linked;
        instance.variant_index = src.variant_index;
        let id = self.insert_component(instance, Some(parent));

        let mut children = Vec::with_capacity(src.children.len());
        for child in &src.children {
            match child {
                Child::Text(text) => children.push(Child::Text(text.clone())),
                Child::Component(child) => {
                    if let Some(copy) =
                        self.duplicate(*child, id, &child_scope, None, naming, source_scope, &[])
                    {
                        children.push(Child::Component(copy));
                    }
                }
            }
        }
        if let Some(instance) = self.components.get_mut(id) {
            instance.children = children;
        }
        Some(id)
    }

    fn build_shadow(
        &mut self,
        shadow: Shadow,
        parent: ComponentId,
        scope: &str,
        local: &str,
        overrides: &[Attribute],
    ) -> Option<ComponentId> {
        let source = self.components.get(shadow.component)?;
        let var = source.definition.state_var(shadow.var)?;
        let definition = components::shadow_definition(var.value_type);
        let source_name = source.name.clone();

        let name = self.claim_name(scope, Some(local), definition.component_type);
        let mut instance =
            ComponentInstance::new(name, definition, scope.to_string(), scope.to_string());
        instance.attributes = overrides.to_vec();
        instance.copy_source = Some(MacroRef {
            path: source_name,
            prop: Some(shadow.var.to_string()),
        });
        instance.shadow = Some(shadow);
        instance.linked = true;
        Some(self.insert_component(instance, Some(parent)))
    }

    fn build_number(&mut self, text: &str, parent: ComponentId, scope: &str, local: &str) -> ComponentId {
        let definition = components::shadow_definition(ValueType::Number);
        let name = self.claim_name(scope, Some(local), definition.component_type);
        let mut instance =
            ComponentInstance::new(name, definition, scope.to_string(), scope.to_string());
        instance.children = vec![Child::Text(text.to_string())];
        self.insert_component(instance, Some(parent))
    }

    /// Parse and build a code editor's value as its results.
    fn build_results(&mut self, text: &str, parent: ComponentId, scope: &str) -> Vec<ComponentId> {
        let document = match doenet_parser::parse(text) {
            Ok(document) => document,
            Err(error) => {
                let mut naming = Naming {
                    prefix: "_error".into(),
                    counter: 0,
                };
                let message = format!("Invalid DoenetML: {error}");
                return vec![self.expansion_error(parent, scope, &mut naming, &message)];
            }
        };

        let children = self.build_nodes(&document.children, parent, scope, Origin::Generated);
        let mut results = Vec::new();
        for child in children {
            match child {
                Child::Component(id) => results.push(id),
                Child::Text(text) if text.trim().is_empty() => {}
                Child::Text(text) => {
                    let definition = components::shadow_definition(ValueType::String);
                    let name = self.claim_name(scope, None, definition.component_type);
                    let mut instance = ComponentInstance::new(
                        name,
                        definition,
                        scope.to_string(),
                        scope.to_string(),
                    );
                    instance.children = vec![Child::Text(text)];
                    results.push(self.insert_component(instance, Some(parent)));
                }
            }
        }
        results
    }
}
