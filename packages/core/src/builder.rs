//! Building component instances from parsed markup.

use crate::components::{self, CompositeKind};
use crate::engine::DoenetCore;
use crate::error::Diagnostic;
use crate::instance::{qualify, Child, ComponentId, ComponentInstance};
use crate::value::parse_bool;
use crate::variants::{derived_index, element_variant_count};
use doenet_parser::{
    Attribute, AttributeValue, Element, MacroNode, MacroRef, ParsedDocument, ParsedNode, Span,
};
use tracing::{debug, warn};

/// Where parsed markup came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// The document source; spans index the static variant plan
    Document,
    /// Markup parsed at runtime, such as a code editor's value
    Generated,
}

/// Reference held by a `copySource`/`source` attribute.
pub(crate) fn reference_from_attribute(attribute: &Attribute) -> Option<MacroRef> {
    if let Some(reference) = attribute.value.macros().next() {
        return Some(reference.clone());
    }
    let literal = attribute.value.as_literal()?;
    let literal = literal.trim();
    if literal.is_empty() {
        return None;
    }
    Some(MacroRef::from_head(literal))
}

pub(crate) fn literal_attribute(name: &str, value: impl Into<String>) -> Attribute {
    Attribute {
        name: name.to_string(),
        value: AttributeValue::literal(value),
        span: Span::default(),
    }
}

impl DoenetCore {
    pub(crate) fn build_document(&mut self, document: &ParsedDocument) -> ComponentId {
        let definition = components::document();
        let name = self.claim_name("", None, definition.component_type);
        let instance = ComponentInstance::new(name, definition, String::new(), String::new());
        let root = self.insert_component(instance, None);
        let children = self.build_nodes(&document.children, root, "", Origin::Document);
        if let Some(root_instance) = self.components.get_mut(root) {
            root_instance.children = children;
        }
        root
    }

    pub(crate) fn build_nodes(
        &mut self,
        nodes: &[ParsedNode],
        parent: ComponentId,
        scope: &str,
        origin: Origin,
    ) -> Vec<Child> {
        nodes
            .iter()
            .map(|node| match node {
                ParsedNode::Text(text) => Child::Text(text.value.clone()),
                ParsedNode::Element(element) => {
                    Child::Component(self.build_element(element, parent, scope, origin))
                }
                ParsedNode::Macro(node) => Child::Component(self.build_macro(node, parent, scope)),
            })
            .collect()
    }

    fn build_element(
        &mut self,
        element: &Element,
        parent: ComponentId,
        scope: &str,
        origin: Origin,
    ) -> ComponentId {
        let Some(definition) = components::lookup(&element.tag) else {
            let message = format!("Invalid component type: {}", element.tag);
            warn!(tag = %element.tag, "unknown component type");
            self.push_diagnostic(Diagnostic::warning(message.clone(), None));
            return self.build_error(parent, scope, None, &message);
        };

        let requested = element.literal_attribute("name");
        let name = self.claim_name(scope, requested.as_deref(), definition.component_type);
        let namespaced = definition.new_namespace
            || element
                .literal_attribute("newNamespace")
                .and_then(|value| parse_bool(&value))
                .unwrap_or(false);
        let child_scope = if namespaced { name.clone() } else { scope.to_string() };

        let mut instance =
            ComponentInstance::new(name.clone(), definition, scope.to_string(), child_scope.clone());
        instance.attributes = element.attributes.clone();
        instance.copy_source = match definition.composite {
            Some(CompositeKind::Copy | CompositeKind::Collect) => {
                element.attribute("source").and_then(reference_from_attribute)
            }
            _ => element.attribute("copySource").and_then(reference_from_attribute),
        };
        instance.variant_index = match origin {
            Origin::Document => self
                .variant_indices
                .get(&element.span.start)
                .copied()
                .unwrap_or(1),
            Origin::Generated => element_variant_count(definition, element)
                .map(|count| derived_index(self.variant.index, &name, count))
                .unwrap_or(1),
        };

        let id = self.insert_component(instance, Some(parent));
        let children = self.build_nodes(&element.children, id, &child_scope, origin);
        if let Some(instance) = self.components.get_mut(id) {
            instance.children = children;
        }
        id
    }

    /// `$ref` becomes an unnamed copy; its `name` names the replacement.
    fn build_macro(&mut self, node: &MacroNode, parent: ComponentId, scope: &str) -> ComponentId {
        let definition = components::copy();
        let name = self.claim_name(scope, None, definition.component_type);
        let mut instance = ComponentInstance::new(name, definition, scope.to_string(), scope.to_string());
        instance.attributes = node
            .attributes
            .iter()
            .map(|attribute| {
                if attribute.name.eq_ignore_ascii_case("name") {
                    Attribute {
                        name: "assignNames".into(),
                        ..attribute.clone()
                    }
                } else {
                    attribute.clone()
                }
            })
            .collect();
        instance.copy_source = Some(node.reference.clone());
        self.insert_component(instance, Some(parent))
    }

    /// `_error` placeholder carrying `message`.
    pub(crate) fn build_error(
        &mut self,
        parent: ComponentId,
        scope: &str,
        requested: Option<&str>,
        message: &str,
    ) -> ComponentId {
        let definition = components::error();
        let name = self.claim_name(scope, requested, "error");
        let mut instance =
            ComponentInstance::new(name, definition, scope.to_string(), scope.to_string());
        instance.attributes = vec![literal_attribute("message", message)];
        self.insert_component(instance, Some(parent))
    }

    pub(crate) fn insert_component(
        &mut self,
        mut instance: ComponentInstance,
        parent: Option<ComponentId>,
    ) -> ComponentId {
        instance.parent = parent;
        let name = instance.name.clone();
        let id = self.components.insert(instance);
        self.names.insert(name, id);
        id
    }

    /// Full name for a new component in `scope`.
    ///
    /// A requested name that is already taken is reported and replaced by
    /// a generated one.
    pub(crate) fn claim_name(
        &mut self,
        scope: &str,
        requested: Option<&str>,
        component_type: &str,
    ) -> String {
        if let Some(local) = requested.map(str::trim).filter(|local| !local.is_empty()) {
            let name = qualify(scope, local);
            if !self.names.contains_key(&name) {
                return name;
            }
            self.push_diagnostic(Diagnostic::error(
                format!("Duplicate component name: {local}"),
                Some(&name),
            ));
        }
        let ty = component_type.to_ascii_lowercase();
        loop {
            let local = self
                .name_generators
                .entry(scope.to_string())
                .or_default()
                .next_name(&ty);
            let name = qualify(scope, &local);
            if !self.names.contains_key(&name) {
                return name;
            }
        }
    }

    /// Free a component, its descendants, replacements and cells.
    pub(crate) fn destroy(&mut self, id: ComponentId) {
        let Some(instance) = self.components.remove(id) else {
            return;
        };
        for child in &instance.children {
            if let Child::Component(child) = child {
                self.destroy(*child);
            }
        }
        if let Some(record) = self.expansions.remove(&id) {
            for replacement in record.replacements {
                self.destroy(replacement);
            }
        }
        for (_, cell) in &instance.cells {
            self.graph.remove_cell(*cell);
        }
        for (_, cell) in &instance.essentials {
            self.graph.remove_cell(*cell);
        }
        if self.names.get(&instance.name) == Some(&id) {
            self.names.remove(&instance.name);
        }
        self.scheduler.cancel(&instance.name);
        self.saved.remove_component(&instance.name);
        self.commands.forget(&instance.name);
        debug!(component = %instance.name, "destroyed");
    }
}
