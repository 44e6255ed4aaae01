//! Component instances.
//!
//! Instances live in an [`Arena`](crate::arena::Arena) owned by the core;
//! parents and children refer to each other by [`ComponentId`], so a
//! composite can drop a whole replacement subtree by freeing its slots.

use crate::arena::SlotId;
use crate::components::{ComponentDefinition, CompositeKind};
use crate::graph::CellId;
use doenet_parser::{Attribute, MacroRef};

pub type ComponentId = SlotId;

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Component(ComponentId),
    Text(String),
}

/// Where a component's primary value is mirrored from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shadow {
    pub component: ComponentId,
    pub var: &'static str,
}

#[derive(Debug, Clone)]
pub struct ComponentInstance {
    /// Full path, e.g. `/g/A`
    pub name: String,
    pub definition: &'static ComponentDefinition,
    pub attributes: Vec<Attribute>,
    /// Defining children, in order. Replacements of composites are kept in
    /// their expansion records instead.
    pub children: Vec<Child>,
    pub parent: Option<ComponentId>,
    /// Namespace the name was assigned in (`""` at the top level)
    pub scope: String,
    /// Namespace the children are named in
    pub child_scope: String,
    /// Component whose essential state this one shares
    pub extends: Option<ComponentId>,
    /// `copySource` of a component, or the source of a copy composite
    pub copy_source: Option<MacroRef>,
    pub shadow: Option<Shadow>,
    /// Set once `copy_source` has been resolved into `extends` or `shadow`
    pub linked: bool,
    pub cells: Vec<(&'static str, CellId)>,
    /// Essential cells this component owns, by key
    pub essentials: Vec<(String, CellId)>,
    pub variant_index: usize,
}

impl ComponentInstance {
    pub fn new(
        name: String,
        definition: &'static ComponentDefinition,
        scope: String,
        child_scope: String,
    ) -> Self {
        Self {
            name,
            definition,
            attributes: Vec::new(),
            children: Vec::new(),
            parent: None,
            scope,
            child_scope,
            extends: None,
            copy_source: None,
            shadow: None,
            linked: false,
            cells: Vec::new(),
            essentials: Vec::new(),
            variant_index: 1,
        }
    }

    pub fn component_type(&self) -> &'static str {
        self.definition.component_type
    }

    /// Name relative to the component's namespace.
    pub fn local_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn cell(&self, var: &str) -> Option<CellId> {
        self.cells
            .iter()
            .find(|(name, _)| *name == var)
            .map(|(_, cell)| *cell)
    }

    pub fn essential(&self, key: &str) -> Option<CellId> {
        self.essentials
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, cell)| *cell)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    pub fn literal_attribute(&self, name: &str) -> Option<String> {
        self.attribute(name).and_then(|attr| attr.value.as_literal())
    }

    /// Insert or replace an attribute.
    pub fn set_attribute(&mut self, attribute: Attribute) {
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.name.eq_ignore_ascii_case(&attribute.name))
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    pub fn composite(&self) -> Option<CompositeKind> {
        self.definition.composite
    }

    /// Stands in for its replacements in its parent's active children.
    pub fn is_replacing(&self) -> bool {
        self.definition.composite.is_some_and(|kind| kind.replaces())
    }

    /// The state variable this component shows as its value, if any.
    pub fn primary(&self) -> Option<&'static str> {
        self.definition.primary
    }
}

/// Join a namespace and a local name.
pub fn qualify(scope: &str, local: &str) -> String {
    format!("{scope}/{local}")
}
