//! Component type registry.
//!
//! Each DoenetML tag maps to one [`ComponentDefinition`]: its state
//! variables (with the dependency instructions that wire them), its actions,
//! and how it behaves when copied or expanded. Lookup is case-insensitive.

mod common;
mod composites;
mod containers;
mod equilibrium_line;
mod inputs;
mod primitives;

pub use common::{shadow_inverse, shadow_value};

use crate::config::SimplifyPolicy;
use crate::graph::{CalculateFn, InverseFn};
use crate::value::{StateValue, ValueType};
use doenet_parser::Element;
use std::collections::HashMap;

/// Compile-time value used for defaults
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Text(&'static str),
    Number(f64),
    Integer(i64),
    /// The configured default simplification policy
    DefaultSimplify,
}

impl ConstValue {
    pub fn to_state_value(&self, default_simplify: SimplifyPolicy) -> StateValue {
        match self {
            ConstValue::Bool(b) => StateValue::Boolean(*b),
            ConstValue::Text(s) => StateValue::String(s.to_string()),
            ConstValue::Number(n) => StateValue::Number(*n),
            ConstValue::Integer(i) => StateValue::Integer(*i),
            ConstValue::DefaultSimplify => StateValue::String(default_simplify.as_str().to_string()),
        }
    }
}

/// Initial value of an essential cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Initial {
    Value(ConstValue),
    /// Literal attribute value when present, otherwise the fallback
    Attribute {
        name: &'static str,
        value_type: ValueType,
        fallback: ConstValue,
    },
}

/// How one input group of a state variable is wired
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DependencyInstruction {
    /// Externally writable cell, shared by every copy of the component
    Essential { key: &'static str, initial: Initial },
    /// Another state variable of the same component
    StateVar(&'static str),
    /// Attribute value. Literal text is stored in an essential cell;
    /// macros resolve to the referenced cells. An absent attribute yields
    /// the default, or an empty group without one.
    Attribute {
        name: &'static str,
        value_type: ValueType,
        default: Option<ConstValue>,
    },
    /// Active children: text pieces and each child component's value
    Children,
    /// The variant index assigned to this component
    VariantIndex,
}

#[derive(Debug, Clone, Copy)]
pub struct StateVarDefinition {
    pub name: &'static str,
    pub value_type: ValueType,
    /// Sent to the renderer
    pub for_renderer: bool,
    /// Listed in snapshots
    pub public: bool,
    pub dependencies: &'static [(&'static str, DependencyInstruction)],
    pub calculate: CalculateFn,
    pub inverse: Option<InverseFn>,
}

/// Condition under which an action is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionGate {
    Always,
    WhenTrue(&'static str),
    WhenFalse(&'static str),
}

/// State and arguments visible to an action handler
pub struct ActionContext<'a> {
    pub state: &'a HashMap<&'static str, StateValue>,
    pub args: &'a serde_json::Value,
}

impl ActionContext<'_> {
    pub fn state(&self, name: &str) -> StateValue {
        self.state.get(name).cloned().unwrap_or_default()
    }

    pub fn arg_bool(&self, name: &str) -> Result<bool, String> {
        self.args
            .get(name)
            .and_then(serde_json::Value::as_bool)
            .ok_or_else(|| format!("expected boolean argument '{name}'"))
    }

    pub fn arg_str(&self, name: &str) -> Result<String, String> {
        self.args
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| format!("expected string argument '{name}'"))
    }
}

/// A requested value for one state variable of the action's component
#[derive(Debug, Clone, PartialEq)]
pub struct ActionWrite {
    pub var: &'static str,
    pub value: StateValue,
}

impl ActionWrite {
    pub fn new(var: &'static str, value: impl Into<StateValue>) -> Self {
        Self {
            var,
            value: value.into(),
        }
    }
}

pub type ActionHandler = fn(&ActionContext) -> Result<Vec<ActionWrite>, String>;

#[derive(Debug, Clone, Copy)]
pub struct ActionDefinition {
    pub name: &'static str,
    pub gate: ActionGate,
    /// State variables read into the context before the handler runs
    pub reads: &'static [&'static str],
    pub handler: ActionHandler,
    /// Action scheduled after the debounce delay
    pub schedules: Option<&'static str>,
    /// Cancels a pending scheduled action on the same component
    pub commits: bool,
    pub undoable: bool,
}

/// What a composite expands into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    /// Copies a referenced component or one of its state variables
    Copy,
    /// Copies descendants of a source that match given types
    Collect,
    /// Picks one number according to its variant
    SelectFromSequence,
    /// Parses the committed value and owns the result as children
    EditorResults,
}

impl CompositeKind {
    /// Replacing composites stand in for their replacements in the
    /// parent's active children; owning ones keep results as children.
    pub fn replaces(&self) -> bool {
        !matches!(self, CompositeKind::EditorResults)
    }
}

/// How a `$name` copy of the component is realized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// A primitive whose value shadows the primary state variable
    Shadow,
    /// A duplicate of the whole subtree sharing essential state
    Duplicate,
}

pub struct ComponentDefinition {
    pub component_type: &'static str,
    pub state_vars: &'static [StateVarDefinition],
    /// State variable used for copies, parents and `copySource`
    pub primary: Option<&'static str>,
    pub actions: &'static [ActionDefinition],
    pub composite: Option<CompositeKind>,
    pub copy_mode: CopyMode,
    /// Number of variants the component contributes, from its literal attributes
    pub variant_count: Option<fn(&Element) -> usize>,
    /// Descendant variant spaces are not counted toward the document's
    pub ignore_variants_from_children: bool,
    /// Children are always named inside this component's namespace
    pub new_namespace: bool,
}

impl ComponentDefinition {
    pub fn state_var(&self, name: &str) -> Option<&'static StateVarDefinition> {
        self.state_vars
            .iter()
            .find(|var| var.name.eq_ignore_ascii_case(name))
    }

    pub fn action(&self, name: &str) -> Option<&'static ActionDefinition> {
        self.actions.iter().find(|action| action.name == name)
    }

    /// State variable a parent reads from this component: the primary
    /// variable, or `text` for containers.
    pub fn value_for_parent(&self) -> Option<&'static str> {
        self.primary
            .or_else(|| self.state_var("text").map(|var| var.name))
    }
}

impl std::fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("component_type", &self.component_type)
            .finish()
    }
}

static REGISTRY: &[&ComponentDefinition] = &[
    &containers::DOCUMENT,
    &containers::SECTION,
    &containers::P,
    &containers::GRAPH,
    &primitives::TEXT,
    &primitives::BOOLEAN,
    &primitives::NUMBER,
    &primitives::MATH,
    &inputs::BOOLEAN_INPUT,
    &inputs::TEXT_INPUT,
    &inputs::NUMBER_INPUT,
    &inputs::CODE_EDITOR,
    &equilibrium_line::EQUILIBRIUM_LINE,
    &composites::SELECT_FROM_SEQUENCE,
    &composites::COPY,
    &composites::COLLECT,
    &composites::ERROR,
];

/// Look up a component type, ignoring case.
pub fn lookup(component_type: &str) -> Option<&'static ComponentDefinition> {
    REGISTRY
        .iter()
        .copied()
        .find(|def| def.component_type.eq_ignore_ascii_case(component_type))
}

pub fn all_definitions() -> impl Iterator<Item = &'static ComponentDefinition> {
    REGISTRY.iter().copied()
}

pub fn document() -> &'static ComponentDefinition {
    &containers::DOCUMENT
}

pub fn error() -> &'static ComponentDefinition {
    &composites::ERROR
}

pub fn copy() -> &'static ComponentDefinition {
    &composites::COPY
}

/// Primitive type used to shadow a value of `value_type`.
pub fn shadow_definition(value_type: ValueType) -> &'static ComponentDefinition {
    match value_type {
        ValueType::Boolean => &primitives::BOOLEAN,
        ValueType::Number | ValueType::Integer => &primitives::NUMBER,
        ValueType::Math => &primitives::MATH,
        ValueType::String | ValueType::List => &primitives::TEXT,
    }
}
