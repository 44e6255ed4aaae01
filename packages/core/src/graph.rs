//! Pull-based dependency graph of value cells.
//!
//! Essential cells hold values written from outside. Derived cells are
//! computed from named input groups and memoized until one of their
//! transitive sources changes. Writes only mark dependents dirty; the work
//! happens on the next [`DependencyGraph::read`].
//!
//! Edges are tracked in both directions the same way a file-level graph
//! manager tracks imports: `dependencies` (cell -> sources) and
//! `dependents` (source -> cells that read it).

use crate::arena::{Arena, SlotId};
use crate::value::{StateValue, ValueType};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::debug;

pub type CellId = SlotId;

/// Computes a derived cell from its inputs
pub type CalculateFn = fn(&DependencyValues) -> StateValue;

/// Turns a requested value for a derived cell into requests on its inputs.
///
/// The flag is true only for the cell an action targeted directly.
/// Returning `None` rejects the request.
pub type InverseFn = fn(&DependencyValues, &StateValue, bool) -> Option<Vec<UpdateRequest>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    #[error("Cell {0:?} does not exist")]
    MissingCell(CellId),

    #[error("Cell {label} is derived and cannot be written directly")]
    NotEssential { label: String },

    #[error("Write-through from {label} exceeded depth {depth}")]
    InversionTooDeep { label: String, depth: usize },
}

/// Where one input of a derived cell comes from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Cell(CellId),
    Constant(StateValue),
}

/// Named group of inputs, in order
#[derive(Debug, Clone, PartialEq)]
pub struct InputGroup {
    pub name: &'static str,
    pub sources: Vec<InputSource>,
}

impl InputGroup {
    pub fn new(name: &'static str, sources: Vec<InputSource>) -> Self {
        Self { name, sources }
    }
}

/// Request produced by an inverse: set input `index` of group `group`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub group: &'static str,
    pub index: usize,
    pub value: StateValue,
}

impl UpdateRequest {
    pub fn new(group: &'static str, value: impl Into<StateValue>) -> Self {
        Self {
            group,
            index: 0,
            value: value.into(),
        }
    }

    pub fn at(group: &'static str, index: usize, value: impl Into<StateValue>) -> Self {
        Self {
            group,
            index,
            value: value.into(),
        }
    }
}

/// Input values handed to calculations and inverses, grouped by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyValues {
    groups: Vec<(&'static str, Vec<StateValue>)>,
}

impl DependencyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_group(&mut self, name: &'static str, values: Vec<StateValue>) {
        self.groups.push((name, values));
    }

    pub fn group(&self, name: &str) -> &[StateValue] {
        self.groups
            .iter()
            .find(|(group, _)| *group == name)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&StateValue> {
        self.group(name).first()
    }

    pub fn has(&self, name: &str) -> bool {
        !self.group(name).is_empty()
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.first(name).and_then(StateValue::as_bool).unwrap_or(default)
    }

    /// Concatenated text of every value in a group.
    pub fn text(&self, name: &str) -> String {
        self.group(name).iter().map(StateValue::to_text).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CellKind {
    Essential,
    Derived {
        calculate: CalculateFn,
        inverse: Option<InverseFn>,
    },
}

#[derive(Debug, Clone)]
pub struct Cell {
    /// Owning component
    pub component: SlotId,
    pub name: String,
    /// Human readable `component.name` used in errors
    pub label: String,
    pub value_type: ValueType,
    pub kind: CellKind,
    value: StateValue,
    dirty: bool,
    inputs: Vec<InputGroup>,
}

impl Cell {
    pub fn is_essential(&self) -> bool {
        matches!(self.kind, CellKind::Essential)
    }
}

/// Result of routing a requested value down to essential cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inversion {
    /// Essential writes, in request order
    pub writes: Vec<(CellId, StateValue)>,
    /// Every cell a request landed on, with whether it was the direct target
    pub touched: Vec<(CellId, bool)>,
}

#[derive(Default)]
pub struct DependencyGraph {
    cells: Arena<Cell>,

    /// cell -> cells it reads
    dependencies: HashMap<CellId, Vec<CellId>>,

    /// Reverse lookup: cell -> cells that read it
    dependents: HashMap<CellId, Vec<CellId>>,

    /// Cells currently being evaluated, innermost last
    active: Vec<CellId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_essential(
        &mut self,
        component: SlotId,
        name: &str,
        label: String,
        value_type: ValueType,
        value: StateValue,
    ) -> CellId {
        self.cells.insert(Cell {
            component,
            name: name.to_string(),
            label,
            value_type,
            kind: CellKind::Essential,
            value,
            dirty: false,
            inputs: Vec::new(),
        })
    }

    pub fn add_derived(
        &mut self,
        component: SlotId,
        name: &str,
        label: String,
        value_type: ValueType,
        calculate: CalculateFn,
        inverse: Option<InverseFn>,
    ) -> CellId {
        self.cells.insert(Cell {
            component,
            name: name.to_string(),
            label,
            value_type,
            kind: CellKind::Derived { calculate, inverse },
            value: StateValue::Undefined,
            dirty: true,
            inputs: Vec::new(),
        })
    }

    /// Replace the inputs of a derived cell.
    ///
    /// The cell and everything downstream of it become dirty.
    pub fn declare_dependency(&mut self, cell: CellId, inputs: Vec<InputGroup>) -> Result<(), GraphError> {
        let targets: Vec<CellId> = inputs
            .iter()
            .flat_map(|group| group.sources.iter())
            .filter_map(|source| match source {
                InputSource::Cell(id) => Some(*id),
                InputSource::Constant(_) => None,
            })
            .collect();

        let entry = self.cells.get_mut(cell).ok_or(GraphError::MissingCell(cell))?;
        if entry.is_essential() {
            return Err(GraphError::NotEssential {
                label: entry.label.clone(),
            });
        }
        if entry.inputs == inputs {
            return Ok(());
        }
        entry.inputs = inputs;
        entry.dirty = true;

        self.set_dependencies(cell, targets);
        self.invalidate(cell);
        Ok(())
    }

    /// Swap the calculation of a derived cell, e.g. when it starts
    /// mirroring another component.
    pub fn set_rule(
        &mut self,
        cell: CellId,
        calculate: CalculateFn,
        inverse: Option<InverseFn>,
    ) -> Result<(), GraphError> {
        let entry = self.cells.get_mut(cell).ok_or(GraphError::MissingCell(cell))?;
        if entry.is_essential() {
            return Err(GraphError::NotEssential {
                label: entry.label.clone(),
            });
        }
        entry.kind = CellKind::Derived { calculate, inverse };
        entry.dirty = true;
        self.invalidate(cell);
        Ok(())
    }

    fn set_dependencies(&mut self, source: CellId, targets: Vec<CellId>) {
        if let Some(old_targets) = self.dependencies.get(&source) {
            for old_target in old_targets {
                if let Some(deps) = self.dependents.get_mut(old_target) {
                    deps.retain(|c| *c != source);
                }
            }
        }

        for target in &targets {
            let deps = self.dependents.entry(*target).or_default();
            if !deps.contains(&source) {
                deps.push(source);
            }
        }

        self.dependencies.insert(source, targets);
    }

    pub fn remove_cell(&mut self, cell: CellId) {
        self.invalidate(cell);
        self.set_dependencies(cell, Vec::new());
        self.dependencies.remove(&cell);
        self.dependents.remove(&cell);
        self.cells.remove(cell);
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.cells.contains(cell)
    }

    pub fn cell(&self, cell: CellId) -> Option<&Cell> {
        self.cells.get(cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_dirty(&self, cell: CellId) -> bool {
        self.cells.get(cell).map(|c| c.dirty).unwrap_or(false)
    }

    pub fn get_dependents(&self, cell: CellId) -> &[CellId] {
        self.dependents.get(&cell).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Mark every transitive dependent of `cell` dirty.
    ///
    /// A dirty cell's dependents are always dirty already, so the walk
    /// stops at cells that are.
    pub fn invalidate(&mut self, cell: CellId) {
        let mut queue: VecDeque<CellId> = self.get_dependents(cell).iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            let Some(entry) = self.cells.get_mut(current) else {
                continue;
            };
            if entry.dirty {
                continue;
            }
            entry.dirty = true;
            queue.extend(self.get_dependents(current).iter().copied());
        }
    }

    /// Store a value in an essential cell. Returns the previous value.
    pub fn write(&mut self, cell: CellId, value: StateValue) -> Result<StateValue, GraphError> {
        let entry = self.cells.get_mut(cell).ok_or(GraphError::MissingCell(cell))?;
        if !entry.is_essential() {
            return Err(GraphError::NotEssential {
                label: entry.label.clone(),
            });
        }
        let previous = std::mem::replace(&mut entry.value, value);
        if previous != entry.value {
            self.invalidate(cell);
        }
        Ok(previous)
    }

    /// Current value, evaluating dirty sources depth-first.
    pub fn read(&mut self, cell: CellId) -> Result<StateValue, GraphError> {
        let entry = self.cells.get(cell).ok_or(GraphError::MissingCell(cell))?;
        if !entry.dirty {
            return Ok(entry.value.clone());
        }

        if let Some(position) = self.active.iter().position(|c| *c == cell) {
            let mut path: Vec<String> = self.active[position..]
                .iter()
                .filter_map(|c| self.cells.get(*c).map(|e| e.label.clone()))
                .collect();
            path.push(entry.label.clone());
            return Err(GraphError::CircularDependency {
                path: path.join(" -> "),
            });
        }

        self.active.push(cell);
        let result = self.evaluate(cell);
        self.active.pop();
        result
    }

    fn evaluate(&mut self, cell: CellId) -> Result<StateValue, GraphError> {
        let (calculate, value_type) = match self.cells.get(cell).map(|c| (c.kind, c.value_type)) {
            Some((CellKind::Derived { calculate, .. }, value_type)) => (calculate, value_type),
            Some((CellKind::Essential, _)) => {
                return self
                    .cells
                    .get(cell)
                    .map(|c| c.value.clone())
                    .ok_or(GraphError::MissingCell(cell))
            }
            None => return Err(GraphError::MissingCell(cell)),
        };

        let values = self.input_values(cell)?;
        let value = match calculate(&values) {
            StateValue::Undefined => StateValue::Undefined,
            computed if computed.value_type() == Some(value_type) => computed,
            computed => computed.coerce(value_type),
        };

        if let Some(entry) = self.cells.get_mut(cell) {
            entry.value = value.clone();
            entry.dirty = false;
        }
        Ok(value)
    }

    /// Read every input of a derived cell.
    ///
    /// Inputs pointing at removed cells read as undefined.
    pub fn input_values(&mut self, cell: CellId) -> Result<DependencyValues, GraphError> {
        let inputs = self
            .cells
            .get(cell)
            .map(|c| c.inputs.clone())
            .ok_or(GraphError::MissingCell(cell))?;

        let mut values = DependencyValues::new();
        for group in inputs {
            let mut group_values = Vec::with_capacity(group.sources.len());
            for source in group.sources {
                let value = match source {
                    InputSource::Constant(value) => value,
                    InputSource::Cell(source) if self.cells.contains(source) => self.read(source)?,
                    InputSource::Cell(_) => StateValue::Undefined,
                };
                group_values.push(value);
            }
            values.push_group(group.name, group_values);
        }
        Ok(values)
    }

    /// Route a requested value for `cell` down to essential cells.
    ///
    /// Nothing is written; the caller applies [`Inversion::writes`].
    pub fn request_update(
        &mut self,
        cell: CellId,
        value: StateValue,
        is_direct: bool,
        max_depth: usize,
    ) -> Result<Inversion, GraphError> {
        let mut inversion = Inversion::default();
        self.request_update_inner(cell, value, is_direct, 0, max_depth, &mut inversion)?;
        Ok(inversion)
    }

    fn request_update_inner(
        &mut self,
        cell: CellId,
        value: StateValue,
        is_direct: bool,
        depth: usize,
        max_depth: usize,
        inversion: &mut Inversion,
    ) -> Result<(), GraphError> {
        let entry = self.cells.get(cell).ok_or(GraphError::MissingCell(cell))?;
        if depth > max_depth {
            return Err(GraphError::InversionTooDeep {
                label: entry.label.clone(),
                depth: max_depth,
            });
        }
        inversion.touched.push((cell, is_direct));

        let (inverse, value_type, label) = match entry.kind {
            CellKind::Essential => {
                let value = value.coerce(entry.value_type);
                inversion.writes.push((cell, value));
                return Ok(());
            }
            CellKind::Derived { inverse, .. } => (inverse, entry.value_type, entry.label.clone()),
        };

        let Some(inverse) = inverse else {
            debug!(cell = %label, "request rejected: no inverse");
            return Ok(());
        };

        let values = self.input_values(cell)?;
        let requested = value.coerce(value_type);
        let Some(requests) = inverse(&values, &requested, is_direct) else {
            debug!(cell = %label, "request rejected by inverse");
            return Ok(());
        };

        let inputs = self
            .cells
            .get(cell)
            .map(|c| c.inputs.clone())
            .unwrap_or_default();
        for request in requests {
            let source = inputs
                .iter()
                .find(|group| group.name == request.group)
                .and_then(|group| group.sources.get(request.index));
            match source {
                Some(InputSource::Cell(source)) if self.cells.contains(*source) => {
                    self.request_update_inner(
                        *source,
                        request.value,
                        false,
                        depth + 1,
                        max_depth,
                        inversion,
                    )?;
                }
                _ => debug!(cell = %label, group = request.group, "request has no writable source"),
            }
        }
        Ok(())
    }
}
