//! Reactive document core for DoenetML.
//!
//! A [`DoenetCore`] parses a document into component instances, wires their
//! state variables into a pull-based [`DependencyGraph`], expands
//! composites (copies, collects, sequences, code editor results) until the
//! tree is stable, and routes actions back through inverse definitions to
//! essential state.

pub mod arena;
pub mod changes;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod instance;
pub mod math;
pub mod persistence;
pub mod scheduler;
pub mod snapshot;
pub mod undo_stack;
pub mod value;
pub mod variants;

mod actions;
mod builder;
mod composite;
mod references;
mod wiring;

#[cfg(test)]
mod tests_equilibrium;

#[cfg(test)]
mod tests_code_editor;

#[cfg(test)]
mod tests_composites;

#[cfg(test)]
mod tests_number_input;

#[cfg(test)]
mod tests_variants;

pub use engine::{ActionQueue, CoreObserver, CoreOptions, DoenetCore, QueuedAction};
pub use changes::Command;
pub use config::{CoreConfig, SimplifyPolicy};
pub use error::{CoreError, CoreResult, Diagnostic, DiagnosticLevel};
pub use graph::{DependencyGraph, GraphError};
pub use math::MathExpr;
pub use persistence::PersistedState;
pub use snapshot::{render_tree, snapshot, ActiveChild, ComponentSnapshot, RenderChild, RenderNode};
pub use value::{StateValue, ValueType};
pub use variants::{VariantRecord, VariantRequest};
