//! # Undo/Redo Stack
//!
//! History of committed essential-cell writes.
//!
//! - Each action's writes are grouped into one batch with their previous values
//! - Undo restores the previous values and moves the batch to the redo stack
//! - Redo reapplies the new values
//! - A new batch clears the redo stack
//!
//! Writes are keyed by component name and essential key rather than cell
//! id, so history survives composites rebuilding the cells.

use crate::value::StateValue;

/// One essential cell changed by an action
#[derive(Debug, Clone, PartialEq)]
pub struct EssentialWrite {
    pub component: String,
    pub key: String,
    pub before: StateValue,
    pub after: StateValue,
}

/// Writes undone and redone together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub writes: Vec<EssentialWrite>,
    pub description: Option<String>,
}

impl WriteBatch {
    /// `(component, key, value)` triples that revert the batch, last write first.
    pub fn inverses(&self) -> impl Iterator<Item = (&str, &str, &StateValue)> {
        self.writes
            .iter()
            .rev()
            .map(|w| (w.component.as_str(), w.key.as_str(), &w.before))
    }

    pub fn forwards(&self) -> impl Iterator<Item = (&str, &str, &StateValue)> {
        self.writes
            .iter()
            .map(|w| (w.component.as_str(), w.key.as_str(), &w.after))
    }
}

#[derive(Debug)]
pub struct UndoStack {
    undo_stack: Vec<WriteBatch>,
    redo_stack: Vec<WriteBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    current_batch: Option<WriteBatch>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    pub fn begin_batch(&mut self, description: impl Into<String>) {
        self.current_batch = Some(WriteBatch {
            writes: Vec::new(),
            description: Some(description.into()),
        });
    }

    /// Record a write into the open batch. Without one the write is not undoable.
    pub fn record(&mut self, write: EssentialWrite) {
        if let Some(batch) = &mut self.current_batch {
            // a cell written twice in a batch keeps its first `before`
            if let Some(existing) = batch
                .writes
                .iter_mut()
                .find(|w| w.component == write.component && w.key == write.key)
            {
                existing.after = write.after;
            } else {
                batch.writes.push(write);
            }
        }
    }

    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.writes.is_empty() {
                self.push_batch(batch);
            }
        }
    }

    fn push_batch(&mut self, batch: WriteBatch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Pop the most recent batch for the caller to revert.
    pub fn undo(&mut self) -> Option<WriteBatch> {
        let batch = self.undo_stack.pop()?;
        self.redo_stack.push(batch.clone());
        Some(batch)
    }

    pub fn redo(&mut self) -> Option<WriteBatch> {
        let batch = self.redo_stack.pop()?;
        self.undo_stack.push(batch.clone());
        Some(batch)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
