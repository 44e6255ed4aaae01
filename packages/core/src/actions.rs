//! Action dispatch.
//!
//! An action handler only proposes values for its own component's state
//! variables. Each proposal is routed through the graph's inverses down to
//! essential cells, which are then written in one batch. Actions that
//! arrive while another is running (from observers or from the scheduler)
//! are queued and run afterwards in order.

use crate::changes::{flags_for, Command};
use crate::components::{ActionContext, ActionGate};
use crate::engine::DoenetCore;
use crate::error::{CoreError, CoreResult};
use crate::graph::{CellId, Inversion};
use crate::scheduler::ScheduledAction;
use crate::undo_stack::EssentialWrite;
use crate::value::StateValue;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

impl DoenetCore {
    /// Run `action` on `component`, then everything it queued.
    #[instrument(skip(self, args))]
    pub fn dispatch(
        &mut self,
        component: &str,
        action: &str,
        args: serde_json::Value,
    ) -> CoreResult<()> {
        self.queue.push(component, action, args);
        if self.dispatching {
            return Ok(());
        }
        self.run_queued()
    }

    pub(crate) fn run_queued(&mut self) -> CoreResult<()> {
        self.dispatching = true;
        let mut result = Ok(());
        while let Some(queued) = self.queue.pop() {
            if let Err(error) = self.run_action(&queued.component, &queued.action, &queued.args) {
                warn!(%error, component = %queued.component, action = %queued.action, "action failed");
                self.queue.clear();
                result = Err(error);
                break;
            }
        }
        self.dispatching = false;
        result
    }

    fn run_action(
        &mut self,
        component: &str,
        action: &str,
        args: &serde_json::Value,
    ) -> CoreResult<()> {
        let Some(id) = self.lookup(component) else {
            debug!(component, action, "ignored: no such component");
            return Ok(());
        };
        let Some(instance) = self.components.get(id) else {
            return Ok(());
        };
        let name = instance.name.clone();
        let Some(definition) = instance.definition.action(action) else {
            debug!(component = %name, action, "ignored: unknown action");
            return Ok(());
        };

        let open = match definition.gate {
            ActionGate::Always => true,
            ActionGate::WhenTrue(var) => self.read_var(id, var)?.as_bool().unwrap_or(false),
            ActionGate::WhenFalse(var) => !self.read_var(id, var)?.as_bool().unwrap_or(false),
        };
        if !open {
            debug!(component = %name, action, "ignored: gate closed");
            return Ok(());
        }

        let mut state = HashMap::new();
        for var in definition.reads {
            state.insert(*var, self.read_var(id, var)?);
        }
        let context = ActionContext { state: &state, args };
        let writes = (definition.handler)(&context).map_err(|message| {
            CoreError::InvalidArguments {
                action: action.to_string(),
                message,
            }
        })?;

        if definition.undoable {
            self.undo.begin_batch(format!("{name} {action}"));
        }
        let requested: Vec<(CellId, StateValue)> = writes
            .iter()
            .filter_map(|write| {
                let cell = self.components.get(id).and_then(|c| c.cell(write.var));
                if cell.is_none() {
                    warn!(component = %name, var = write.var, "action wrote an unknown variable");
                }
                cell.map(|cell| (cell, write.value.clone()))
            })
            .collect();
        let applied = self.apply_requests(requested);
        if definition.undoable {
            self.undo.end_batch();
        }
        applied?;

        if let Some(next) = definition.schedules {
            self.scheduler.schedule(&name, next, self.config.debounce_ms);
            if let Some(write) = writes.first() {
                self.commands.record(&name, Command::Immediate(write.value.to_text()));
            }
        }
        if definition.commits {
            self.scheduler.cancel(&name);
            if let Some(write) = writes.first() {
                self.commands.record(&name, Command::Commit(write.value.to_text()));
            }
        }

        info!(component = %name, action, writes = writes.len(), "action applied");
        self.settle();
        self.notify_persist();
        Ok(())
    }

    /// Route each requested value to essential cells and write them.
    ///
    /// Requests landing on a tracked variable also raise its changed flags.
    fn apply_requests(&mut self, requests: Vec<(CellId, StateValue)>) -> CoreResult<()> {
        let depth = self.config.max_inversion_depth;
        let mut inversion = Inversion::default();
        for (cell, value) in requests {
            let routed = self.graph.request_update(cell, value, true, depth)?;
            inversion.writes.extend(routed.writes);
            inversion.touched.extend(routed.touched);
        }

        let mut flags = Vec::new();
        for (cell, _) in &inversion.touched {
            let Some(entry) = self.graph.cell(*cell).filter(|c| !c.is_essential()) else {
                continue;
            };
            let Some(owner) = self.components.get(entry.component) else {
                continue;
            };
            for flag in flags_for(owner.component_type(), &entry.name) {
                if let Some(flag_cell) = owner.cell(flag) {
                    if !flags.contains(&flag_cell) {
                        flags.push(flag_cell);
                    }
                }
            }
        }
        for flag in flags {
            let routed = self.graph.request_update(flag, StateValue::Boolean(true), false, depth)?;
            inversion.writes.extend(routed.writes);
        }

        for (cell, value) in inversion.writes {
            self.write_essential(cell, value)?;
        }
        Ok(())
    }

    /// Write an essential cell, recording undo history and saved state.
    fn write_essential(&mut self, cell: CellId, value: StateValue) -> CoreResult<()> {
        let previous = self.graph.write(cell, value.clone())?;
        if previous == value {
            return Ok(());
        }
        let Some(entry) = self.graph.cell(cell) else {
            return Ok(());
        };
        let key = entry.name.clone();
        let Some(owner) = self.components.get(entry.component).map(|c| c.name.clone()) else {
            return Ok(());
        };
        debug!(component = %owner, key = %key, "essential written");
        self.saved.set(&owner, &key, value.clone());
        self.undo.record(EssentialWrite {
            component: owner,
            key,
            before: previous,
            after: value,
        });
        Ok(())
    }

    fn restore(&mut self, component: &str, key: &str, value: &StateValue) -> CoreResult<()> {
        let cell = self
            .names
            .get(component)
            .and_then(|id| self.components.get(*id))
            .and_then(|instance| instance.essential(key));
        match cell {
            Some(cell) => self.write_essential(cell, value.clone()),
            None => {
                debug!(component, key, "history entry no longer applies");
                Ok(())
            }
        }
    }

    /// Revert the last undoable action. Returns false when there is none.
    pub fn undo(&mut self) -> CoreResult<bool> {
        let Some(batch) = self.undo.undo() else {
            return Ok(false);
        };
        for (component, key, value) in batch.inverses() {
            self.restore(component, key, value)?;
        }
        info!(description = ?batch.description, "undo");
        self.settle();
        self.notify_persist();
        Ok(true)
    }

    pub fn redo(&mut self) -> CoreResult<bool> {
        let Some(batch) = self.undo.redo() else {
            return Ok(false);
        };
        for (component, key, value) in batch.forwards() {
            self.restore(component, key, value)?;
        }
        info!(description = ?batch.description, "redo");
        self.settle();
        self.notify_persist();
        Ok(true)
    }

    /// Move the logical clock and run the actions that came due.
    pub fn advance_time(&mut self, ms: u64) -> CoreResult<()> {
        let due = self.scheduler.advance(ms);
        self.run_scheduled(due)
    }

    /// Run every pending scheduled action now.
    pub fn flush_pending(&mut self) -> CoreResult<()> {
        let due = self.scheduler.flush();
        self.run_scheduled(due)
    }

    fn run_scheduled(&mut self, due: Vec<ScheduledAction>) -> CoreResult<()> {
        for action in due {
            self.queue
                .push(&action.component, &action.action, serde_json::json!({}));
        }
        if self.dispatching || self.queue.is_empty() {
            return Ok(());
        }
        self.run_queued()
    }
}
