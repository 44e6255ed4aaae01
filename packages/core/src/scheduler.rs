//! Logical-clock scheduling of debounced actions.
//!
//! Each component holds at most one pending action: a newer edit replaces
//! the pending commit, and a commit that runs early cancels it. Time only
//! moves through [`Scheduler::advance`], so tests and hosts control it.

use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAction {
    pub component: String,
    pub action: String,
    pub due: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: u64,
    pending: BTreeMap<String, ScheduledAction>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedule `action` on `component` after `delay` ms, replacing any pending one.
    pub fn schedule(&mut self, component: &str, action: &str, delay: u64) {
        let due = self.now + delay;
        debug!(component, action, due, "scheduled");
        self.pending.insert(
            component.to_string(),
            ScheduledAction {
                component: component.to_string(),
                action: action.to_string(),
                due,
            },
        );
    }

    pub fn cancel(&mut self, component: &str) -> Option<ScheduledAction> {
        self.pending.remove(component)
    }

    pub fn pending(&self, component: &str) -> Option<&ScheduledAction> {
        self.pending.get(component)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move the clock forward and take every action that came due, earliest first.
    pub fn advance(&mut self, ms: u64) -> Vec<ScheduledAction> {
        self.now += ms;
        self.take_due()
    }

    /// Take every pending action regardless of its deadline.
    pub fn flush(&mut self) -> Vec<ScheduledAction> {
        if let Some(latest) = self.pending.values().map(|a| a.due).max() {
            self.now = self.now.max(latest);
        }
        self.take_due()
    }

    fn take_due(&mut self) -> Vec<ScheduledAction> {
        let now = self.now;
        let due_keys: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, action)| action.due <= now)
            .map(|(key, _)| key.clone())
            .collect();
        let mut due: Vec<ScheduledAction> = due_keys
            .iter()
            .filter_map(|key| self.pending.remove(key))
            .collect();
        due.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.component.cmp(&b.component)));
        due
    }
}
