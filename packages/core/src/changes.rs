//! Changed flags and command logs for editable inputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flags raised when a request lands on a tracked state variable
static TRACKED: &[(&str, &str, &[&str])] = &[
    ("textInput", "value", &["valueChanged", "immediateValueChanged"]),
    ("textInput", "immediateValue", &["immediateValueChanged"]),
    ("codeEditor", "value", &["valueChanged", "immediateValueChanged"]),
    ("codeEditor", "immediateValue", &["immediateValueChanged"]),
    ("numberInput", "value", &["valueChanged", "immediateValueChanged"]),
    ("numberInput", "immediateValue", &["immediateValueChanged"]),
    ("numberInput", "lastValue", &["valueChanged", "immediateValueChanged"]),
    ("numberInput", "rawRendererValue", &["immediateValueChanged"]),
];

/// Changed flags to raise when `var` of a `component_type` receives a request.
pub fn flags_for(component_type: &str, var: &str) -> &'static [&'static str] {
    TRACKED
        .iter()
        .find(|(ty, name, _)| *ty == component_type && *name == var)
        .map(|(_, _, flags)| *flags)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Command {
    /// A keystroke-level edit
    Immediate(String),
    /// The value that became authoritative
    Commit(String),
}

/// Per-component sequence of immediate edits and commit checkpoints
#[derive(Debug, Default)]
pub struct CommandLog {
    logs: BTreeMap<String, Vec<Command>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, component: &str, command: Command) {
        self.logs.entry(component.to_string()).or_default().push(command);
    }

    pub fn entries(&self, component: &str) -> &[Command] {
        self.logs.get(component).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Last committed value, if any commit happened.
    pub fn last_commit(&self, component: &str) -> Option<&str> {
        self.entries(component).iter().rev().find_map(|command| match command {
            Command::Commit(value) => Some(value.as_str()),
            Command::Immediate(_) => None,
        })
    }

    /// Edits made since the last commit.
    pub fn pending(&self, component: &str) -> usize {
        self.entries(component)
            .iter()
            .rev()
            .take_while(|command| matches!(command, Command::Immediate(_)))
            .count()
    }

    pub fn forget(&mut self, component: &str) {
        self.logs.remove(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_for_tracked_vars() {
        assert_eq!(
            flags_for("codeEditor", "value"),
            &["valueChanged", "immediateValueChanged"]
        );
        assert_eq!(flags_for("textInput", "immediateValue"), &["immediateValueChanged"]);
        assert!(flags_for("equilibriumLine", "stable").is_empty());
    }

    #[test]
    fn test_command_log_tracks_pending_edits() {
        let mut log = CommandLog::new();
        log.record("/ti", Command::Immediate("a".into()));
        log.record("/ti", Command::Immediate("ab".into()));
        assert_eq!(log.pending("/ti"), 2);
        assert_eq!(log.last_commit("/ti"), None);

        log.record("/ti", Command::Commit("ab".into()));
        assert_eq!(log.pending("/ti"), 0);
        assert_eq!(log.last_commit("/ti"), Some("ab"));
    }
}
