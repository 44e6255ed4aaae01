use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::GraphError;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Parse error: {0}")]
    Parse(#[from] doenet_parser::ParseError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Component {component} has no state variable {name}")]
    StateVarNotFound { component: String, name: String },

    #[error("Invalid action arguments for {action}: {message}")]
    InvalidArguments { action: String, message: String },

    #[error("Persisted state error: {0}")]
    Persistence(String),

    #[error("Expansion of {component} exceeded depth {depth}")]
    ExpansionDepthExceeded { component: String, depth: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// A document-level problem that does not stop evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, component: Option<&str>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
            component: component.map(str::to_string),
        }
    }

    pub fn error(message: impl Into<String>, component: Option<&str>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
            component: component.map(str::to_string),
        }
    }
}
