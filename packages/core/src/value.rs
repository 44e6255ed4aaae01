use crate::math::{format_number, number_to_json, parse_math, MathExpr};
use serde::{Deserialize, Serialize};

/// Declared type of a state variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Boolean,
    Number,
    Integer,
    String,
    Math,
    List,
}

/// Value held by a cell.
///
/// The tagged serde form is what persisted state stores; snapshots use the
/// plain JSON from [`StateValue::to_json`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum StateValue {
    Boolean(bool),
    Number(f64),
    Integer(i64),
    String(String),
    Math(MathExpr),
    List(Vec<StateValue>),
    #[default]
    Undefined,
}

impl StateValue {
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            StateValue::Boolean(_) => Some(ValueType::Boolean),
            StateValue::Number(_) => Some(ValueType::Number),
            StateValue::Integer(_) => Some(ValueType::Integer),
            StateValue::String(_) => Some(ValueType::String),
            StateValue::Math(_) => Some(ValueType::Math),
            StateValue::List(_) => Some(ValueType::List),
            StateValue::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, StateValue::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Boolean(b) => Some(*b),
            StateValue::Integer(i) => Some(*i != 0),
            StateValue::Number(n) => Some(*n != 0.0),
            StateValue::String(s) => parse_bool(s),
            StateValue::Math(expr) => match expr {
                MathExpr::Symbol(s) => parse_bool(s),
                other => other.evaluate().map(|n| n != 0.0),
            },
            StateValue::List(_) | StateValue::Undefined => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StateValue::Number(n) => Some(*n),
            StateValue::Integer(i) => Some(*i as f64),
            StateValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            StateValue::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<f64>()
                    .ok()
                    .or_else(|| parse_math(trimmed).ok().and_then(|e| e.evaluate()))
            }
            StateValue::Math(expr) => expr.evaluate(),
            StateValue::List(_) | StateValue::Undefined => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StateValue::Integer(i) => Some(*i),
            other => other.as_f64().filter(|n| n.is_finite()).map(|n| n.round() as i64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text rendering used when values are concatenated into strings.
    pub fn to_text(&self) -> String {
        match self {
            StateValue::Boolean(b) => b.to_string(),
            StateValue::Number(n) => format_number(*n),
            StateValue::Integer(i) => i.to_string(),
            StateValue::String(s) => s.clone(),
            StateValue::Math(expr) if expr.is_blank() => String::new(),
            StateValue::Math(expr) => expr.to_string(),
            StateValue::List(items) => items
                .iter()
                .map(StateValue::to_text)
                .collect::<Vec<_>>()
                .join(", "),
            StateValue::Undefined => String::new(),
        }
    }

    pub fn to_math(&self) -> MathExpr {
        match self {
            StateValue::Math(expr) => expr.clone(),
            StateValue::Number(n) => MathExpr::Number(*n),
            StateValue::Integer(i) => MathExpr::Number(*i as f64),
            StateValue::Boolean(b) => MathExpr::symbol(b.to_string()),
            StateValue::String(s) => parse_math(s).unwrap_or_else(|_| MathExpr::blank()),
            StateValue::List(_) | StateValue::Undefined => MathExpr::blank(),
        }
    }

    /// Convert to `ty`, falling back to that type's empty value.
    pub fn coerce(&self, ty: ValueType) -> StateValue {
        match ty {
            ValueType::Boolean => StateValue::Boolean(self.as_bool().unwrap_or(false)),
            ValueType::Number => StateValue::Number(self.as_f64().unwrap_or(f64::NAN)),
            ValueType::Integer => StateValue::Integer(self.as_i64().unwrap_or(0)),
            ValueType::String => StateValue::String(self.to_text()),
            ValueType::Math => StateValue::Math(self.to_math()),
            ValueType::List => match self {
                StateValue::List(_) => self.clone(),
                StateValue::Undefined => StateValue::List(Vec::new()),
                other => StateValue::List(vec![other.clone()]),
            },
        }
    }

    pub fn default_for(ty: ValueType) -> StateValue {
        match ty {
            ValueType::Boolean => StateValue::Boolean(false),
            ValueType::Number => StateValue::Number(f64::NAN),
            ValueType::Integer => StateValue::Integer(0),
            ValueType::String => StateValue::String(String::new()),
            ValueType::Math => StateValue::Math(MathExpr::blank()),
            ValueType::List => StateValue::List(Vec::new()),
        }
    }

    /// Plain JSON for snapshots and the renderer.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            StateValue::Boolean(b) => serde_json::Value::Bool(*b),
            StateValue::Number(n) if n.is_nan() => serde_json::Value::String("NaN".into()),
            StateValue::Number(n) => number_to_json(*n),
            StateValue::Integer(i) => serde_json::Value::from(*i),
            StateValue::String(s) => serde_json::Value::String(s.clone()),
            StateValue::Math(expr) => expr.to_json(),
            StateValue::List(items) => {
                serde_json::Value::Array(items.iter().map(StateValue::to_json).collect())
            }
            StateValue::Undefined => serde_json::Value::Null,
        }
    }
}

impl From<&StateValue> for serde_json::Value {
    fn from(value: &StateValue) -> Self {
        value.to_json()
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Boolean(value)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        StateValue::Number(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Integer(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::String(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        StateValue::String(value)
    }
}

impl From<MathExpr> for StateValue {
    fn from(value: MathExpr) -> Self {
        StateValue::Math(value)
    }
}

/// Parse the textual booleans DoenetML accepts.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
