//! Minimal symbolic math for `math`, `number` and `equilibriumLine`.
//!
//! Expressions are trees of numbers, symbols and operator applications.
//! Subtraction is stored as addition of a negation, the way the
//! math-expressions tree format does, so `a - b` is `["+", "a", ["-", "b"]]`.

mod parse;
mod simplify;

pub use parse::{parse_math, MathParseError};
pub use simplify::simplify;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Placeholder symbol for an empty expression
pub const BLANK: &str = "\u{ff3f}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Mul,
    Div,
    Pow,
    Neg,
    Eq,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Pow => "^",
            Operator::Neg => "-",
            Operator::Eq => "=",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Operator::Eq => 0,
            Operator::Add => 1,
            Operator::Mul | Operator::Div => 2,
            Operator::Neg => 3,
            Operator::Pow => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MathExpr {
    Number(f64),
    Symbol(String),
    Apply(Operator, Vec<MathExpr>),
}

impl Default for MathExpr {
    fn default() -> Self {
        Self::blank()
    }
}

impl MathExpr {
    pub fn blank() -> Self {
        MathExpr::Symbol(BLANK.to_string())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, MathExpr::Symbol(s) if s == BLANK)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        MathExpr::Symbol(name.into())
    }

    pub fn apply(op: Operator, args: Vec<MathExpr>) -> Self {
        MathExpr::Apply(op, args)
    }

    /// Numeric value when the expression contains no free symbols.
    pub fn evaluate(&self) -> Option<f64> {
        match self {
            MathExpr::Number(n) => Some(*n),
            MathExpr::Symbol(_) => None,
            MathExpr::Apply(op, args) => {
                let values: Option<Vec<f64>> = args.iter().map(|a| a.evaluate()).collect();
                let values = values?;
                match op {
                    Operator::Add => Some(values.iter().sum()),
                    Operator::Mul => Some(values.iter().product()),
                    Operator::Div => match values.as_slice() {
                        [a, b] => Some(a / b),
                        _ => None,
                    },
                    Operator::Pow => match values.as_slice() {
                        [a, b] => Some(a.powf(*b)),
                        _ => None,
                    },
                    Operator::Neg => values.first().map(|v| -v),
                    Operator::Eq => None,
                }
            }
        }
    }

    /// Replace symbols by expressions.
    pub fn substitute(&self, bindings: &HashMap<String, MathExpr>) -> MathExpr {
        match self {
            MathExpr::Symbol(name) => bindings
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            MathExpr::Number(_) => self.clone(),
            MathExpr::Apply(op, args) => MathExpr::Apply(
                *op,
                args.iter().map(|arg| arg.substitute(bindings)).collect(),
            ),
        }
    }

    /// Tree form used by math-expressions: numbers, symbol strings and
    /// `[operator, ...operands]` arrays.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MathExpr::Number(n) => number_to_json(*n),
            MathExpr::Symbol(s) => serde_json::Value::String(s.clone()),
            MathExpr::Apply(op, args) => {
                let mut items = vec![serde_json::Value::String(op.symbol().to_string())];
                items.extend(args.iter().map(|arg| arg.to_json()));
                serde_json::Value::Array(items)
            }
        }
    }

    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            MathExpr::Number(n) => {
                if *n < 0.0 && parent > Operator::Add.precedence() {
                    write!(f, "({})", format_number(*n))
                } else {
                    write!(f, "{}", format_number(*n))
                }
            }
            MathExpr::Symbol(s) => write!(f, "{s}"),
            MathExpr::Apply(op, args) => {
                let own = op.precedence();
                let wrap = own < parent;
                if wrap {
                    write!(f, "(")?;
                }
                match op {
                    Operator::Neg => {
                        write!(f, "-")?;
                        if let Some(arg) = args.first() {
                            arg.fmt_with_precedence(f, own + 1)?;
                        }
                    }
                    Operator::Add => {
                        for (i, arg) in args.iter().enumerate() {
                            match (i, arg) {
                                (0, _) => arg.fmt_with_precedence(f, own)?,
                                (_, MathExpr::Apply(Operator::Neg, inner)) if inner.len() == 1 => {
                                    write!(f, " - ")?;
                                    inner[0].fmt_with_precedence(f, own + 1)?;
                                }
                                (_, MathExpr::Number(n)) if *n < 0.0 => {
                                    write!(f, " - {}", format_number(-n))?;
                                }
                                _ => {
                                    write!(f, " + ")?;
                                    arg.fmt_with_precedence(f, own)?;
                                }
                            }
                        }
                    }
                    Operator::Mul => {
                        for (i, arg) in args.iter().enumerate() {
                            let factor = WithPrecedence(arg, own + 1).to_string();
                            if i > 0 {
                                // `2 3` and `x -y` would not parse back as products
                                let explicit = factor.starts_with(|c: char| {
                                    c.is_ascii_digit() || c == '.' || c == '-'
                                });
                                write!(f, "{}", if explicit { " * " } else { " " })?;
                            }
                            write!(f, "{factor}")?;
                        }
                    }
                    Operator::Div | Operator::Pow | Operator::Eq => {
                        let separator = match op {
                            Operator::Div => "/",
                            Operator::Pow => "^",
                            _ => " = ",
                        };
                        for (i, arg) in args.iter().enumerate() {
                            if i > 0 {
                                write!(f, "{separator}")?;
                            }
                            // power is right-associative
                            let child_precedence =
                                if *op == Operator::Pow && i == 1 { own } else { own + 1 };
                            arg.fmt_with_precedence(f, child_precedence)?;
                        }
                    }
                }
                if wrap {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

struct WithPrecedence<'a>(&'a MathExpr, u8);

impl fmt::Display for WithPrecedence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_with_precedence(f, self.1)
    }
}

impl fmt::Display for MathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_precedence(f, 0)
    }
}

/// Format a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

pub fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}
