use serde::{Deserialize, Serialize};

/// How math values are normalized after evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SimplifyPolicy {
    /// Keep the expression as written
    None,
    /// Fold constant subexpressions
    #[default]
    Numbers,
    /// Fold, flatten sums and products, drop identities
    Full,
}

impl SimplifyPolicy {
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "false" => Some(Self::None),
            "numbers" | "numberspreserveorder" => Some(Self::Numbers),
            "full" | "true" | "" => Some(Self::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Numbers => "numbers",
            Self::Full => "full",
        }
    }
}

/// Tunables for a document core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Delay before an immediate edit is committed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Upper bound on the enumerated variant space
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    /// Settle passes allowed before composite expansion is abandoned
    #[serde(default = "default_max_expansion_depth")]
    pub max_expansion_depth: usize,

    /// Nesting limit for write-through requests
    #[serde(default = "default_max_inversion_depth")]
    pub max_inversion_depth: usize,

    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    #[serde(default)]
    pub default_simplify: SimplifyPolicy,
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_max_variants() -> usize {
    1000
}

fn default_max_expansion_depth() -> usize {
    32
}

fn default_max_inversion_depth() -> usize {
    64
}

fn default_undo_levels() -> usize {
    100
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_variants: default_max_variants(),
            max_expansion_depth: default_max_expansion_depth(),
            max_inversion_depth: default_max_inversion_depth(),
            undo_levels: default_undo_levels(),
            default_simplify: SimplifyPolicy::default(),
        }
    }
}
