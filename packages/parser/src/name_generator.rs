use std::collections::HashMap;

/// Sequential names for unnamed components within one namespace.
///
/// Each component type has its own counter, so the first unnamed `<text>`
/// is `_text1` and the first unnamed `<p>` is `_p1`.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    counts: HashMap<String, u32>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self, component_type: &str) -> String {
        let count = self.counts.entry(component_type.to_string()).or_insert(0);
        *count += 1;
        format!("_{}{}", component_type, count)
    }

    pub fn count(&self, component_type: &str) -> u32 {
        self.counts.get(component_type).copied().unwrap_or(0)
    }
}
