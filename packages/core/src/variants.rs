//! Variant selection.
//!
//! The variant space is computed from the parsed document before any
//! component exists: every contributing element declares how many variants
//! it has, and the document's count is their product. A requested index is
//! decomposed back into one index per contributor, in document order, with
//! the first contributor varying fastest.

use crate::components::{self, ComponentDefinition};
use crate::error::Diagnostic;
use crc32fast::Hasher;
use doenet_parser::visitor::walk_element;
use doenet_parser::{Element, ParsedDocument, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariantRequest {
    Index(i64),
    Name(String),
}

/// The realized variant of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    pub index: usize,
    pub name: String,
    pub all_possible_variants: Vec<String>,
}

/// Name of a 1-based variant index: `a..z, aa, ab, ...`
pub fn variant_name(index: usize) -> String {
    let mut n = index.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'a' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

pub fn variant_index_from_name(name: &str) -> Option<usize> {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_lowercase()) {
        return None;
    }
    name.bytes().try_fold(0usize, |acc, b| {
        acc.checked_mul(26)?.checked_add((b - b'a') as usize + 1)
    })
}

/// One element that contributes to the variant space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    /// Source offset of the element
    pub position: usize,
    pub count: usize,
}

/// Static variant space of a document
#[derive(Debug, Clone, Default)]
pub struct VariantPlan {
    pub contributors: Vec<Contributor>,
    pub total: usize,
    /// Contributors whose count could not be read from literal attributes
    pub diagnostics: Vec<Diagnostic>,
}

impl VariantPlan {
    pub fn from_document(doc: &ParsedDocument, max_variants: usize) -> Self {
        struct Collector {
            contributors: Vec<Contributor>,
            diagnostics: Vec<Diagnostic>,
            cap: usize,
        }

        impl Visitor for Collector {
            fn visit_element(&mut self, element: &Element) {
                let Some(definition) = components::lookup(&element.tag) else {
                    return walk_element(self, element);
                };
                if let Some(count) = definition.variant_count {
                    self.contributors.push(Contributor {
                        position: element.span.start,
                        count: count(element).clamp(1, self.cap),
                    });
                    self.diagnostics.extend(non_literal_count_warning(element));
                }
                if !definition.ignore_variants_from_children {
                    walk_element(self, element);
                }
            }
        }

        let cap = max_variants.max(1);
        let mut collector = Collector {
            contributors: Vec::new(),
            diagnostics: Vec::new(),
            cap,
        };
        collector.visit_document(doc);

        let total = collector
            .contributors
            .iter()
            .fold(1usize, |acc, c| acc.saturating_mul(c.count))
            .min(cap);

        Self {
            contributors: collector.contributors,
            total,
            diagnostics: collector.diagnostics,
        }
    }

    /// Per-contributor indices (1-based) keyed by source offset.
    pub fn indices(&self, document_index: usize) -> HashMap<usize, usize> {
        let mut remaining = document_index.saturating_sub(1);
        let mut indices = HashMap::new();
        for contributor in &self.contributors {
            indices.insert(contributor.position, remaining % contributor.count + 1);
            remaining /= contributor.count;
        }
        indices
    }

    /// Resolve a request against this space.
    ///
    /// Indices wrap into `1..=total`; an unknown name falls back to the
    /// first variant with a warning.
    pub fn resolve(&self, request: Option<&VariantRequest>) -> (VariantRecord, Option<Diagnostic>) {
        let total = self.total.max(1) as i64;
        let mut diagnostic = None;

        let index = match request {
            None => 1,
            Some(VariantRequest::Index(i)) => ((i % total) - 1).rem_euclid(total) as usize + 1,
            Some(VariantRequest::Name(name)) => match variant_index_from_name(name) {
                Some(i) if (i as i64) <= total => i,
                _ => {
                    warn!(variant = %name, "unknown variant name");
                    diagnostic = Some(Diagnostic::warning(
                        format!("Variant name {name} is not valid; using variant a"),
                        None,
                    ));
                    1
                }
            },
        };

        let record = VariantRecord {
            index,
            name: variant_name(index),
            all_possible_variants: (1..=self.total.max(1)).map(variant_name).collect(),
        };
        (record, diagnostic)
    }
}

/// Variant index for a component created after load, from the document
/// variant and the component's name.
pub fn derived_index(document_index: usize, name: &str, count: usize) -> usize {
    let mut hasher = Hasher::new();
    hasher.update(&(document_index as u64).to_le_bytes());
    hasher.update(name.as_bytes());
    hasher.finalize() as usize % count.max(1) + 1
}

/// Warning for a contributor whose count attributes are references.
///
/// The count is fixed before anything is evaluated, so referenced values
/// are replaced by the type's defaults when the space is sized.
pub fn non_literal_count_warning(element: &Element) -> Option<Diagnostic> {
    let references: Vec<&str> = element
        .attributes
        .iter()
        .filter(|attribute| attribute.value.has_macros())
        .map(|attribute| attribute.name.as_str())
        .collect();
    if references.is_empty() {
        return None;
    }
    warn!(tag = %element.tag, attributes = ?references, "variant count uses defaults for references");
    Some(Diagnostic::warning(
        format!(
            "Variants of {} are counted with default values for referenced attributes: {}",
            element.tag,
            references.join(", ")
        ),
        None,
    ))
}

/// Number of variants an element contributes on its own.
pub fn element_variant_count(definition: &ComponentDefinition, element: &Element) -> Option<usize> {
    definition.variant_count.map(|count| count(element).max(1))
}
