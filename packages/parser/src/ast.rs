use serde::{Deserialize, Serialize};

/// Byte range of a node in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Root of a parsed DoenetML source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub children: Vec<ParsedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParsedNode {
    Element(Element),
    Text(TextNode),
    Macro(MacroNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<ParsedNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub value: String,
    pub span: Span,
}

/// A `$ref` appearing as a child node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroNode {
    pub reference: MacroRef,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

/// Target of a macro: a name path plus an optional property.
///
/// `$g` has path `g`; `$(../b1)` has path `../b1`; `$ce.immediateValue`
/// has path `ce` and prop `immediateValue`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacroRef {
    pub path: String,
    pub prop: Option<String>,
}

impl MacroRef {
    /// Split `a/b.prop` into its path and property.
    pub fn from_head(head: &str) -> Self {
        let last_segment_start = head.rfind('/').map(|i| i + 1).unwrap_or(0);
        let last_segment = &head[last_segment_start..];
        match last_segment.find('.') {
            Some(dot) if last_segment != ".." && last_segment != "." => {
                let split = last_segment_start + dot;
                Self {
                    path: head[..split].to_string(),
                    prop: Some(head[split + 1..].to_string()),
                }
            }
            _ => Self {
                path: head.to_string(),
                prop: None,
            },
        }
    }
}

impl std::fmt::Display for MacroRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prop {
            Some(prop) => write!(f, "$({}.{})", self.path, prop),
            None => write!(f, "$({})", self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    pub span: Span,
}

/// Attribute value as an ordered list of literal text and macro pieces.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeValue(pub Vec<AttrPiece>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrPiece {
    Text(String),
    Macro(MacroRef),
}

impl AttributeValue {
    pub fn literal(text: impl Into<String>) -> Self {
        Self(vec![AttrPiece::Text(text.into())])
    }

    /// The concatenated text when the value holds no macros.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for piece in &self.0 {
            match piece {
                AttrPiece::Text(text) => out.push_str(text),
                AttrPiece::Macro(_) => return None,
            }
        }
        Some(out)
    }

    pub fn macros(&self) -> impl Iterator<Item = &MacroRef> {
        self.0.iter().filter_map(|piece| match piece {
            AttrPiece::Macro(reference) => Some(reference),
            AttrPiece::Text(_) => None,
        })
    }

    pub fn has_macros(&self) -> bool {
        self.macros().next().is_some()
    }
}

impl Element {
    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Literal value of an attribute, if present and macro-free.
    pub fn literal_attribute(&self, name: &str) -> Option<String> {
        self.attribute(name).and_then(|attr| attr.value.as_literal())
    }
}

impl MacroNode {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }
}

impl ParsedNode {
    pub fn span(&self) -> Span {
        match self {
            ParsedNode::Element(element) => element.span,
            ParsedNode::Text(text) => text.span,
            ParsedNode::Macro(node) => node.span,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            ParsedNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Whitespace-only text nodes.
    pub fn is_blank(&self) -> bool {
        matches!(self, ParsedNode::Text(text) if text.value.trim().is_empty())
    }
}
