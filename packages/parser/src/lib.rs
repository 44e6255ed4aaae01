//! DoenetML markup parser.
//!
//! Turns source text into a [`ParsedDocument`]: elements with ordered
//! attributes, text, and `$name.prop` macros. Attribute values keep their
//! macros as separate pieces so the core can wire them as references.

pub mod ast;
pub mod error;
pub mod name_generator;
pub mod parser;
pub mod tokenizer;
pub mod visitor;

pub use ast::{
    AttrPiece, Attribute, AttributeValue, Element, MacroNode, MacroRef, ParsedDocument,
    ParsedNode, Span, TextNode,
};
pub use error::{format_error, ParseError, ParseResult};
pub use name_generator::NameGenerator;
pub use parser::{parse, Parser};
pub use tokenizer::{tokenize, Token};
pub use visitor::{walk_document, walk_element, walk_macro, walk_node, Visitor};
