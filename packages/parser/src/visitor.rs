use crate::ast::*;

/// Immutable walk over a parsed document.
///
/// Default methods visit every node; override the ones you care about and
/// call the matching `walk_*` function to keep descending.
pub trait Visitor: Sized {
    fn visit_document(&mut self, doc: &ParsedDocument) {
        walk_document(self, doc);
    }

    fn visit_node(&mut self, node: &ParsedNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &Element) {
        walk_element(self, element);
    }

    fn visit_text(&mut self, _text: &TextNode) {}

    fn visit_macro(&mut self, node: &MacroNode) {
        walk_macro(self, node);
    }

    fn visit_attribute(&mut self, attribute: &Attribute) {
        for reference in attribute.value.macros() {
            self.visit_macro_ref(reference);
        }
    }

    fn visit_macro_ref(&mut self, _reference: &MacroRef) {}
}

pub fn walk_document<V: Visitor>(visitor: &mut V, doc: &ParsedDocument) {
    for node in &doc.children {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &ParsedNode) {
    match node {
        ParsedNode::Element(element) => visitor.visit_element(element),
        ParsedNode::Text(text) => visitor.visit_text(text),
        ParsedNode::Macro(macro_node) => visitor.visit_macro(macro_node),
    }
}

pub fn walk_element<V: Visitor>(visitor: &mut V, element: &Element) {
    for attribute in &element.attributes {
        visitor.visit_attribute(attribute);
    }
    for child in &element.children {
        visitor.visit_node(child);
    }
}

pub fn walk_macro<V: Visitor>(visitor: &mut V, node: &MacroNode) {
    visitor.visit_macro_ref(&node.reference);
    for attribute in &node.attributes {
        visitor.visit_attribute(attribute);
    }
}
