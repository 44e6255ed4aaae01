use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token, ValueToken};
use logos::Logos;
use std::ops::Range;

/// Parse DoenetML source into a document tree.
pub fn parse(source: &str) -> ParseResult<ParsedDocument> {
    let mut parser = Parser::new(source)?;
    parser.parse_document()
}

/// Recursive-descent parser over the flattened token stream
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    pub fn parse_document(&mut self) -> ParseResult<ParsedDocument> {
        let children = self.parse_nodes(None)?;
        Ok(ParsedDocument { children })
    }

    /// Parse sibling nodes until the closing tag of `parent`, or the end
    /// of input at the top level.
    fn parse_nodes(&mut self, parent: Option<&str>) -> ParseResult<Vec<ParsedNode>> {
        let mut nodes = Vec::new();

        loop {
            let Some((token, span)) = self.peek().cloned() else {
                return match parent {
                    Some(tag) => Err(ParseError::unexpected_eof(
                        self.source.len(),
                        format!("</{tag}>"),
                    )),
                    None => Ok(nodes),
                };
            };

            match token {
                Token::OpenTag(_) => nodes.push(ParsedNode::Element(self.parse_element()?)),
                Token::CloseTag(name) => {
                    let Some(tag) = parent else {
                        return Err(ParseError::invalid_syntax(
                            span,
                            format!("closing tag </{name}> has no matching opening tag"),
                        ));
                    };
                    if !name.eq_ignore_ascii_case(tag) {
                        return Err(ParseError::mismatched_tag(span, tag, name));
                    }
                    self.advance();
                    self.expect_tag_end()?;
                    return Ok(nodes);
                }
                Token::Text(value) => {
                    self.advance();
                    nodes.push(ParsedNode::Text(TextNode {
                        value: value.to_string(),
                        span: Span::new(span.start, span.end),
                    }));
                }
                Token::Macro(_) | Token::ParenMacro(_) => {
                    nodes.push(ParsedNode::Macro(self.parse_macro()?))
                }
                other => {
                    return Err(ParseError::unexpected_token(
                        span,
                        "element, text or macro",
                        format!("{other:?}"),
                    ))
                }
            }
        }
    }

    fn parse_element(&mut self) -> ParseResult<Element> {
        let (tag, start) = match self.advance() {
            Some((Token::OpenTag(tag), span)) => (tag.to_string(), span.start),
            _ => return Err(ParseError::invalid_syntax(self.peek_span(), "expected element")),
        };

        let attributes = self.parse_attributes(&[Token::TagEnd, Token::SelfClose])?;

        let children = match self.advance() {
            Some((Token::SelfClose, _)) => Vec::new(),
            Some((Token::TagEnd, _)) => self.parse_nodes(Some(&tag))?,
            _ => {
                return Err(ParseError::unexpected_eof(self.source.len(), "'>'"));
            }
        };

        Ok(Element {
            tag,
            attributes,
            children,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_macro(&mut self) -> ParseResult<MacroNode> {
        let (reference, span) = match self.advance() {
            Some((Token::Macro(head), span)) | Some((Token::ParenMacro(head), span)) => {
                (MacroRef::from_head(head.trim()), span)
            }
            _ => return Err(ParseError::invalid_syntax(self.peek_span(), "expected macro")),
        };

        let attributes = if self.check(&Token::MacroAttrsStart) {
            self.advance();
            let attributes = self.parse_attributes(&[Token::MacroAttrsEnd])?;
            self.advance();
            attributes
        } else {
            Vec::new()
        };

        Ok(MacroNode {
            reference,
            attributes,
            span: Span::new(span.start, self.current_end().max(span.end)),
        })
    }

    /// Parse `name="value"` pairs until one of `terminators` is next.
    fn parse_attributes(&mut self, terminators: &[Token<'src>]) -> ParseResult<Vec<Attribute>> {
        let mut attributes: Vec<Attribute> = Vec::new();

        loop {
            let Some((token, span)) = self.peek().cloned() else {
                return Err(ParseError::unexpected_eof(self.source.len(), "'>'"));
            };
            if terminators.contains(&token) {
                return Ok(attributes);
            }

            let Token::AttrName(name) = token else {
                return Err(ParseError::unexpected_token(
                    span,
                    "attribute name",
                    format!("{token:?}"),
                ));
            };
            self.advance();

            let (value, end) = if self.check(&Token::Equals) {
                self.advance();
                match self.advance() {
                    Some((Token::AttrValue(raw), value_span)) => {
                        (split_attribute_value(raw), value_span.end)
                    }
                    _ => {
                        return Err(ParseError::unexpected_token(
                            self.current_span(),
                            "quoted attribute value",
                            "something else",
                        ))
                    }
                }
            } else {
                // A bare attribute is shorthand for "true"
                (AttributeValue::literal("true"), span.end)
            };

            if attributes
                .iter()
                .any(|existing| existing.name.eq_ignore_ascii_case(name))
            {
                return Err(ParseError::invalid_syntax(
                    span,
                    format!("duplicate attribute '{name}'"),
                ));
            }

            attributes.push(Attribute {
                name: name.to_string(),
                value,
                span: Span::new(span.start, end),
            });
        }
    }

    fn expect_tag_end(&mut self) -> ParseResult<()> {
        match self.advance() {
            Some((Token::TagEnd, _)) => Ok(()),
            _ => Err(ParseError::unexpected_token(self.current_span(), "'>'", "something else")),
        }
    }

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        matches!(self.peek(), Some((t, _)) if t == token)
    }

    fn current_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, span)| span.clone())
            .unwrap_or(0..0)
    }

    fn current_end(&self) -> usize {
        self.current_span().end
    }

    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| {
                let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
                end..end
            })
    }
}

/// Split a quoted attribute value into text and macro pieces.
fn split_attribute_value(raw: &str) -> AttributeValue {
    let mut pieces: Vec<AttrPiece> = Vec::new();
    let mut lexer = ValueToken::lexer(raw);

    while let Some(result) = lexer.next() {
        let piece = match result {
            Ok(ValueToken::Macro(head)) | Ok(ValueToken::ParenMacro(head)) => {
                AttrPiece::Macro(MacroRef::from_head(head.trim()))
            }
            Ok(ValueToken::Text(_)) | Ok(ValueToken::Dollar) | Err(()) => {
                AttrPiece::Text(lexer.slice().to_string())
            }
        };
        match (pieces.last_mut(), piece) {
            (Some(AttrPiece::Text(previous)), AttrPiece::Text(text)) => previous.push_str(&text),
            (_, piece) => pieces.push(piece),
        }
    }

    if pieces.is_empty() {
        pieces.push(AttrPiece::Text(String::new()));
    }
    AttributeValue(pieces)
}
