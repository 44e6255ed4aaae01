//! DoenetML tokenizer.
//!
//! Markup is lexed in two modes. Content mode recognizes tag openers, macros
//! and free text; tag mode recognizes attribute names, `=`, quoted values and
//! the tag terminators. The driver in [`tokenize`] morphs between the two and
//! flattens everything into a single token stream for the parser.

use crate::error::{ParseError, ParseResult};
use logos::{Lexer, Logos};
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum ContentToken<'src> {
    #[token("<!--")]
    CommentStart,

    #[regex(r"</[A-Za-z_][A-Za-z0-9_]*", |lex| &lex.slice()[2..])]
    CloseTag(&'src str),

    #[regex(r"<[A-Za-z_][A-Za-z0-9_]*", |lex| &lex.slice()[1..])]
    OpenTag(&'src str),

    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?", |lex| &lex.slice()[1..])]
    Macro(&'src str),

    #[regex(r"\$\([^)]*\)", |lex| { let s = lex.slice(); &s[2..s.len() - 1] })]
    ParenMacro(&'src str),

    #[regex(r"[^<$]+")]
    Text(&'src str),

    // A `$` or `<` that does not start a macro or tag is plain text.
    #[token("$")]
    Dollar,

    #[token("<")]
    LessThan,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TagToken<'src> {
    #[regex(r"[A-Za-z_][A-Za-z0-9_:.\-]*")]
    Ident(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    Quoted(&'src str),

    #[token(">")]
    Close,

    #[token("/>")]
    SelfClose,

    #[token("}")]
    RBrace,
}

/// Pieces of a quoted attribute value.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum ValueToken<'src> {
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?", |lex| &lex.slice()[1..])]
    Macro(&'src str),

    #[regex(r"\$\([^)]*\)", |lex| { let s = lex.slice(); &s[2..s.len() - 1] })]
    ParenMacro(&'src str),

    #[regex(r"[^$]+")]
    Text(&'src str),

    #[token("$")]
    Dollar,
}

/// Flattened token stream consumed by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    /// `<name`
    OpenTag(&'src str),
    /// `</name`
    CloseTag(&'src str),
    AttrName(&'src str),
    Equals,
    /// Quoted attribute value without the quotes
    AttrValue(&'src str),
    /// `>`
    TagEnd,
    /// `/>`
    SelfClose,
    Text(&'src str),
    /// `$name` or `$name.prop`, without the `$`
    Macro(&'src str),
    /// `$( ... )` contents
    ParenMacro(&'src str),
    /// `{` directly after a bare macro
    MacroAttrsStart,
    /// `}` closing a macro attribute block
    MacroAttrsEnd,
}

/// Tokenize a DoenetML source string.
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, Range<usize>)>> {
    let mut tokens: Vec<(Token<'_>, Range<usize>)> = Vec::new();
    let mut lexer = ContentToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(ContentToken::CommentStart) => {
                let Some(end) = lexer.remainder().find("-->") else {
                    return Err(ParseError::unexpected_eof(source.len(), "'-->'"));
                };
                lexer.bump(end + 3);
            }
            Ok(ContentToken::OpenTag(name)) => {
                tokens.push((Token::OpenTag(name), span));
                let mut tag_lexer = lexer.morph::<TagToken>();
                lex_tag_body(source, &mut tag_lexer, &mut tokens, TagContext::Element, 0)?;
                lexer = tag_lexer.morph();
            }
            Ok(ContentToken::CloseTag(name)) => {
                tokens.push((Token::CloseTag(name), span));
                let mut tag_lexer = lexer.morph::<TagToken>();
                lex_tag_body(source, &mut tag_lexer, &mut tokens, TagContext::Closing, 0)?;
                lexer = tag_lexer.morph();
            }
            Ok(ContentToken::Macro(head)) => {
                tokens.push((Token::Macro(head), span.clone()));
                if lexer.remainder().starts_with('{') {
                    let brace = span.end..span.end + 1;
                    lexer.bump(1);
                    tokens.push((Token::MacroAttrsStart, brace));
                    let mut tag_lexer = lexer.morph::<TagToken>();
                    lex_tag_body(
                        source,
                        &mut tag_lexer,
                        &mut tokens,
                        TagContext::MacroAttributes,
                        0,
                    )?;
                    lexer = tag_lexer.morph();
                }
            }
            Ok(ContentToken::ParenMacro(inner)) => match inner.find('{') {
                None => tokens.push((Token::ParenMacro(inner), span)),
                Some(brace) => {
                    // `$(name{attr="v"})` carries its attribute block inside the parens
                    let inner_start = span.start + 2;
                    tokens.push((Token::ParenMacro(&inner[..brace]), span.clone()));
                    tokens.push((
                        Token::MacroAttrsStart,
                        inner_start + brace..inner_start + brace + 1,
                    ));
                    let block = &inner[brace + 1..];
                    let mut tag_lexer = TagToken::lexer(block);
                    lex_tag_body(
                        source,
                        &mut tag_lexer,
                        &mut tokens,
                        TagContext::MacroAttributes,
                        inner_start + brace + 1,
                    )?;
                    if !tag_lexer.remainder().trim().is_empty() {
                        return Err(ParseError::invalid_syntax(
                            span,
                            "unexpected text after macro attributes",
                        ));
                    }
                }
            },
            Ok(ContentToken::Text(_)) | Ok(ContentToken::Dollar) | Ok(ContentToken::LessThan) => {
                push_text(source, &mut tokens, span);
            }
            Err(()) => return Err(ParseError::lexer_error(span)),
        }
    }

    Ok(tokens)
}

#[derive(Clone, Copy, PartialEq)]
enum TagContext {
    Element,
    Closing,
    MacroAttributes,
}

fn lex_tag_body<'src>(
    source: &'src str,
    lexer: &mut Lexer<'src, TagToken<'src>>,
    tokens: &mut Vec<(Token<'src>, Range<usize>)>,
    context: TagContext,
    offset: usize,
) -> ParseResult<()> {
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let span = span.start + offset..span.end + offset;
        let token = match result {
            Ok(token) => token,
            Err(()) => return Err(ParseError::lexer_error(span)),
        };
        match (context, token) {
            (TagContext::Closing, TagToken::Close) => {
                tokens.push((Token::TagEnd, span));
                return Ok(());
            }
            (TagContext::Closing, other) => {
                return Err(ParseError::unexpected_token(span, "'>'", format!("{other:?}")));
            }
            (TagContext::Element, TagToken::Close) => {
                tokens.push((Token::TagEnd, span));
                return Ok(());
            }
            (TagContext::Element, TagToken::SelfClose) => {
                tokens.push((Token::SelfClose, span));
                return Ok(());
            }
            (TagContext::MacroAttributes, TagToken::RBrace) => {
                tokens.push((Token::MacroAttrsEnd, span));
                return Ok(());
            }
            (_, TagToken::Ident(name)) => tokens.push((Token::AttrName(name), span)),
            (_, TagToken::Equals) => tokens.push((Token::Equals, span)),
            (_, TagToken::Quoted(value)) => tokens.push((Token::AttrValue(value), span)),
            (_, other) => {
                return Err(ParseError::unexpected_token(span, "attribute", format!("{other:?}")));
            }
        }
    }

    let expected = match context {
        TagContext::MacroAttributes => "'}'",
        _ => "'>'",
    };
    Err(ParseError::unexpected_eof(source.len(), expected))
}

/// Append text, merging with a directly preceding text token.
fn push_text<'src>(
    source: &'src str,
    tokens: &mut Vec<(Token<'src>, Range<usize>)>,
    span: Range<usize>,
) {
    if let Some((Token::Text(_), previous)) = tokens.last() {
        if previous.end == span.start {
            let merged = previous.start..span.end;
            tokens.pop();
            tokens.push((Token::Text(&source[merged.clone()]), merged));
            return;
        }
    }
    tokens.push((Token::Text(&source[span.clone()]), span));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_element_with_attributes() {
        let tokens = kinds(r#"<text name="t1" hide>hi</text>"#);
        assert_eq!(
            tokens,
            vec![
                Token::OpenTag("text"),
                Token::AttrName("name"),
                Token::Equals,
                Token::AttrValue("t1"),
                Token::AttrName("hide"),
                Token::TagEnd,
                Token::Text("hi"),
                Token::CloseTag("text"),
                Token::TagEnd,
            ]
        );
    }

    #[test]
    fn test_macros_in_text() {
        let tokens = kinds("value: $ce.immediateValue and $(../b1)");
        assert_eq!(
            tokens,
            vec![
                Token::Text("value: "),
                Token::Macro("ce.immediateValue"),
                Token::Text(" and "),
                Token::ParenMacro("../b1"),
            ]
        );
    }

    #[test]
    fn test_macro_attribute_block() {
        let tokens = kinds(r#"$g{name="g2"}"#);
        assert_eq!(
            tokens,
            vec![
                Token::Macro("g"),
                Token::MacroAttrsStart,
                Token::AttrName("name"),
                Token::Equals,
                Token::AttrValue("g2"),
                Token::MacroAttrsEnd,
            ]
        );
    }

    #[test]
    fn test_paren_macro_with_attributes() {
        let tokens = kinds(r#"$(g/A.stable{assignNames="gAs"})"#);
        assert_eq!(
            tokens,
            vec![
                Token::ParenMacro("g/A.stable"),
                Token::MacroAttrsStart,
                Token::AttrName("assignNames"),
                Token::Equals,
                Token::AttrValue("gAs"),
                Token::MacroAttrsEnd,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("a<!-- <p>gone</p> -->b");
        assert_eq!(tokens, vec![Token::Text("a"), Token::Text("b")]);
    }

    #[test]
    fn test_stray_dollar_and_less_than_are_text() {
        let tokens = kinds("costs $5 when x < 3");
        assert_eq!(tokens, vec![Token::Text("costs $5 when x < 3")]);
    }

    #[test]
    fn test_unterminated_tag() {
        assert!(tokenize("<p name=\"a\"").is_err());
    }
}
