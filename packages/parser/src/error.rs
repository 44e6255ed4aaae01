use std::ops::Range;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {}: expected {expected}, found {found}", span.start)]
    UnexpectedToken {
        span: Range<usize>,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Mismatched closing tag at {}: expected </{expected}>, found </{found}>", span.start)]
    MismatchedTag {
        span: Range<usize>,
        expected: String,
        found: String,
    },

    #[error("Invalid syntax at {}: {message}", span.start)]
    InvalidSyntax { span: Range<usize>, message: String },

    #[error("Lexer error at {}", span.start)]
    LexerError { span: Range<usize> },
}

impl ParseError {
    pub fn unexpected_token(
        span: Range<usize>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn mismatched_tag(
        span: Range<usize>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::MismatchedTag {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid_syntax(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span,
            message: message.into(),
        }
    }

    pub fn lexer_error(span: Range<usize>) -> Self {
        Self::LexerError { span }
    }

    /// Source range the error points at.
    pub fn span(&self) -> Range<usize> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::MismatchedTag { span, .. }
            | Self::InvalidSyntax { span, .. }
            | Self::LexerError { span } => span.clone(),
            Self::UnexpectedEof { pos, .. } => *pos..*pos,
        }
    }

    /// Short label used by the pretty reporter.
    fn label(&self) -> String {
        match self {
            Self::UnexpectedToken { expected, .. } => format!("expected {expected}"),
            Self::UnexpectedEof { expected, .. } => format!("input ends here, expected {expected}"),
            Self::MismatchedTag { expected, .. } => format!("this should close <{expected}>"),
            Self::InvalidSyntax { message, .. } => message.clone(),
            Self::LexerError { .. } => "unrecognized input".to_string(),
        }
    }
}

/// Render a parse error against its source with ariadne.
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span();
    let mut output = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, span))
                .with_message(error.label())
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut output);

    match written {
        Ok(()) => String::from_utf8_lossy(&output).into_owned(),
        Err(_) => error.to_string(),
    }
}

/// Plain fallback when ariadne is disabled.
#[cfg(not(feature = "pretty-errors"))]
pub fn format_error(_source: &str, filename: &str, error: &ParseError) -> String {
    format!("{filename}: {error}")
}
