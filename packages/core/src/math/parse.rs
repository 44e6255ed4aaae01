use super::{MathExpr, Operator};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathParseError {
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected {0} at {1}")]
    UnexpectedToken(String, usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<(Tok, usize)>, MathParseError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            // `1e5`, `2E-3`; a bare `2e` stays 2 times the symbol e
            if let Some(exponent) = exponent_len(&chars[i..]) {
                i += exponent;
            }
            let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| MathParseError::UnexpectedToken(text.clone(), pos))?;
            tokens.push((Tok::Num(value), pos));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().map(|(_, c)| c).collect();
            tokens.push((Tok::Ident(name), pos));
        } else {
            let tok = match c {
                '+' | '-' | '*' | '/' | '^' | '=' => Tok::Op(c),
                '\u{2212}' => Tok::Op('-'),
                '\u{22c5}' | '\u{00d7}' => Tok::Op('*'),
                '(' => Tok::LParen,
                ')' => Tok::RParen,
                other => return Err(MathParseError::UnexpectedChar(other, pos)),
            };
            tokens.push((tok, pos));
            i += 1;
        }
    }

    Ok(tokens)
}

/// Length of an exponent suffix (`e5`, `E-3`) at the start of `rest`, if there is one.
fn exponent_len(rest: &[(usize, char)]) -> Option<usize> {
    let mut chars = rest.iter().map(|(_, c)| *c);
    if !matches!(chars.next(), Some('e' | 'E')) {
        return None;
    }
    let mut len = 1;
    let mut next = chars.next();
    if matches!(next, Some('+' | '-')) {
        len += 1;
        next = chars.next();
    }
    if !next.is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(len + 1 + chars.take_while(char::is_ascii_digit).count())
}

/// Parse infix math text.
///
/// Empty input parses to the blank expression.
pub fn parse_math(input: &str) -> Result<MathExpr, MathParseError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Ok(MathExpr::blank());
    }

    let mut parser = MathParser { tokens, pos: 0 };
    let expr = parser.equation()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((tok, pos)) => Err(MathParseError::UnexpectedToken(format!("{tok:?}"), *pos)),
    }
}

struct MathParser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
}

impl MathParser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        tok
    }

    fn equation(&mut self) -> Result<MathExpr, MathParseError> {
        let left = self.sum()?;
        if self.peek() == Some(&Tok::Op('=')) {
            self.advance();
            let right = self.sum()?;
            return Ok(MathExpr::Apply(Operator::Eq, vec![left, right]));
        }
        Ok(left)
    }

    fn sum(&mut self) -> Result<MathExpr, MathParseError> {
        let mut terms = vec![self.term()?];
        loop {
            match self.peek() {
                Some(Tok::Op('+')) => {
                    self.advance();
                    terms.push(self.term()?);
                }
                Some(Tok::Op('-')) => {
                    self.advance();
                    let term = self.term()?;
                    terms.push(MathExpr::Apply(Operator::Neg, vec![term]));
                }
                _ => break,
            }
        }
        Ok(collapse(Operator::Add, terms))
    }

    fn term(&mut self) -> Result<MathExpr, MathParseError> {
        let mut expr = self.unary()?;
        let mut factors: Vec<MathExpr> = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Op('*')) => {
                    self.advance();
                    factors.push(std::mem::take(&mut expr));
                    expr = self.unary()?;
                }
                Some(Tok::Op('/')) => {
                    self.advance();
                    let denominator = self.unary()?;
                    expr = MathExpr::Apply(Operator::Div, vec![expr, denominator]);
                }
                // juxtaposition: 2x, x(y+1), (a)(b); a number never follows
                Some(Tok::Ident(_)) | Some(Tok::LParen) => {
                    factors.push(std::mem::take(&mut expr));
                    expr = self.power()?;
                }
                _ => break,
            }
        }
        factors.push(expr);
        Ok(collapse(Operator::Mul, factors))
    }

    fn unary(&mut self) -> Result<MathExpr, MathParseError> {
        match self.peek() {
            Some(Tok::Op('-')) => {
                self.advance();
                let operand = self.unary()?;
                Ok(MathExpr::Apply(Operator::Neg, vec![operand]))
            }
            Some(Tok::Op('+')) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<MathExpr, MathParseError> {
        let base = self.primary()?;
        if self.peek() == Some(&Tok::Op('^')) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(MathExpr::Apply(Operator::Pow, vec![base, exponent]));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<MathExpr, MathParseError> {
        let position = self.tokens.get(self.pos).map(|(_, p)| *p).unwrap_or(0);
        match self.advance() {
            Some(Tok::Num(n)) => Ok(MathExpr::Number(n)),
            Some(Tok::Ident(name)) => Ok(MathExpr::Symbol(name)),
            Some(Tok::LParen) => {
                let inner = self.equation()?;
                match self.advance() {
                    Some(Tok::RParen) => Ok(inner),
                    Some(tok) => Err(MathParseError::UnexpectedToken(format!("{tok:?}"), position)),
                    None => Err(MathParseError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(MathParseError::UnexpectedToken(format!("{tok:?}"), position)),
            None => Err(MathParseError::UnexpectedEnd),
        }
    }
}

fn collapse(op: Operator, mut items: Vec<MathExpr>) -> MathExpr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        MathExpr::Apply(op, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtraction_is_negated_addition() {
        let expr = parse_math("a - b").unwrap();
        assert_eq!(
            expr,
            MathExpr::Apply(
                Operator::Add,
                vec![
                    MathExpr::symbol("a"),
                    MathExpr::Apply(Operator::Neg, vec![MathExpr::symbol("b")])
                ]
            )
        );
    }

    #[test]
    fn test_implicit_multiplication() {
        let expr = parse_math("2x").unwrap();
        assert_eq!(
            expr,
            MathExpr::Apply(Operator::Mul, vec![MathExpr::Number(2.0), MathExpr::symbol("x")])
        );
    }

    #[test]
    fn test_adjacent_numbers_are_rejected() {
        assert!(parse_math("2 3").is_err());
        assert!(parse_math("x 2").is_err());
        assert_eq!(parse_math("2 * 3").unwrap().evaluate(), Some(6.0));
    }

    #[test]
    fn test_exponent_literals() {
        assert_eq!(parse_math("2e3").unwrap(), MathExpr::Number(2000.0));
        assert_eq!(parse_math("1.5E-2").unwrap(), MathExpr::Number(0.015));
        assert_eq!(parse_math("1e999").unwrap().evaluate(), Some(f64::INFINITY));
        assert_eq!(
            crate::value::StateValue::from("1e999").to_math().evaluate(),
            crate::value::StateValue::from("1e999").as_f64()
        );
        assert_eq!(
            parse_math("2e").unwrap(),
            MathExpr::Apply(Operator::Mul, vec![MathExpr::Number(2.0), MathExpr::symbol("e")])
        );
        assert_eq!(
            parse_math("2e+x").unwrap(),
            MathExpr::Apply(
                Operator::Add,
                vec![
                    MathExpr::Apply(Operator::Mul, vec![MathExpr::Number(2.0), MathExpr::symbol("e")]),
                    MathExpr::symbol("x")
                ]
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_math("2^3^2").unwrap();
        assert_eq!(expr.evaluate(), Some(512.0));
    }

    #[test]
    fn test_negative_equation() {
        let expr = parse_math("y=-7").unwrap();
        assert_eq!(expr.to_json(), serde_json::json!(["=", "y", ["-", 7]]));
    }

    #[test]
    fn test_errors() {
        assert!(parse_math("(1 + 2").is_err());
        assert!(parse_math("1 + #").is_err());
        assert!(parse_math("").unwrap().is_blank());
    }
}
