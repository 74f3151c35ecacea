//! Lexer and recursive-descent parser for the filter/sort mini-language.
//!
//! Filters are field comparisons combined with boolean operators:
//!
//! ```text
//! status == "active" && (age >= 18 || vip == true)
//! ```
//!
//! Sort specs are comma-separated keys with an optional direction:
//!
//! ```text
//! name asc, created_at desc
//! ```
//!
//! Malformed input fails with [`CoreError::Parse`] naming the offending
//! fragment - a bad expression never degrades into an empty result.

use crate::error::{CoreError, CoreResult};
use crate::query::ast::{CmpOp, FilterExpr, Literal, SortDir, SortExpr, SortKey};

#[derive(Debug, Clone, PartialEq)]
enum TokKind {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    Null,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokKind,
    offset: usize,
    text: String,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn next_token(&mut self) -> CoreResult<Token> {
        self.skip_whitespace();
        let offset = self.pos;

        let Some(c) = self.current() else {
            return Ok(Token {
                kind: TokKind::Eof,
                offset,
                text: String::new(),
            });
        };

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.lex_ident(offset));
        }
        if c.is_ascii_digit() || (c == '-' && self.peek().is_some_and(|d| d.is_ascii_digit())) {
            return self.lex_number(offset);
        }
        if c == '"' {
            return self.lex_string(offset);
        }

        let token = |kind, text: &str| Token {
            kind,
            offset,
            text: text.to_owned(),
        };

        match c {
            '&' => {
                self.advance();
                if self.current() == Some('&') {
                    self.advance();
                    Ok(token(TokKind::AndAnd, "&&"))
                } else {
                    Err(CoreError::parse("&", offset, "expected `&&`"))
                }
            }
            '|' => {
                self.advance();
                if self.current() == Some('|') {
                    self.advance();
                    Ok(token(TokKind::OrOr, "||"))
                } else {
                    Err(CoreError::parse("|", offset, "expected `||`"))
                }
            }
            '=' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Ok(token(TokKind::EqEq, "=="))
                } else {
                    Err(CoreError::parse("=", offset, "expected `==`"))
                }
            }
            '!' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Ok(token(TokKind::NotEq, "!="))
                } else {
                    Ok(token(TokKind::Bang, "!"))
                }
            }
            '<' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Ok(token(TokKind::Le, "<="))
                } else {
                    Ok(token(TokKind::Lt, "<"))
                }
            }
            '>' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Ok(token(TokKind::Ge, ">="))
                } else {
                    Ok(token(TokKind::Gt, ">"))
                }
            }
            '(' => {
                self.advance();
                Ok(token(TokKind::LParen, "("))
            }
            ')' => {
                self.advance();
                Ok(token(TokKind::RParen, ")"))
            }
            ',' => {
                self.advance();
                Ok(token(TokKind::Comma, ","))
            }
            other => Err(CoreError::parse(
                other.to_string(),
                offset,
                "unexpected character",
            )),
        }
    }

    fn lex_ident(&mut self, offset: usize) -> Token {
        let mut text = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match text.as_str() {
            "true" => TokKind::True,
            "false" => TokKind::False,
            "null" => TokKind::Null,
            _ => TokKind::Ident(text.clone()),
        };
        Token { kind, offset, text }
    }

    fn lex_number(&mut self, offset: usize) -> CoreResult<Token> {
        let mut text = String::new();
        if self.current() == Some('-') {
            text.push('-');
            self.advance();
        }
        let mut is_float = false;
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else if c == '.' && !is_float && self.peek().is_some_and(|d| d.is_ascii_digit()) {
                is_float = true;
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| CoreError::parse(text.clone(), offset, "invalid number"))?;
            TokKind::Float(value)
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| CoreError::parse(text.clone(), offset, "invalid number"))?;
            TokKind::Int(value)
        };
        Ok(Token { kind, offset, text })
    }

    fn lex_string(&mut self, offset: usize) -> CoreResult<Token> {
        // Opening quote.
        self.advance();
        let mut value = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    let text = format!("\"{value}\"");
                    return Ok(Token {
                        kind: TokKind::Str(value),
                        offset,
                        text,
                    });
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some(escaped @ ('"' | '\\')) => {
                            value.push(escaped);
                            self.advance();
                        }
                        _ => {
                            return Err(CoreError::parse(
                                format!("\"{value}\\"),
                                offset,
                                "invalid escape sequence",
                            ))
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    return Err(CoreError::parse(
                        format!("\"{value}"),
                        offset,
                        "unterminated string",
                    ))
                }
            }
        }
    }
}

struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    fn new(input: &str) -> CoreResult<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> CoreResult<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> CoreError {
        if self.current.kind == TokKind::Eof {
            CoreError::parse("<end of input>", self.current.offset, format!("expected {expected}"))
        } else {
            CoreError::parse(
                self.current.text.clone(),
                self.current.offset,
                format!("expected {expected}"),
            )
        }
    }

    // expr := and ( '||' and )*
    fn parse_or(&mut self) -> CoreResult<FilterExpr> {
        let mut left = self.parse_and()?;
        while self.current.kind == TokKind::OrOr {
            self.advance()?;
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // and := unary ( '&&' unary )*
    fn parse_and(&mut self) -> CoreResult<FilterExpr> {
        let mut left = self.parse_unary()?;
        while self.current.kind == TokKind::AndAnd {
            self.advance()?;
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // unary := '!' unary | primary
    fn parse_unary(&mut self) -> CoreResult<FilterExpr> {
        if self.current.kind == TokKind::Bang {
            self.advance()?;
            let inner = self.parse_unary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    // primary := '(' expr ')' | ident op literal
    fn parse_primary(&mut self) -> CoreResult<FilterExpr> {
        match self.current.kind.clone() {
            TokKind::LParen => {
                self.advance()?;
                let inner = self.parse_or()?;
                if self.current.kind != TokKind::RParen {
                    return Err(self.unexpected("`)`"));
                }
                self.advance()?;
                Ok(inner)
            }
            TokKind::Ident(field) => {
                let offset = self.current.offset;
                self.advance()?;
                let op = self.parse_cmp_op()?;
                let value = self.parse_literal()?;
                Ok(FilterExpr::Compare {
                    field,
                    offset,
                    op,
                    value,
                })
            }
            _ => Err(self.unexpected("field name or `(`")),
        }
    }

    fn parse_cmp_op(&mut self) -> CoreResult<CmpOp> {
        let op = match self.current.kind {
            TokKind::EqEq => CmpOp::Eq,
            TokKind::NotEq => CmpOp::Ne,
            TokKind::Lt => CmpOp::Lt,
            TokKind::Le => CmpOp::Le,
            TokKind::Gt => CmpOp::Gt,
            TokKind::Ge => CmpOp::Ge,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance()?;
        Ok(op)
    }

    fn parse_literal(&mut self) -> CoreResult<Literal> {
        let literal = match &self.current.kind {
            TokKind::Str(s) => Literal::Str(s.clone()),
            TokKind::Int(i) => Literal::Int(*i),
            TokKind::Float(f) => Literal::Float(*f),
            TokKind::True => Literal::Bool(true),
            TokKind::False => Literal::Bool(false),
            TokKind::Null => Literal::Null,
            _ => return Err(self.unexpected("literal value")),
        };
        self.advance()?;
        Ok(literal)
    }

    fn expect_eof(&self) -> CoreResult<()> {
        if self.current.kind == TokKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }
}

/// Parses a filter expression.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] naming the offending fragment when the input
/// is malformed or empty.
pub fn parse_filter(input: &str) -> CoreResult<FilterExpr> {
    if input.trim().is_empty() {
        return Err(CoreError::parse(input, 0, "empty filter expression"));
    }
    let mut parser = Parser::new(input)?;
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

/// Parses a sort spec: `field (asc|desc)?` keys separated by commas.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] naming the offending fragment when the input
/// is malformed or empty.
pub fn parse_sort(input: &str) -> CoreResult<SortExpr> {
    if input.trim().is_empty() {
        return Err(CoreError::parse(input, 0, "empty sort expression"));
    }
    let mut parser = Parser::new(input)?;
    let mut keys = Vec::new();

    loop {
        let TokKind::Ident(field) = parser.current.kind.clone() else {
            return Err(parser.unexpected("field name"));
        };
        let offset = parser.current.offset;
        parser.advance()?;

        let dir = match parser.current.kind.clone() {
            TokKind::Ident(word) if word == "asc" => {
                parser.advance()?;
                SortDir::Asc
            }
            TokKind::Ident(word) if word == "desc" => {
                parser.advance()?;
                SortDir::Desc
            }
            TokKind::Ident(_) => return Err(parser.unexpected("`asc` or `desc`")),
            _ => SortDir::Asc,
        };
        keys.push(SortKey { field, offset, dir });

        match parser.current.kind {
            TokKind::Comma => parser.advance()?,
            TokKind::Eof => break,
            _ => return Err(parser.unexpected("`,` or end of expression")),
        }
    }

    Ok(SortExpr { keys })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_comparison() {
        let expr = parse_filter("status == \"active\"").unwrap();
        assert_eq!(
            expr,
            FilterExpr::Compare {
                field: "status".into(),
                offset: 0,
                op: CmpOp::Eq,
                value: Literal::Str("active".into()),
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_filter("a == 1 || b == 2 && c == 3").unwrap();
        assert!(matches!(expr, FilterExpr::Or(_, _)));
        if let FilterExpr::Or(_, right) = expr {
            assert!(matches!(*right, FilterExpr::And(_, _)));
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse_filter("(a == 1 || b == 2) && c == 3").unwrap();
        assert!(matches!(expr, FilterExpr::And(_, _)));
    }

    #[test]
    fn parses_negation_and_literals() {
        let expr = parse_filter("!(done == true) && score >= -1.5 && tag != null").unwrap();
        assert!(matches!(expr, FilterExpr::And(_, _)));
    }

    #[test]
    fn single_equals_is_a_parse_error() {
        let err = parse_filter("status = ").unwrap_err();
        match err {
            crate::CoreError::Parse {
                fragment, offset, ..
            } => {
                assert_eq!(fragment, "=");
                assert_eq!(offset, 7);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_literal_is_a_parse_error() {
        let err = parse_filter("age >=").unwrap_err();
        assert!(matches!(err, crate::CoreError::Parse { .. }));
    }

    #[test]
    fn trailing_input_is_a_parse_error() {
        let err = parse_filter("a == 1 b == 2").unwrap_err();
        match err {
            crate::CoreError::Parse { fragment, .. } => assert_eq!(fragment, "b"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_is_a_parse_error() {
        let err = parse_filter("name == \"alice").unwrap_err();
        assert!(matches!(err, crate::CoreError::Parse { .. }));
    }

    #[test]
    fn empty_filter_is_a_parse_error() {
        assert!(parse_filter("   ").is_err());
    }

    #[test]
    fn parses_sort_spec() {
        let sort = parse_sort("name asc, created_at desc, id").unwrap();
        assert_eq!(sort.keys.len(), 3);
        assert_eq!(sort.keys[0].dir, SortDir::Asc);
        assert_eq!(sort.keys[1].dir, SortDir::Desc);
        assert_eq!(sort.keys[2].dir, SortDir::Asc);
    }

    #[test]
    fn bad_sort_direction_is_a_parse_error() {
        let err = parse_sort("name sideways").unwrap_err();
        match err {
            crate::CoreError::Parse { fragment, .. } => assert_eq!(fragment, "sideways"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
