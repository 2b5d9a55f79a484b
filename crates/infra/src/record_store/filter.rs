//! Record filter expressions.
//!
//! The supported language is deliberately tiny: equality/inequality
//! comparisons joined by `&&`.
//!
//! ```text
//! type = 'low_stock' && product = {:product_id}
//! ```
//!
//! Operands are field names (`id`, `created`, `updated` included), string
//! literals in single or double quotes, numbers, `true`, `false`, `null`, or
//! named placeholders `{:name}` bound from [`FilterParams`]. Placeholders are
//! substituted as values, never spliced into the expression text.

use std::collections::BTreeMap;
use std::ops::Range;

use chumsky::Stream;
use chumsky::prelude::*;
use serde_json::Value as JsonValue;
use thiserror::Error;

use shopfront_core::Record;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unterminated string literal starting at {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid number '{text}' at {pos}")]
    InvalidNumber { pos: usize, text: String },

    #[error("expected {expected} at {pos}")]
    Expected { pos: usize, expected: &'static str },

    #[error("placeholder {{:{0}}} has no bound value")]
    UnboundParam(String),
}

/// Named values substituted into `{:name}` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParams(BTreeMap<String, JsonValue>);

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder (builder-style).
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_json::Map<String, JsonValue>> for FilterParams {
    fn from(map: serde_json::Map<String, JsonValue>) -> Self {
        Self(map.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Field(String),
    Literal(JsonValue),
    Param(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Op {
    Eq,
    Neq,
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    left: Operand,
    op: Op,
    right: Operand,
}

/// A parsed (not yet bound) filter expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

/// A filter with every placeholder resolved; ready to match records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundFilter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Parse an expression. An empty (or all-whitespace) expression matches everything.
    pub fn parse(expr: &str) -> Result<Self, FilterError> {
        let tokens = lex(expr)?;
        if tokens.is_empty() {
            return Ok(Self::default());
        }

        let eoi = expr.chars().count();
        conditions()
            .parse(Stream::from_iter(eoi..eoi + 1, tokens.into_iter()))
            .map(|conditions| Self { conditions })
            .map_err(|errors| {
                let (pos, label) = errors
                    .first()
                    .map_or((eoi, None), |e| (e.span().start, e.label()));
                FilterError::Expected {
                    pos,
                    expected: label.unwrap_or("'&&'"),
                }
            })
    }

    /// Resolve placeholders against `params`.
    pub fn bind(&self, params: &FilterParams) -> Result<BoundFilter, FilterError> {
        let resolve = |o: &Operand| -> Result<Operand, FilterError> {
            match o {
                Operand::Param(name) => params
                    .get(name)
                    .cloned()
                    .map(Operand::Literal)
                    .ok_or_else(|| FilterError::UnboundParam(name.clone())),
                other => Ok(other.clone()),
            }
        };

        let conditions = self
            .conditions
            .iter()
            .map(|c| {
                Ok(Condition {
                    left: resolve(&c.left)?,
                    op: c.op,
                    right: resolve(&c.right)?,
                })
            })
            .collect::<Result<Vec<_>, FilterError>>()?;

        Ok(BoundFilter { conditions })
    }
}

impl BoundFilter {
    /// Parse and bind in one step.
    pub fn compile(expr: &str, params: &FilterParams) -> Result<Self, FilterError> {
        Filter::parse(expr)?.bind(params)
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| {
            let left = operand_value(&c.left, record);
            let right = operand_value(&c.right, record);
            let equal = values_match(&left, &right);
            match c.op {
                Op::Eq => equal,
                Op::Neq => !equal,
            }
        })
    }
}

fn operand_value(operand: &Operand, record: &Record) -> JsonValue {
    match operand {
        Operand::Field(name) => record.value_of(name).unwrap_or(JsonValue::Null),
        Operand::Literal(v) => v.clone(),
        // Unreachable after `bind`; treat as null to stay total.
        Operand::Param(_) => JsonValue::Null,
    }
}

/// Equality with the store's coercions: numbers compare numerically, a
/// missing/null value equals `""`, and an array equals any scalar it contains.
fn values_match(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Array(items), scalar) if !scalar.is_array() => {
            items.iter().any(|i| values_match(i, scalar))
        }
        (scalar, JsonValue::Array(items)) if !scalar.is_array() => {
            items.iter().any(|i| values_match(scalar, i))
        }
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        (JsonValue::Null, JsonValue::String(s)) | (JsonValue::String(s), JsonValue::Null) => s.is_empty(),
        (x, y) => x == y,
    }
}

type Span = Range<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    /// `f64` bits, so tokens stay `Eq + Hash`.
    Float(u64),
    Param(String),
    Eq,
    Neq,
    And,
}

/// A lexed token, or the lexical error found where it should have been.
type Lexed = Result<(Token, Span), FilterError>;

fn lex(expr: &str) -> Result<Vec<(Token, Span)>, FilterError> {
    let lexed = lexer().parse(expr).map_err(|errors| {
        match errors.into_iter().next() {
            Some(e) => match e.found() {
                Some(&ch) => FilterError::UnexpectedChar { pos: e.span().start, ch },
                None => FilterError::Expected {
                    pos: e.span().start,
                    expected: "token",
                },
            },
            None => FilterError::Expected { pos: 0, expected: "token" },
        }
    })?;
    lexed.into_iter().collect()
}

fn lexer() -> impl Parser<char, Vec<Lexed>, Error = Simple<char>> {
    let symbol = choice((
        just('=').to(Token::Eq),
        just('!').then(just('=')).to(Token::Neq),
        just('&').then(just('&')).to(Token::And),
    ))
    .map_with_span(|tok, span: Span| Lexed::Ok((tok, span)));

    let param = just('{')
        .then(just(':'))
        .ignore_then(
            filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated()
                .collect::<String>(),
        )
        .then(just('}').or_not())
        .map_with_span(|(name, close), span: Span| {
            if close.is_some() && !name.is_empty() {
                Ok((Token::Param(name), span))
            } else {
                Err(FilterError::Expected {
                    pos: span.start + 2 + name.chars().count(),
                    expected: "placeholder name followed by '}'",
                })
            }
        });

    let number = just('-')
        .or(filter(char::is_ascii_digit))
        .chain::<char, _, _>(filter(|c: &char| c.is_ascii_digit() || *c == '.').repeated())
        .collect::<String>()
        .map_with_span(|text, span: Span| match number_token(&text) {
            Some(tok) => Ok((tok, span)),
            None => Err(FilterError::InvalidNumber { pos: span.start, text }),
        });

    let word = filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .chain::<char, _, _>(
            filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '.').repeated(),
        )
        .collect::<String>()
        .map_with_span(|w, span: Span| Lexed::Ok((Token::Ident(w), span)));

    let token = choice((symbol, quoted('\''), quoted('"'), param, number, word));

    text::whitespace()
        .ignore_then(token.then_ignore(text::whitespace()).repeated())
        .then_ignore(end())
}

/// String literal in `quote`s; `\<quote>` escapes the quote.
fn quoted(quote: char) -> impl Parser<char, Lexed, Error = Simple<char>> {
    let escaped = just('\\').ignore_then(just(quote));
    let plain = filter(move |c: &char| *c != quote);

    just(quote)
        .ignore_then(escaped.or(plain).repeated().collect::<String>())
        .then(just(quote).or_not())
        .map_with_span(|(text, close), span: Span| match close {
            Some(_) => Ok((Token::Str(text), span)),
            None => Err(FilterError::UnterminatedString { pos: span.start }),
        })
}

fn number_token(text: &str) -> Option<Token> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(Token::Int(n));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| Token::Float(f.to_bits()))
}

fn operand() -> impl Parser<Token, Operand, Error = Simple<Token>> {
    select! {
        Token::Ident(word) => match word.as_str() {
            "true" => Operand::Literal(JsonValue::Bool(true)),
            "false" => Operand::Literal(JsonValue::Bool(false)),
            "null" => Operand::Literal(JsonValue::Null),
            _ => Operand::Field(word),
        },
        Token::Str(s) => Operand::Literal(JsonValue::String(s)),
        Token::Int(n) => Operand::Literal(JsonValue::from(n)),
        Token::Float(bits) => Operand::Literal(JsonValue::from(f64::from_bits(bits))),
        Token::Param(name) => Operand::Param(name),
    }
    .labelled("operand")
}

fn conditions() -> impl Parser<Token, Vec<Condition>, Error = Simple<Token>> {
    let op = select! {
        Token::Eq => Op::Eq,
        Token::Neq => Op::Neq,
    }
    .labelled("'=' or '!='");

    operand()
        .then(op)
        .then(operand())
        .map(|((left, op), right)| Condition { left, op, right })
        .separated_by(just(Token::And))
        .at_least(1)
        .then_ignore(end())
}
