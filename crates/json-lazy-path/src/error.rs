//! Error types.
//!
//! Failures are split by the stage that raises them: [`ParseError`] for
//! syntax, [`ValueError`] for node construction and [`EvalError`] for
//! reference resolution and lookups. [`Error`] wraps all of them.

use std::panic::Location;

use thiserror::Error;

use crate::types::Kind;

/// What went wrong while reading text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("empty input")]
    Empty,
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("trailing characters after value")]
    TrailingCharacters,
    #[error("invalid json")]
    InvalidToken,
    #[error("leading zero is not allowed")]
    LeadingZero,
    #[error("expected digit")]
    ExpectedDigit,
    #[error("expected digit after decimal point")]
    ExpectedFractionDigit,
    #[error("expected digit in exponent")]
    ExpectedExponentDigit,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,
    #[error("unescaped control character in string")]
    ControlCharacter,
    #[error("unclosed string")]
    UnclosedString,
    #[error("expected string key")]
    ExpectedKey,
    #[error("expected ':' after key")]
    ExpectedColon,
    #[error("expected one more item")]
    TrailingComma,
    #[error("expected '{0}' before end of input")]
    Unclosed(char),
    #[error("expected ',' or '{0}'")]
    ExpectedDelimiter(char),
    #[error("expected path")]
    ExpectedPath,
    #[error("invalid const accessor")]
    InvalidAccessor,
    #[error("nesting is too deep")]
    TooDeep,
}

/// Syntax error with a 1-based position.
///
/// Debug builds also record the parser call site that raised it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}{}", describe_found(.found, .origin))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
    pub found: Option<char>,
    pub origin: Option<&'static Location<'static>>,
}

impl ParseError {
    #[track_caller]
    pub fn new(kind: ParseErrorKind, line: usize, column: usize, found: Option<char>) -> Self {
        let origin = if cfg!(debug_assertions) {
            Some(Location::caller())
        } else {
            None
        };
        Self {
            kind,
            line,
            column,
            found,
            origin,
        }
    }
}

fn describe_found(found: &Option<char>, origin: &Option<&'static Location<'static>>) -> String {
    let mut out = String::new();
    match found {
        Some(c) => out.push_str(&format!(" (found {c:?})")),
        None => out.push_str(" (found end of input)"),
    }
    if let Some(loc) = origin {
        out.push_str(&format!(" [{}:{}]", loc.file(), loc.line()));
    }
    out
}

/// Node construction failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("duplicate key {0:?} in object")]
    DuplicateKey(String),
    #[error("malformed real number {0:?}")]
    MalformedReal(String),
    #[error("real number {0} is out of range")]
    RealOutOfRange(String),
    #[error("integer {0} is out of range")]
    IntegerOutOfRange(String),
}

/// Resolution and lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("invalid operand: {anchor} by {item}{}", describe_detail(.detail))]
    InvalidOperand {
        anchor: Kind,
        item: Kind,
        detail: Option<String>,
    },
    #[error("index {index} is out of range for array of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("negative index {0} requires negative indexing")]
    NegativeIndex(i64),
    #[error("key {0:?} not found")]
    KeyNotFound(String),
    #[error("structure is cyclic")]
    CyclicStructure,
    #[error("cyclic reference")]
    CyclicReference,
    #[error("references nest deeper than {0} levels")]
    TooDeep(usize),
    #[error("{0}() of an empty sequence")]
    EmptyReduction(String),
    #[error("{0}() accepts integers only")]
    NotAnInteger(String),
    #[error("{function}() does not accept {kind}")]
    InvalidArgument { function: String, kind: Kind },
    #[error("{0}() cannot take its own container as an argument")]
    RecursiveFunction(String),
    #[error("value still holds unresolved references")]
    Unresolved,
}

impl EvalError {
    /// True for failed index and key lookups.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            EvalError::IndexOutOfRange { .. } | EvalError::NegativeIndex(_) | EvalError::KeyNotFound(_)
        )
    }
}

fn describe_detail(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(" ({d})"),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_eval(&self) -> Option<&EvalError> {
        match self {
            Error::Eval(e) => Some(e),
            _ => None,
        }
    }
}
