//! Recursive-descent parser for JSON and path expressions.
//!
//! Static mode accepts plain JSON. Dynamic mode additionally accepts `$`,
//! `@`, bare identifiers, grouping, function calls and accessor tails, and
//! resolves whatever it can as soon as each value is complete.

use std::io::BufRead;

use tracing::{debug, trace};

use crate::arena::Arena;
use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::{Error, ParseError, ParseErrorKind, ValueError};
use crate::eval::{Resolver, Scope};
use crate::types::*;

pub struct Parser<'s, 'a> {
    cursor: Cursor<'s>,
    arena: &'a mut Arena,
    config: Config,
    depth: usize,
}

impl<'s, 'a> Parser<'s, 'a> {
    pub fn new(arena: &'a mut Arena, text: &'s str, config: Config) -> Self {
        Self {
            cursor: Cursor::new(text),
            arena,
            config,
            depth: 0,
        }
    }

    pub fn from_reader(arena: &'a mut Arena, reader: impl BufRead + 's, config: Config) -> Self {
        Self {
            cursor: Cursor::from_reader(reader),
            arena,
            config,
            depth: 0,
        }
    }

    /// Parse the whole input as one value.
    pub fn parse(mut self, dynamic: bool) -> Result<NodeId, Error> {
        debug!(dynamic, "parsing");
        self.cursor.skip_nonessential();
        if !self.cursor.valid() {
            if let Some(e) = self.cursor.take_error() {
                return Err(Error::Io(e));
            }
            return Err(self.fail(ParseErrorKind::Empty));
        }
        let result = self.value(dynamic);
        if let Some(e) = self.cursor.take_error() {
            return Err(Error::Io(e));
        }
        let id = result?;
        self.cursor.skip_nonessential();
        if self.cursor.valid() {
            return Err(self.fail(ParseErrorKind::TrailingCharacters));
        }
        if let Some(e) = self.cursor.take_error() {
            return Err(Error::Io(e));
        }
        trace!(nodes = self.arena.len(), "parsed");
        Ok(id)
    }

    #[track_caller]
    fn fail(&mut self, kind: ParseErrorKind) -> Error {
        let (line, column) = self.cursor.position();
        let found = self.cursor.peek();
        ParseError::new(kind, line, column, found).into()
    }

    fn descend<T>(
        &mut self,
        inner: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self.depth >= self.config.max_depth {
            return Err(self.fail(ParseErrorKind::TooDeep));
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    fn resolver(&mut self) -> Resolver<'_> {
        Resolver::new(self.arena, self.config)
    }

    // ── Values ────────────────────────────────────────────────────────────

    fn value(&mut self, dynamic: bool) -> Result<NodeId, Error> {
        self.descend(|p| p.expression(dynamic))
    }

    fn expression(&mut self, dynamic: bool) -> Result<NodeId, Error> {
        self.cursor.skip_nonessential();
        let primary = self.primary(dynamic)?;
        if !dynamic {
            return Ok(primary);
        }
        let tail = self.tail()?;
        let target = if tail.is_empty() {
            primary
        } else {
            self.arena.reference(Anchor::Node(primary), tail)
        };
        Ok(self.resolver().resolve(target, Scope::default())?)
    }

    fn primary(&mut self, dynamic: bool) -> Result<NodeId, Error> {
        match self.cursor.peek() {
            None => Err(self.fail(ParseErrorKind::UnexpectedEnd)),
            Some('[') => self.array(dynamic),
            Some('{') => self.object(dynamic),
            Some('"') => {
                let text = self.string()?;
                Ok(self.arena.string(text))
            }
            Some('-' | '0'..='9') => self.number(),
            Some('$') if dynamic => {
                self.cursor.get();
                Ok(self.arena.reference(Anchor::Root, Vec::new()))
            }
            Some('@') if dynamic => {
                self.cursor.get();
                Ok(self.arena.reference(Anchor::Local, Vec::new()))
            }
            Some('(') if dynamic => self.group(),
            Some(c) if is_ident_start(c) => self.keyword(dynamic),
            Some(_) => Err(self.fail(ParseErrorKind::InvalidToken)),
        }
    }

    fn keyword(&mut self, dynamic: bool) -> Result<NodeId, Error> {
        let name = self.identifier();
        match name.as_str() {
            "true" => Ok(self.arena.boolean(true)),
            "false" => Ok(self.arena.boolean(false)),
            "null" => Ok(self.arena.null()),
            _ if !dynamic => Err(self.fail(ParseErrorKind::InvalidToken)),
            _ if self.cursor.peek() == Some('(') => self.call(name),
            _ => {
                let key = self.arena.string(name);
                Ok(self.arena.reference(Anchor::Root, vec![key]))
            }
        }
    }

    fn identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.cursor.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            self.cursor.get();
        }
        name
    }

    fn call(&mut self, name: String) -> Result<NodeId, Error> {
        let args = self.list('(', ')', |p| p.value(true))?;
        Ok(self.arena.function(name, args)?)
    }

    fn group(&mut self) -> Result<NodeId, Error> {
        self.cursor.get();
        let inner = self.value(true)?;
        self.close(')')?;
        Ok(inner)
    }

    fn array(&mut self, dynamic: bool) -> Result<NodeId, Error> {
        let items = self.list('[', ']', |p| p.value(dynamic))?;
        let id = self.arena.array(items);
        if dynamic {
            self.resolver().bind_local(id)?;
        }
        Ok(id)
    }

    fn object(&mut self, dynamic: bool) -> Result<NodeId, Error> {
        let entries = self.list('{', '}', |p| p.entry(dynamic))?;
        let id = self.arena.object(entries)?;
        if dynamic {
            self.resolver().bind_local(id)?;
        }
        Ok(id)
    }

    fn entry(&mut self, dynamic: bool) -> Result<(String, NodeId), Error> {
        if self.cursor.peek() != Some('"') {
            return Err(self.fail(ParseErrorKind::ExpectedKey));
        }
        let key = self.string()?;
        if !self.cursor.separator(':') {
            return Err(self.fail(ParseErrorKind::ExpectedColon));
        }
        let value = self.value(dynamic)?;
        Ok((key, value))
    }

    /// Comma separated items between `open` and `close`. A trailing comma,
    /// a missing comma and a missing `close` are errors.
    fn list<T>(
        &mut self,
        open: char,
        close: char,
        mut item: impl FnMut(&mut Self) -> Result<T, Error>,
    ) -> Result<Vec<T>, Error> {
        let opened = self.cursor.get();
        debug_assert_eq!(opened, Some(open));
        let mut items = Vec::new();
        self.cursor.skip_nonessential();
        if self.cursor.peek() == Some(close) {
            self.cursor.get();
            return Ok(items);
        }
        loop {
            self.cursor.skip_nonessential();
            if self.cursor.peek() == Some(close) {
                return Err(self.fail(ParseErrorKind::TrailingComma));
            }
            items.push(item(self)?);
            if !self.cursor.separator(',') {
                break;
            }
        }
        self.close(close)?;
        Ok(items)
    }

    fn close(&mut self, ch: char) -> Result<(), Error> {
        self.cursor.skip_nonessential();
        match self.cursor.peek() {
            Some(c) if c == ch => {
                self.cursor.get();
                Ok(())
            }
            None => Err(self.fail(ParseErrorKind::Unclosed(ch))),
            Some(_) => Err(self.fail(ParseErrorKind::ExpectedDelimiter(ch))),
        }
    }

    // ── Scalars ───────────────────────────────────────────────────────────

    fn number(&mut self) -> Result<NodeId, Error> {
        let mut text = String::new();
        if self.cursor.peek() == Some('-') {
            text.push('-');
            self.cursor.get();
        }
        match self.cursor.peek() {
            Some('0') => {
                text.push('0');
                self.cursor.get();
                if matches!(self.cursor.peek(), Some(c) if c.is_ascii_digit()) {
                    return Err(self.fail(ParseErrorKind::LeadingZero));
                }
            }
            Some(c) if c.is_ascii_digit() => {
                self.digits(&mut text);
            }
            _ => return Err(self.fail(ParseErrorKind::ExpectedDigit)),
        }

        let mut real = false;
        if self.cursor.peek() == Some('.') {
            real = true;
            text.push('.');
            self.cursor.get();
            if !self.digits(&mut text) {
                return Err(self.fail(ParseErrorKind::ExpectedFractionDigit));
            }
        }
        if let Some(e @ ('e' | 'E')) = self.cursor.peek() {
            real = true;
            text.push(e);
            self.cursor.get();
            if let Some(sign @ ('+' | '-')) = self.cursor.peek() {
                text.push(sign);
                self.cursor.get();
            }
            if !self.digits(&mut text) {
                return Err(self.fail(ParseErrorKind::ExpectedExponentDigit));
            }
        }

        if real {
            let value: Real = text.parse()?;
            Ok(self.arena.real(value))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| ValueError::IntegerOutOfRange(text.clone()))?;
            Ok(self.arena.integer(value))
        }
    }

    fn digits(&mut self, text: &mut String) -> bool {
        let start = text.len();
        while let Some(c) = self.cursor.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.cursor.get();
        }
        text.len() > start
    }

    fn string(&mut self) -> Result<String, Error> {
        self.cursor.get();
        let mut out = String::new();
        loop {
            match self.cursor.get() {
                None => return Err(self.fail(ParseErrorKind::UnclosedString)),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let c = self.escape()?;
                    out.push(c);
                }
                Some(c) if (c as u32) < 0x20 => {
                    return Err(self.fail(ParseErrorKind::ControlCharacter))
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, Error> {
        match self.cursor.get() {
            Some('"') => Ok('"'),
            Some('\\') => Ok('\\'),
            Some('/') => Ok('/'),
            Some('b') => Ok('\u{08}'),
            Some('f') => Ok('\u{0C}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('u') => self.unicode_escape(),
            _ => Err(self.fail(ParseErrorKind::InvalidEscape)),
        }
    }

    fn unicode_escape(&mut self) -> Result<char, Error> {
        let high = self.hex4()?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if self.cursor.get() != Some('\\') || self.cursor.get() != Some('u') {
                return Err(self.fail(ParseErrorKind::InvalidUnicodeEscape));
            }
            let low = self.hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.fail(ParseErrorKind::InvalidUnicodeEscape));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        match char::from_u32(code) {
            Some(c) => Ok(c),
            None => Err(self.fail(ParseErrorKind::InvalidUnicodeEscape)),
        }
    }

    fn hex4(&mut self) -> Result<u32, Error> {
        let mut code = 0;
        for _ in 0..4 {
            match self.cursor.peek().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    code = code * 16 + digit;
                    self.cursor.get();
                }
                None => return Err(self.fail(ParseErrorKind::InvalidUnicodeEscape)),
            }
        }
        Ok(code)
    }

    // ── Accessor tails ────────────────────────────────────────────────────

    fn tail(&mut self) -> Result<Vec<NodeId>, Error> {
        let mut tail = Vec::new();
        loop {
            self.cursor.skip_nonessential();
            let accessor = match self.cursor.peek() {
                Some('.') => self.field()?,
                Some('[') => self.bracket()?,
                Some('{') => self.descend(|p| p.selection())?,
                _ => break,
            };
            tail.push(accessor);
        }
        Ok(tail)
    }

    fn field(&mut self) -> Result<NodeId, Error> {
        self.cursor.get();
        if !matches!(self.cursor.peek(), Some(c) if is_ident_start(c)) {
            return Err(self.fail(ParseErrorKind::InvalidAccessor));
        }
        let name = self.identifier();
        if self.cursor.peek() == Some('(') {
            self.call(name)
        } else {
            Ok(self.arena.string(name))
        }
    }

    /// `[item]` is a plain accessor; `[a, b, ...]` is a set of accessors.
    fn bracket(&mut self) -> Result<NodeId, Error> {
        let items = self.list('[', ']', |p| p.value(true))?;
        match items.len() {
            0 => Err(self.fail(ParseErrorKind::ExpectedPath)),
            1 => Ok(items[0]),
            _ => {
                let members: Vec<NodeId> = items
                    .into_iter()
                    .map(|item| self.arena.reference(Anchor::Accessor, vec![item]))
                    .collect();
                Ok(self.arena.set(members, false))
            }
        }
    }

    /// `{.a, [0].b, ...}`: every member is itself an accessor path.
    fn selection(&mut self) -> Result<NodeId, Error> {
        let members = self.list('{', '}', |p| p.selection_member())?;
        if members.is_empty() {
            return Err(self.fail(ParseErrorKind::ExpectedPath));
        }
        Ok(self.arena.set(members, false))
    }

    fn selection_member(&mut self) -> Result<NodeId, Error> {
        let tail = self.tail()?;
        if tail.is_empty() {
            return Err(self.fail(ParseErrorKind::ExpectedPath));
        }
        Ok(self.arena.reference(Anchor::Accessor, tail))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, dynamic: bool) -> Result<(Arena, NodeId), Error> {
        let mut arena = Arena::new();
        let id = Parser::new(&mut arena, text, Config::default()).parse(dynamic)?;
        Ok((arena, id))
    }

    fn kind_of(text: &str, dynamic: bool) -> ParseErrorKind {
        match parse(text, dynamic) {
            Err(Error::Parse(e)) => e.kind,
            Err(other) => panic!("expected parse error for {text:?}, got {other}"),
            Ok(_) => panic!("expected parse error for {text:?}"),
        }
    }

    #[test]
    fn test_static_scalars() {
        let (arena, id) = parse("  42 ", false).unwrap();
        assert_eq!(arena.as_integer(id), Some(42));
        let (arena, id) = parse("true", false).unwrap();
        assert_eq!(arena.as_bool(id), Some(true));
        let (arena, id) = parse("\"a\\tb\"", false).unwrap();
        assert_eq!(arena.as_str(id), Some("a\tb"));
    }

    #[test]
    fn test_number_errors() {
        assert_eq!(kind_of("0123", false), ParseErrorKind::LeadingZero);
        assert_eq!(kind_of("3.", false), ParseErrorKind::ExpectedFractionDigit);
        assert_eq!(kind_of("1.23e", false), ParseErrorKind::ExpectedExponentDigit);
        assert_eq!(kind_of("-", false), ParseErrorKind::ExpectedDigit);
        assert_eq!(kind_of("+", false), ParseErrorKind::InvalidToken);
        assert_eq!(kind_of("4.56xxx", false), ParseErrorKind::TrailingCharacters);
    }

    #[test]
    fn test_integer_overflow() {
        let err = parse("99999999999999999999", false).unwrap_err();
        assert!(matches!(err, Error::Value(ValueError::IntegerOutOfRange(_))));
    }

    #[test]
    fn test_error_position() {
        let err = parse("[1,\n  2,\n  x]", false).unwrap_err();
        let err = err.as_parse().unwrap();
        assert_eq!(err.kind, ParseErrorKind::InvalidToken);
        assert_eq!((err.line, err.column), (3, 4));
    }

    #[test]
    fn test_static_rejects_paths() {
        assert_eq!(kind_of("$.a", false), ParseErrorKind::InvalidToken);
        assert_eq!(kind_of("name", false), ParseErrorKind::InvalidToken);
    }

    #[test]
    fn test_depth_limit() {
        let mut arena = Arena::new();
        let config = Config::default().with_max_depth(4);
        let err = Parser::new(&mut arena, "[[[[[1]]]]]", config)
            .parse(false)
            .unwrap_err();
        assert_eq!(err.as_parse().unwrap().kind, ParseErrorKind::TooDeep);
        let ok = Parser::new(&mut arena, "[[[1]]]", config).parse(false);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_reader_source() {
        let mut arena = Arena::new();
        let text = "{\n  // comment\n  \"a\": [1, 2]\n}\n";
        let id = Parser::from_reader(&mut arena, text.as_bytes(), Config::default())
            .parse(false)
            .unwrap();
        assert_eq!(arena.stringify(id).unwrap(), "{\"a\": [1, 2]}");
    }
}
