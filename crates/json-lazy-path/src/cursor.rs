//! Character cursor over text or a line-buffered reader.

use std::borrow::Cow;
use std::io::{self, BufRead};

enum Source<'a> {
    Text,
    Reader(Box<dyn BufRead + 'a>),
}

/// Streaming cursor with line and column tracking.
///
/// Reader input is pulled one line at a time. Each line keeps its newline,
/// so whitespace and `//` comments behave the same for both sources.
pub struct Cursor<'a> {
    source: Source<'a>,
    chunk: Cow<'a, str>,
    pos: usize,
    line: usize,
    column: usize,
    error: Option<io::Error>,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            source: Source::Text,
            chunk: Cow::Borrowed(text),
            pos: 0,
            line: 0,
            column: 0,
            error: None,
        }
    }

    pub fn from_reader(reader: impl BufRead + 'a) -> Self {
        Self {
            source: Source::Reader(Box::new(reader)),
            chunk: Cow::Borrowed(""),
            pos: 0,
            line: 0,
            column: 0,
            error: None,
        }
    }

    /// True while characters remain.
    pub fn valid(&mut self) -> bool {
        if self.pos < self.chunk.len() {
            return true;
        }
        let Source::Reader(reader) = &mut self.source else {
            return false;
        };
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => false,
            Ok(_) => {
                self.chunk = Cow::Owned(line);
                self.pos = 0;
                true
            }
            Err(e) => {
                self.error = Some(e);
                self.source = Source::Text;
                false
            }
        }
    }

    pub fn peek(&mut self) -> Option<char> {
        if !self.valid() {
            return None;
        }
        self.chunk[self.pos..].chars().next()
    }

    pub fn get(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Whether the character after the current one is `ch`.
    pub fn check_ahead(&mut self, ch: char) -> bool {
        if !self.valid() {
            return false;
        }
        self.chunk[self.pos..].chars().nth(1) == Some(ch)
    }

    /// Skip whitespace and `//` line comments.
    pub fn skip_nonessential(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.get();
                }
                Some('/') if self.check_ahead('/') => {
                    while let Some(c) = self.get() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Consume `ch` surrounded by nonessential text. Returns whether it was
    /// there.
    pub fn separator(&mut self, ch: char) -> bool {
        self.skip_nonessential();
        if self.peek() == Some(ch) {
            self.get();
            self.skip_nonessential();
            true
        } else {
            false
        }
    }

    /// 1-based line and column of the current character.
    pub fn position(&self) -> (usize, usize) {
        (self.line + 1, self.column + 1)
    }

    /// Take the read error that ended the input early, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}
