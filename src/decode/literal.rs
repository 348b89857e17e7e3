//! Restricted literal reader for crate sections.
//!
//! Accepts only what the index format uses: quoted strings, integers, arrays and
//! `null`. Anything else, including identifiers, calls, objects and floats, is an
//! error at the offending byte. The text is never evaluated.

use crate::error::DecodeError;

/// Maximum array nesting. The format needs three levels.
const MAX_DEPTH: usize = 64;

/// A parsed literal with the absolute byte offset it started at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) pos: usize,
    pub(crate) value: Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Literal {
    Str(String),
    Int(i64),
    Array(Vec<Node>),
    Null,
}

impl Literal {
    pub(crate) const fn describe(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Array(_) => "array",
            Self::Null => "null",
        }
    }
}

/// Parse exactly one literal from `text`, which starts at absolute offset `base`.
///
/// Trailing non-whitespace is rejected.
pub(crate) fn parse(text: &str, base: usize) -> Result<Node, DecodeError> {
    let mut reader = Reader {
        bytes: text.as_bytes(),
        text,
        pos: 0,
        base,
    };
    let node = reader.value(0)?;
    reader.skip_whitespace();
    if reader.pos < reader.bytes.len() {
        return Err(reader.error("unexpected content after value"));
    }
    Ok(node)
}

struct Reader<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
    base: usize,
}

impl Reader<'_> {
    fn error(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::new(self.base + self.pos, reason)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn value(&mut self, depth: usize) -> Result<Node, DecodeError> {
        self.skip_whitespace();
        let pos = self.base + self.pos;

        let value = match self.peek() {
            Some(b'[') => self.array(depth)?,
            Some(quote @ (b'"' | b'\'')) => Literal::Str(self.string(quote)?),
            Some(b'-' | b'0'..=b'9') => Literal::Int(self.integer()?),
            Some(b'n') if self.bytes[self.pos..].starts_with(b"null") => {
                self.pos += 4;
                if self.peek().is_some_and(is_ident_byte) {
                    return Err(self.error("unexpected identifier"));
                }
                Literal::Null
            }
            Some(_) => return Err(self.unexpected()),
            None => return Err(self.error("unexpected end of input")),
        };

        Ok(Node { pos, value })
    }

    fn unexpected(&self) -> DecodeError {
        let found = self.text[self.pos..].chars().next().unwrap_or('?');
        if found.is_alphabetic() || found == '_' || found == '$' {
            self.error("unexpected identifier; executable content is not accepted")
        } else {
            self.error(format!("unexpected character {:?}", found))
        }
    }

    fn array(&mut self, depth: usize) -> Result<Literal, DecodeError> {
        if depth >= MAX_DEPTH {
            return Err(self.error("arrays nested too deeply"));
        }
        self.pos += 1;

        let mut elements = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Literal::Array(elements));
        }

        loop {
            elements.push(self.value(depth + 1)?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Literal::Array(elements));
                }
                Some(_) => return Err(self.error("expected ',' or ']'")),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn integer(&mut self) -> Result<i64, DecodeError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits {
            return Err(self.error("expected digits"));
        }
        if matches!(self.peek(), Some(b'.' | b'e' | b'E')) {
            return Err(self.error("non-integer numbers are not part of the index format"));
        }
        if self.peek().is_some_and(is_ident_byte) {
            return Err(self.error("unexpected identifier"));
        }

        self.text[start..self.pos].parse::<i64>().map_err(|_| {
            DecodeError::new(self.base + start, "integer out of range")
        })
    }

    fn string(&mut self, quote: u8) -> Result<String, DecodeError> {
        let open = self.pos;
        self.pos += 1;
        let mut out = String::new();

        loop {
            let Some(b) = self.peek() else {
                return Err(DecodeError::new(self.base + open, "unterminated string"));
            };
            match b {
                b if b == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                b'\\' => {
                    self.pos += 1;
                    self.escape(&mut out)?;
                }
                b'\n' | b'\r' => return Err(self.error("line break inside string")),
                _ => {
                    // Copy the whole run up to the next special byte; quotes and
                    // backslashes are ASCII so the slice stays on char boundaries.
                    let start = self.pos;
                    while self
                        .peek()
                        .is_some_and(|b| b != quote && !matches!(b, b'\\' | b'\n' | b'\r'))
                    {
                        self.pos += 1;
                    }
                    out.push_str(&self.text[start..self.pos]);
                }
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), DecodeError> {
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated escape"));
        };
        self.pos += 1;
        let ch = match b {
            b'"' => '"',
            b'\'' => '\'',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => self.unicode_escape()?,
            _ => {
                self.pos -= 1;
                return Err(self.error("unsupported escape sequence"));
            }
        };
        out.push(ch);
        Ok(())
    }

    fn hex4(&mut self) -> Result<u32, DecodeError> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid \\u escape"))?;
        let value = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid \\u escape"))?;
        self.pos += 4;
        Ok(value)
    }

    fn unicode_escape(&mut self) -> Result<char, DecodeError> {
        let start = self.pos;
        let high = self.hex4()?;

        let code = if (0xD800..0xDC00).contains(&high) {
            if !self.bytes[self.pos..].starts_with(b"\\u") {
                return Err(DecodeError::new(self.base + start, "unpaired surrogate"));
            }
            self.pos += 2;
            let low = self.hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(DecodeError::new(self.base + start, "unpaired surrogate"));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };

        char::from_u32(code).ok_or_else(|| DecodeError::new(self.base + start, "invalid code point"))
    }
}

const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}
