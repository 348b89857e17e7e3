//! Locating per-crate value spans inside the fetched script.
//!
//! Only the bracketed value following a recognised assignment is handed to the
//! literal reader. Assignments that appear inside comments or string literals do
//! not count, and everything after the last section is ignored.

use crate::error::DecodeError;
use regex::Regex;
use std::sync::LazyLock;

/// `searchIndex["std"] = ` or `searchIndex.set("std", `, either quote style.
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"searchIndex\s*(?:\[\s*["'](?P<index>[A-Za-z0-9_\-]+)["']\s*\]\s*=|\.set\(\s*["'](?P<set>[A-Za-z0-9_\-]+)["']\s*,)\s*"#,
    )
    .expect("assignment pattern is valid")
});

/// One crate's raw value text and where it starts in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Section<'a> {
    pub(crate) crate_name: &'a str,
    pub(crate) start: usize,
    pub(crate) text: &'a str,
}

/// Find every crate section in `text`, in order of appearance.
///
/// A crate assigned twice keeps its first position but takes the later value.
pub(crate) fn sections(text: &str) -> Result<Vec<Section<'_>>, DecodeError> {
    let mut found: Vec<Section<'_>> = Vec::new();
    let mut lexer = Lexer::new(text);

    for caps in ASSIGNMENT.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() < lexer.pos || !lexer.is_code_at(whole.start()) {
            continue;
        }

        let Some(name) = caps.name("index").or_else(|| caps.name("set")) else {
            continue;
        };
        let name = name.as_str();

        let start = whole.end();
        let end = matching_bracket(text, start)?;
        lexer.pos = end;

        let section = Section {
            crate_name: name,
            start,
            text: &text[start..end],
        };

        if let Some(existing) = found.iter_mut().find(|s| s.crate_name == name) {
            tracing::debug!(crate_name = name, "Crate section assigned twice, keeping the later value");
            *existing = section;
        } else {
            found.push(section);
        }
    }

    Ok(found)
}

/// Given the offset of an opening `[`, return the offset just past its matching `]`.
fn matching_bracket(text: &str, start: usize) -> Result<usize, DecodeError> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'[') {
        return Err(DecodeError::new(start, "expected '[' to start crate section"));
    }

    let mut depth = 0usize;
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos + 1);
                }
            }
            quote @ (b'"' | b'\'') => pos = skip_string(bytes, pos, quote),
            _ => {}
        }
        pos += 1;
    }

    Err(DecodeError::new(start, "unterminated crate section"))
}

/// Return the offset of the closing quote (or the last byte if unterminated).
fn skip_string(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut pos = open + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 1,
            b if b == quote => return pos,
            _ => {}
        }
        pos += 1;
    }
    bytes.len().saturating_sub(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Str(u8),
    /// Regex literal; `class` is set inside `[...]`, where `/` does not end it.
    Regex { class: bool },
    LineComment,
    BlockComment,
}

/// Incremental scanner tracking whether a byte offset is in code, a string, a
/// regex literal or a comment.
struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    state: State,
    /// Last significant byte seen in code, to tell a regex `/` from division.
    last: Option<u8>,
}

/// A `/` starts a regex literal after an operator or opening punctuation, and is
/// division after an operand. Keywords such as `return /x/` are not recognised.
fn regex_can_follow(last: Option<u8>) -> bool {
    last.is_none_or(|b| b"(,=:[!&|?{};+-*%<>~^".contains(&b))
}

impl<'a> Lexer<'a> {
    const fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            state: State::Code,
            last: None,
        }
    }

    /// Advance to `target` and report whether it lies in plain code.
    fn is_code_at(&mut self, target: usize) -> bool {
        while self.pos < target {
            let b = self.bytes[self.pos];
            let next = self.bytes.get(self.pos + 1).copied();
            match self.state {
                State::Code => match (b, next) {
                    (b'/', Some(b'/')) => {
                        self.state = State::LineComment;
                        self.pos += 1;
                    }
                    (b'/', Some(b'*')) => {
                        self.state = State::BlockComment;
                        self.pos += 1;
                    }
                    (b'/', _) if regex_can_follow(self.last) => {
                        self.state = State::Regex { class: false };
                    }
                    (b'"' | b'\'' | b'`', _) => self.state = State::Str(b),
                    _ if b.is_ascii_whitespace() => {}
                    _ => self.last = Some(b),
                },
                State::Str(quote) => {
                    if b == b'\\' {
                        self.pos += 1;
                    } else if b == quote {
                        self.state = State::Code;
                        self.last = Some(quote);
                    }
                }
                State::Regex { class } => match b {
                    b'\\' => self.pos += 1,
                    b'[' => self.state = State::Regex { class: true },
                    b']' => self.state = State::Regex { class: false },
                    b'/' if !class => {
                        self.state = State::Code;
                        // A finished literal is an operand, like a closing quote.
                        self.last = Some(b'"');
                    }
                    // Regex literals cannot span lines; bail out rather than swallow code.
                    b'\n' => self.state = State::Code,
                    _ => {}
                },
                State::LineComment => {
                    if b == b'\n' {
                        self.state = State::Code;
                    }
                }
                State::BlockComment => {
                    if b == b'*' && next == Some(b'/') {
                        self.state = State::Code;
                        self.pos += 1;
                    }
                }
            }
            self.pos += 1;
        }
        self.state == State::Code && self.pos == target
    }
}
