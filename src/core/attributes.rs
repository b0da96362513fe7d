//! Attribute parsing for start tags
//!
//! Strict parsing stops at the first problem and reports it. The tokenizer
//! then reparses leniently so the element keeps every attribute that can be
//! recovered: bare names get an empty value and unquoted values run to the
//! next whitespace.

use super::entities::{decode_text, decode_text_strict};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name, prefix included
    pub name: Cow<'a, [u8]>,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        Attribute {
            name: Cow::Borrowed(name),
            value,
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// Owned (name, value) pair, replacing invalid UTF-8
    pub fn to_owned_pair(&self) -> (String, String) {
        (
            String::from_utf8_lossy(&self.name).into_owned(),
            String::from_utf8_lossy(&self.value).into_owned(),
        )
    }
}

/// Position within the raw text between the element name and `>` or `/>`
struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a [u8]) -> Self {
        Cursor { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Skip whitespace; true when no further attribute can follow
    fn at_end(&mut self) -> bool {
        self.take_while(is_whitespace);
        matches!(self.peek(), None | Some(b'/') | Some(b'>'))
    }

    fn name(&mut self) -> Option<&'a [u8]> {
        if !self.peek().is_some_and(is_name_start_char) {
            return None;
        }
        Some(self.take_while(is_name_char))
    }

    /// Consume `=` with the whitespace around it
    fn equals(&mut self) -> bool {
        self.take_while(is_whitespace);
        if self.peek() != Some(b'=') {
            return false;
        }
        self.pos += 1;
        self.take_while(is_whitespace);
        true
    }

    /// A quoted value without its quotes, and whether the closing quote was
    /// found. `None` when the value does not start with a quote.
    fn quoted(&mut self) -> Option<(&'a [u8], bool)> {
        let quote = self.peek().filter(|&b| b == b'"' || b == b'\'')?;
        let start = self.pos + 1;
        match memchr(quote, &self.input[start..]) {
            Some(len) => {
                self.pos = start + len + 1;
                Some((&self.input[start..start + len], true))
            }
            None => {
                self.pos = self.input.len();
                Some((&self.input[start..], false))
            }
        }
    }
}

/// Parse attributes, recovering from anything malformed
pub fn parse_attributes(input: &[u8]) -> Vec<Attribute<'_>> {
    let mut cursor = Cursor::new(input);
    let mut attrs = Vec::new();

    while !cursor.at_end() {
        let Some(name) = cursor.name() else {
            cursor.pos += 1;
            continue;
        };
        let value = if !cursor.equals() {
            Cow::Borrowed(&b""[..])
        } else if let Some((raw, _)) = cursor.quoted() {
            decode_text(raw)
        } else {
            decode_text(cursor.take_while(|b| !is_whitespace(b) && b != b'/' && b != b'>'))
        };
        attrs.push(Attribute::new(name, value));
    }
    attrs
}

/// Parse attributes, failing on the first well-formedness error
pub fn parse_attributes_strict(input: &[u8]) -> Result<Vec<Attribute<'_>>, &'static str> {
    let mut cursor = Cursor::new(input);
    let mut attrs = Vec::new();

    while !cursor.at_end() {
        let name = cursor
            .name()
            .ok_or("Attribute name must start with letter, underscore, or colon")?;
        if !cursor.equals() || cursor.peek().is_none() {
            return Err("Attribute value required");
        }
        let (raw, closed) = cursor.quoted().ok_or("Attribute value must be quoted")?;
        if raw.contains(&b'<') {
            return Err("Attribute value cannot contain '<'");
        }
        if !closed {
            return Err("Attribute value has mismatched quotes");
        }
        attrs.push(Attribute::new(name, decode_text_strict(raw)?));
    }
    Ok(attrs)
}
