//! Push Reader
//!
//! Stateful front end that accepts the document in arbitrary chunks and
//! turns it into [`EventHandler`] calls with bounded buffering: only the
//! tail of a construct cut off by a chunk boundary is kept between feeds.
//! CDATA sections and comments never count as cut off: their content is
//! forwarded (or skipped) piece by piece while the section stays open.

use super::events::EventHandler;
use crate::core::tokenizer::{OpenSection, TokenKind, Tokenizer};

/// Incremental XML reader
pub struct PushReader {
    /// Unconsumed tail of the previous chunks (an incomplete construct)
    buffer: Vec<u8>,
    /// Bytes consumed so far, used to report absolute error offsets
    consumed: usize,
    /// CDATA section or comment left open by the last feed
    section: Option<OpenSection>,
    strict: bool,
}

impl PushReader {
    pub fn new(strict: bool) -> Self {
        PushReader {
            buffer: Vec::new(),
            consumed: 0,
            section: None,
            strict,
        }
    }

    /// Feed a chunk of data, dispatching every event it completes
    pub fn feed<H: EventHandler + ?Sized>(&mut self, chunk: &[u8], handler: &mut H) {
        if self.buffer.is_empty() {
            // Common case: nothing carried over, tokenize the chunk in place
            let used = self.dispatch(chunk, true, handler);
            self.buffer.extend_from_slice(&chunk[used..]);
            return;
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(chunk);
        let used = self.dispatch(&buffer, true, handler);
        buffer.drain(..used);
        self.buffer = buffer;
    }

    /// Signal end of input: whatever is still buffered is tokenized as-is
    pub fn finish<H: EventHandler + ?Sized>(&mut self, handler: &mut H) {
        let remaining = std::mem::take(&mut self.buffer);
        self.dispatch(&remaining, false, handler);
    }

    /// Bytes held back waiting for the rest of a construct
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes tokenized so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Tokenize `input`, forwarding events; returns how many bytes were consumed
    fn dispatch<H: EventHandler + ?Sized>(&mut self, input: &[u8], partial: bool, handler: &mut H) -> usize {
        let tokenizer = if partial {
            Tokenizer::partial(input, self.strict)
        } else {
            Tokenizer::new(input, self.strict)
        };
        let mut tokenizer = tokenizer.at_offset(self.consumed).inside(self.section);
        forward(&mut tokenizer, handler);

        let used = tokenizer.position();
        self.section = tokenizer.open_section();
        self.consumed += used;
        used
    }
}

/// Drain the tokenizer into handler calls
fn forward<H: EventHandler + ?Sized>(tokenizer: &mut Tokenizer<'_>, handler: &mut H) {
    while let Some(step) = tokenizer.next_token() {
        let token = match step {
            Ok(token) => token,
            Err(error) => {
                handler.error(error);
                continue;
            }
        };

        match token.kind {
            TokenKind::StartTag | TokenKind::EmptyTag => {
                let name = token.name.unwrap_or_default();
                handler.open_tag(name, &token.attributes);
                if token.kind == TokenKind::EmptyTag {
                    handler.close_tag(name);
                }
            }
            TokenKind::EndTag => handler.close_tag(token.name.unwrap_or_default()),
            TokenKind::Text => {
                if let Some(content) = token.content.as_deref() {
                    handler.text(content);
                }
            }
            TokenKind::CData => {
                if let Some(content) = token.content.as_deref() {
                    handler.cdata(content);
                }
            }
            TokenKind::Comment
            | TokenKind::ProcessingInstruction
            | TokenKind::XmlDeclaration
            | TokenKind::DocType => {}
        }
    }
}
