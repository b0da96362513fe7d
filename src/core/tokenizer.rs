//! XML Tokenizer - State machine for XML token extraction
//!
//! Pull-parser style tokenizer over the currently buffered bytes:
//! - Element start/end tags (attributes parsed eagerly)
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations (skipped as a unit, internal subset included)
//!
//! A tokenizer created with [`Tokenizer::partial`] knows more input may
//! follow. When a construct runs off the end of the buffer it stops *before*
//! that construct and reports how far it got via [`Tokenizer::position`], so
//! the caller can keep the tail and retry once the next chunk arrives.
//! CDATA sections and comments are the exception: their content is emitted
//! in pieces as it arrives and the section stays open across buffers (see
//! [`OpenSection`]), so a huge section never has to be held whole.
//!
//! Malformed markup never stops tokenization: the tokenizer yields a
//! [`TokenizerError`], skips past the offending construct and carries on.

use super::attributes::{parse_attributes, parse_attributes_strict, Attribute};
use super::entities::{decode_text, decode_text_strict, incomplete_reference_start};
use super::scanner::{is_whitespace, Scanner};
use std::borrow::Cow;

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
}

/// A parsed XML token
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// For tags and PIs: the name
    pub name: Option<&'a [u8]>,
    /// For text/cdata/comments: the content (owned if entities were decoded)
    pub content: Option<Cow<'a, [u8]>>,
    /// For start and empty tags: the attributes
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
            attributes: Vec::new(),
        }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: Cow<'a, [u8]>) -> Self {
        self.content = Some(content);
        self
    }

    fn with_attributes(mut self, attributes: Vec<Attribute<'a>>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Malformed markup encountered while tokenizing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (byte {position})")]
pub struct TokenizerError {
    pub message: &'static str,
    /// Byte offset of the offending construct
    pub position: usize,
}

impl TokenizerError {
    pub fn new(message: &'static str, position: usize) -> Self {
        TokenizerError { message, position }
    }
}

/// A CDATA section or comment whose terminator has not arrived yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenSection {
    /// `TokenKind::CData` or `TokenKind::Comment`
    pub kind: TokenKind,
    /// Absolute offset of the opening `<!`
    pub started: usize,
}

impl OpenSection {
    fn terminator(&self) -> &'static [u8] {
        match self.kind {
            TokenKind::Comment => b"-->",
            _ => b"]]>",
        }
    }

    fn unterminated(&self) -> &'static str {
        match self.kind {
            TokenKind::Comment => "Unterminated comment",
            _ => "Unterminated CDATA section",
        }
    }
}

/// Outcome of parsing one construct
enum Parsed<'a> {
    Token(Token<'a>),
    /// Token is fine to use but strict mode flagged it
    Flagged(Token<'a>, &'static str),
    /// Construct is malformed; resume scanning at `resume`
    Invalid { message: &'static str, resume: usize },
    /// Construct runs past the end of a partial buffer
    Incomplete,
}

/// XML tokenizer implementing a pull-parser pattern
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    strict: bool,
    partial: bool,
    /// Absolute offset of `input[0]` within the document
    offset: usize,
    deferred: Option<Token<'a>>,
    section: Option<OpenSection>,
}

impl<'a> Tokenizer<'a> {
    /// Tokenizer over complete input
    pub fn new(input: &'a [u8], strict: bool) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            strict,
            partial: false,
            offset: 0,
            deferred: None,
            section: None,
        }
    }

    /// Tokenizer over a buffer that more input may extend
    pub fn partial(input: &'a [u8], strict: bool) -> Self {
        Tokenizer {
            partial: true,
            ..Tokenizer::new(input, strict)
        }
    }

    /// Declare that `input` starts `offset` bytes into the document
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Continue inside a section left open by the previous buffer
    pub fn inside(mut self, section: Option<OpenSection>) -> Self {
        self.section = section;
        self
    }

    /// Section still open where tokenization stopped
    pub fn open_section(&self) -> Option<OpenSection> {
        self.section
    }

    /// Number of bytes fully consumed
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Get the next token or error. `None` means the buffer is exhausted, or
    /// (for partial buffers) that the next construct needs more input.
    pub fn next_token(&mut self) -> Option<Result<Token<'a>, TokenizerError>> {
        if let Some(token) = self.deferred.take() {
            return Some(Ok(token));
        }
        if self.scanner.is_eof() {
            if self.partial {
                return None;
            }
            let section = self.section.take()?;
            return Some(Err(TokenizerError::new(section.unterminated(), section.started)));
        }

        let start = self.scanner.position();
        let resumed = self.section;
        let parsed = match resumed {
            Some(section) => self.parse_section_body(section),
            None => match self.scanner.peek()? {
                b'<' => self.parse_markup(start),
                _ => self.parse_text(start),
            },
        };

        match parsed {
            Parsed::Token(token) => Some(Ok(token)),
            Parsed::Flagged(token, message) => {
                self.deferred = Some(token);
                Some(Err(TokenizerError::new(message, self.offset + start)))
            }
            Parsed::Invalid { message, resume } => {
                self.scanner.set_position(resume.max(start + 1));
                let at = resumed.map_or(self.offset + start, |section| section.started);
                Some(Err(TokenizerError::new(message, at)))
            }
            Parsed::Incomplete => {
                // inside a section the consumed content stays consumed
                if self.section.is_none() {
                    self.scanner.set_position(start);
                }
                None
            }
        }
    }

    /// Incomplete on a partial buffer, otherwise an unrecoverable construct
    /// that swallows the rest of the input.
    fn truncated(&self, message: &'static str) -> Parsed<'a> {
        if self.partial {
            Parsed::Incomplete
        } else {
            Parsed::Invalid {
                message,
                resume: self.scanner.len(),
            }
        }
    }

    /// Resume point after a malformed tag: just past the next '>'
    fn skip_tag(&self, fallback: usize) -> usize {
        self.scanner.find_tag_end().map(|end| end + 1).unwrap_or(fallback)
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self, start: usize) -> Parsed<'a> {
        self.scanner.advance(1);

        match self.scanner.peek() {
            None => self.truncated("Unexpected end of input after '<'"),
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
        }
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> Parsed<'a> {
        let Some(name) = self.scanner.read_name() else {
            return Parsed::Invalid {
                message: "Invalid element name: must start with letter, underscore, or colon",
                resume: start + 1,
            };
        };
        let name_end = self.scanner.position();

        let Some(end) = self.scanner.find_tag_end_quoted() else {
            return self.truncated("Unterminated start tag");
        };

        let is_empty = end > name_end && self.scanner.slice(end - 1, end) == b"/";
        let attr_end = if is_empty { end - 1 } else { end };
        let raw_attrs = self.scanner.slice(name_end, attr_end);

        self.scanner.set_position(end + 1);
        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        let token = Token::new(kind, (start, end + 1)).with_name(name);

        if !self.strict {
            return Parsed::Token(token.with_attributes(parse_attributes(raw_attrs)));
        }

        if raw_attrs.first().is_some_and(|&b| !is_whitespace(b)) {
            return Parsed::Flagged(
                token.with_attributes(parse_attributes(raw_attrs)),
                "Invalid character in element name",
            );
        }
        match parse_attributes_strict(raw_attrs) {
            Ok(attrs) => Parsed::Token(token.with_attributes(attrs)),
            Err(message) => Parsed::Flagged(token.with_attributes(parse_attributes(raw_attrs)), message),
        }
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Parsed<'a> {
        self.scanner.advance(1); // Skip '/'

        if self.scanner.is_eof() {
            return self.truncated("Unterminated end tag");
        }

        let Some(name) = self.scanner.read_name() else {
            let resume = self.skip_tag(start + 2);
            return Parsed::Invalid {
                message: "Invalid element name in end tag",
                resume,
            };
        };
        let name_end = self.scanner.position();

        let Some(end) = self.scanner.find_tag_end() else {
            return self.truncated("Unterminated end tag");
        };

        self.scanner.set_position(end + 1);
        let token = Token::new(TokenKind::EndTag, (start, end + 1)).with_name(name);

        let trailing = self.scanner.slice(name_end, end);
        if self.strict && !trailing.iter().all(|&b| is_whitespace(b)) {
            return Parsed::Flagged(token, "End tag cannot have attributes or other content");
        }
        Parsed::Token(token)
    }

    /// Parse markup starting with '!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> Parsed<'a> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.enter_section(start, 2, TokenKind::Comment)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.enter_section(start, 7, TokenKind::CData)
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else if self.partial
            && [&b"--"[..], b"[CDATA[", b"DOCTYPE"]
                .iter()
                .any(|needle| self.scanner.could_start_with(needle))
        {
            Parsed::Incomplete
        } else {
            match self.scanner.find_tag_end() {
                Some(end) => Parsed::Invalid {
                    message: "Invalid declaration - expected comment, CDATA, or DOCTYPE",
                    resume: end + 1,
                },
                None => self.truncated("Invalid declaration - expected comment, CDATA, or DOCTYPE"),
            }
        }
    }

    /// Enter a CDATA section or comment after its opener
    fn enter_section(&mut self, start: usize, opener: usize, kind: TokenKind) -> Parsed<'a> {
        self.scanner.advance(opener);
        let section = OpenSection {
            kind,
            started: self.offset + start,
        };
        self.section = Some(section);
        self.parse_section_body(section)
    }

    /// Section content up to the terminator. On a partial buffer without
    /// the terminator, everything except a possible split terminator is
    /// emitted and the section stays open.
    fn parse_section_body(&mut self, section: OpenSection) -> Parsed<'a> {
        let start = self.scanner.position();
        let terminator = section.terminator();

        let (end, resume) = match self.scanner.find_seq(terminator) {
            Some(pos) => {
                self.section = None;
                (pos, pos + terminator.len())
            }
            None if self.partial => {
                let end = self.scanner.len() - self.scanner.split_suffix(terminator);
                if end == start {
                    return Parsed::Incomplete;
                }
                (end, end)
            }
            None => {
                self.section = None;
                return Parsed::Invalid {
                    message: section.unterminated(),
                    resume: self.scanner.len(),
                };
            }
        };

        let content = self.scanner.slice(start, end);
        self.scanner.set_position(resume);
        Parsed::Token(Token::new(section.kind, (start, resume)).with_content(Cow::Borrowed(content)))
    }

    /// Parse a DOCTYPE declaration
    fn parse_doctype(&mut self, start: usize) -> Parsed<'a> {
        let Some(end) = self.scanner.find_doctype_end() else {
            return self.truncated("Unterminated DOCTYPE declaration");
        };
        let content = self.scanner.slice(start + 2, end);
        self.scanner.set_position(end + 1);
        Parsed::Token(Token::new(TokenKind::DocType, (start, end + 1)).with_content(Cow::Borrowed(content)))
    }

    /// Parse a processing instruction <?...?>
    fn parse_pi(&mut self, start: usize) -> Parsed<'a> {
        self.scanner.advance(1); // Skip '?'

        let Some(close) = self.scanner.find_seq(b"?>") else {
            return self.truncated("Unterminated processing instruction");
        };

        let Some(name) = self.scanner.read_name().filter(|_| self.scanner.position() <= close) else {
            return Parsed::Invalid {
                message: "Processing instruction target cannot be empty",
                resume: close + 2,
            };
        };

        let content = self.scanner.slice(self.scanner.position(), close);
        self.scanner.set_position(close + 2);

        let kind = if name.eq_ignore_ascii_case(b"xml") {
            TokenKind::XmlDeclaration
        } else {
            TokenKind::ProcessingInstruction
        };
        let token = Token::new(kind, (start, close + 2))
            .with_name(name)
            .with_content(Cow::Borrowed(content));

        if self.strict && kind == TokenKind::XmlDeclaration && (name != b"xml" || self.offset + start != 0) {
            return Parsed::Flagged(token, "XML declaration must be lowercase and at the very start of the document");
        }
        Parsed::Token(token)
    }

    /// Parse text content
    fn parse_text(&mut self, start: usize) -> Parsed<'a> {
        let end = match self.scanner.find_tag_start() {
            Some(end) => end,
            None if self.partial => {
                // Emit what we have, minus a reference or `]]>` that may be cut in half
                let tail = self.scanner.remaining();
                let reference = incomplete_reference_start(tail).unwrap_or(tail.len());
                let bracket = tail.len() - self.scanner.split_suffix(b"]]>");
                start + reference.min(bracket)
            }
            None => self.scanner.len(),
        };

        if end == start {
            return Parsed::Incomplete;
        }

        let content = self.scanner.slice(start, end);
        self.scanner.set_position(end);
        let token = Token::new(TokenKind::Text, (start, end));

        if !self.strict {
            return Parsed::Token(token.with_content(decode_text(content)));
        }

        if memchr::memmem::find(content, b"]]>").is_some() {
            return Parsed::Flagged(token.with_content(decode_text(content)), "Text cannot contain ']]>'");
        }
        match decode_text_strict(content) {
            Ok(decoded) => Parsed::Token(token.with_content(decoded)),
            Err(message) => Parsed::Flagged(token.with_content(decode_text(content)), message),
        }
    }
}

/// Iterator adapter for tokenizer
impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, TokenizerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &[u8], strict: bool) -> Vec<Result<TokenKind, &'static str>> {
        Tokenizer::new(input, strict)
            .map(|t| t.map(|t| t.kind).map_err(|e| e.message))
            .collect()
    }

    #[test]
    fn test_simple_element() {
        let mut tok = Tokenizer::new(b"<root>content</root>", true);

        let t1 = tok.next_token().unwrap().unwrap();
        assert_eq!(t1.kind, TokenKind::StartTag);
        assert_eq!(t1.name, Some(b"root" as &[u8]));

        let t2 = tok.next_token().unwrap().unwrap();
        assert_eq!(t2.kind, TokenKind::Text);
        assert_eq!(t2.content.as_deref(), Some(b"content" as &[u8]));

        let t3 = tok.next_token().unwrap().unwrap();
        assert_eq!(t3.kind, TokenKind::EndTag);
        assert_eq!(t3.name, Some(b"root" as &[u8]));

        assert!(tok.next_token().is_none());
    }

    #[test]
    fn test_empty_element_with_attributes() {
        let mut tok = Tokenizer::new(b"<shelf id=\"1023\" note='a>b'/>", true);
        let t = tok.next_token().unwrap().unwrap();
        assert_eq!(t.kind, TokenKind::EmptyTag);
        assert_eq!(t.name, Some(b"shelf" as &[u8]));
        assert_eq!(t.attributes.len(), 2);
        assert_eq!(t.attributes[1].value_str(), Some("a>b"));
    }

    #[test]
    fn test_cdata_and_comment() {
        let mut tok = Tokenizer::new(b"<![CDATA[<script>a > b</script>]]><!-- note -->", true);
        let t = tok.next_token().unwrap().unwrap();
        assert_eq!(t.kind, TokenKind::CData);
        assert_eq!(t.content.as_deref(), Some(b"<script>a > b</script>" as &[u8]));
        let t = tok.next_token().unwrap().unwrap();
        assert_eq!(t.kind, TokenKind::Comment);
        assert_eq!(t.content.as_deref(), Some(b" note " as &[u8]));
    }

    #[test]
    fn test_declaration_and_doctype() {
        let input = b"<?xml version=\"1.0\"?><!DOCTYPE library [<!ELEMENT library ANY>]><library/>";
        assert_eq!(
            kinds(input, true),
            vec![Ok(TokenKind::XmlDeclaration), Ok(TokenKind::DocType), Ok(TokenKind::EmptyTag)]
        );
    }

    #[test]
    fn test_partial_stops_before_incomplete_tag() {
        let mut tok = Tokenizer::partial(b"<root><ite", true);
        assert_eq!(tok.next_token().unwrap().unwrap().kind, TokenKind::StartTag);
        assert!(tok.next_token().is_none());
        assert_eq!(tok.position(), 6);
    }

    #[test]
    fn test_partial_holds_back_split_reference() {
        let mut tok = Tokenizer::partial(b"<a>fish &am", true);
        tok.next_token();
        let text = tok.next_token().unwrap().unwrap();
        assert_eq!(text.content.as_deref(), Some(b"fish " as &[u8]));
        assert!(tok.next_token().is_none());
        assert_eq!(tok.position(), 8);
    }

    #[test]
    fn test_partial_waits_for_cdata_opener() {
        let mut tok = Tokenizer::partial(b"<![CDA", true);
        assert!(tok.next_token().is_none());
        assert_eq!(tok.position(), 0);
    }

    #[test]
    fn test_partial_holds_back_split_cdata_end_in_text() {
        let mut tok = Tokenizer::partial(b"<a>x]]", true);
        tok.next_token();
        let text = tok.next_token().unwrap().unwrap();
        assert_eq!(text.content.as_deref(), Some(b"x" as &[u8]));
        assert!(tok.next_token().is_none());
        assert_eq!(tok.position(), 4);
    }

    #[test]
    fn test_partial_cdata_streams_in_pieces() {
        let mut tok = Tokenizer::partial(b"<![CDATA[abc]]", true);
        let piece = tok.next_token().unwrap().unwrap();
        assert_eq!(piece.kind, TokenKind::CData);
        assert_eq!(piece.content.as_deref(), Some(b"abc" as &[u8]));
        assert!(tok.next_token().is_none());
        // the two brackets may begin the terminator
        assert_eq!(tok.position(), 12);
        let section = tok.open_section().unwrap();
        assert_eq!(section.started, 0);

        let mut rest = Tokenizer::partial(b"]]><a/>", true).at_offset(12).inside(Some(section));
        let last = rest.next_token().unwrap().unwrap();
        assert_eq!(last.kind, TokenKind::CData);
        assert_eq!(last.content.as_deref(), Some(b"" as &[u8]));
        assert_eq!(rest.next_token().unwrap().unwrap().kind, TokenKind::EmptyTag);
        assert_eq!(rest.open_section(), None);
    }

    #[test]
    fn test_open_section_unterminated_at_end() {
        let section = OpenSection {
            kind: TokenKind::Comment,
            started: 4,
        };
        let mut tok = Tokenizer::new(b"still going", true).at_offset(20).inside(Some(section));
        let error = tok.next_token().unwrap().unwrap_err();
        assert_eq!(error, TokenizerError::new("Unterminated comment", 4));
        assert!(tok.next_token().is_none());
    }

    #[test]
    fn test_recovers_from_bad_name() {
        assert_eq!(
            kinds(b"<a>< b/></a>", false),
            vec![
                Ok(TokenKind::StartTag),
                Err("Invalid element name: must start with letter, underscore, or colon"),
                Ok(TokenKind::Text),
                Ok(TokenKind::EndTag),
            ]
        );
    }

    #[test]
    fn test_strict_flags_but_keeps_token() {
        assert_eq!(
            kinds(b"<a x=1></a foo>", true),
            vec![
                Err("Attribute value must be quoted"),
                Ok(TokenKind::StartTag),
                Err("End tag cannot have attributes or other content"),
                Ok(TokenKind::EndTag),
            ]
        );
        assert_eq!(kinds(b"<a x=1></a foo>", false), vec![Ok(TokenKind::StartTag), Ok(TokenKind::EndTag)]);
    }

    #[test]
    fn test_unterminated_comment_at_end() {
        assert_eq!(
            kinds(b"<a/><!-- never closed", true),
            vec![Ok(TokenKind::EmptyTag), Err("Unterminated comment")]
        );
    }
}
