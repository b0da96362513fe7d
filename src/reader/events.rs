//! XML Event Interface
//!
//! The extraction core only ever sees five kinds of lexical event. Any
//! tokenizer that can produce them can drive it; [`PushReader`] is the one
//! shipped with the crate, and [`XmlEvent`] lets tests or other front ends
//! replay a synthetic event stream.
//!
//! [`PushReader`]: super::push::PushReader

use crate::core::attributes::Attribute;
use crate::core::tokenizer::TokenizerError;
use std::borrow::Cow;

/// Receiver of lexical events, called in document order.
///
/// Self-closing elements are reported as an `open_tag` immediately followed
/// by a `close_tag`.
pub trait EventHandler {
    /// Called when an element starts
    fn open_tag(&mut self, name: &[u8], attributes: &[Attribute<'_>]);

    /// Called when an element ends
    fn close_tag(&mut self, name: &[u8]);

    /// Called for (entity-decoded) character data. A single text node may
    /// arrive split across several calls.
    fn text(&mut self, text: &[u8]);

    /// Called for the content of a CDATA section
    fn cdata(&mut self, data: &[u8]);

    /// Called for malformed markup; tokenization continues afterwards
    fn error(&mut self, error: TokenizerError);
}

/// Owned event, for building event streams by hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    OpenTag {
        name: String,
        attributes: Vec<(String, String)>,
    },
    CloseTag(String),
    Text(String),
    CData(String),
    Error(TokenizerError),
}

impl XmlEvent {
    pub fn open(name: &str) -> Self {
        XmlEvent::OpenTag {
            name: name.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn open_with(name: &str, attributes: &[(&str, &str)]) -> Self {
        XmlEvent::OpenTag {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn close(name: &str) -> Self {
        XmlEvent::CloseTag(name.to_string())
    }

    pub fn text(text: &str) -> Self {
        XmlEvent::Text(text.to_string())
    }

    /// Deliver this event to a handler
    pub fn dispatch<H: EventHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            XmlEvent::OpenTag { name, attributes } => {
                let attrs: Vec<Attribute<'_>> = attributes
                    .iter()
                    .map(|(k, v)| Attribute {
                        name: Cow::Borrowed(k.as_bytes()),
                        value: Cow::Borrowed(v.as_bytes()),
                    })
                    .collect();
                handler.open_tag(name.as_bytes(), &attrs);
            }
            XmlEvent::CloseTag(name) => handler.close_tag(name.as_bytes()),
            XmlEvent::Text(text) => handler.text(text.as_bytes()),
            XmlEvent::CData(data) => handler.cdata(data.as_bytes()),
            XmlEvent::Error(error) => handler.error(error.clone()),
        }
    }
}

/// Replay a sequence of events into a handler
pub fn replay<'e, H, I>(events: I, handler: &mut H)
where
    H: EventHandler + ?Sized,
    I: IntoIterator<Item = &'e XmlEvent>,
{
    for event in events {
        event.dispatch(handler);
    }
}

/// Handler that records every event it receives, merging adjacent text runs
/// and the pieces of a streamed CDATA section
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<XmlEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<XmlEvent> {
        self.events
    }
}

impl EventHandler for EventRecorder {
    fn open_tag(&mut self, name: &[u8], attributes: &[Attribute<'_>]) {
        self.events.push(XmlEvent::OpenTag {
            name: String::from_utf8_lossy(name).into_owned(),
            attributes: attributes.iter().map(Attribute::to_owned_pair).collect(),
        });
    }

    fn close_tag(&mut self, name: &[u8]) {
        self.events.push(XmlEvent::CloseTag(String::from_utf8_lossy(name).into_owned()));
    }

    fn text(&mut self, text: &[u8]) {
        let text = String::from_utf8_lossy(text);
        if let Some(XmlEvent::Text(last)) = self.events.last_mut() {
            last.push_str(&text);
        } else {
            self.events.push(XmlEvent::Text(text.into_owned()));
        }
    }

    fn cdata(&mut self, data: &[u8]) {
        let data = String::from_utf8_lossy(data);
        if let Some(XmlEvent::CData(last)) = self.events.last_mut() {
            last.push_str(&data);
        } else {
            self.events.push(XmlEvent::CData(data.into_owned()));
        }
    }

    fn error(&mut self, error: TokenizerError) {
        self.events.push(XmlEvent::Error(error));
    }
}
