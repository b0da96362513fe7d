//! Node Builder
//!
//! Every open element gets a [`LiveElement`] on the traversal stack. Text is
//! kept as raw bytes until the element closes so that a multi-byte character
//! split across two tokenizer feeds is reassembled before decoding.

use super::collapsed::Value;
use super::node::Element;
use super::Node;
use crate::core::attributes::Attribute;
use crate::xpath::Classification;
use std::collections::BTreeMap;

/// Which of the two result renderings to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rendering {
    #[default]
    Structural,
    Collapsed,
}

/// Text post-processing applied when an element is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextOptions {
    pub trim: bool,
    pub normalize: bool,
}

impl TextOptions {
    /// Decode accumulated text, returning `None` when nothing is left
    pub fn finish(&self, raw: &[u8]) -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(raw);
        let text: &str = if self.trim { text.trim() } else { &text };

        let text = if self.normalize {
            let mut out = String::with_capacity(text.len());
            let mut in_space = false;
            for c in text.chars() {
                if c.is_whitespace() {
                    if !in_space {
                        out.push(' ');
                    }
                    in_space = true;
                } else {
                    out.push(c);
                    in_space = false;
                }
            }
            out
        } else {
            text.to_string()
        };

        (!text.is_empty()).then_some(text)
    }
}

/// A child already closed and rendered, waiting for its parent to close
#[derive(Debug, Clone)]
struct Child {
    name: String,
    node: Node,
}

/// In-progress element between its open and close events
#[derive(Debug, Default)]
pub struct LiveElement {
    /// Computed at open time, while the path still ends at this element
    classification: Classification,
    attributes: BTreeMap<String, String>,
    text: Vec<u8>,
    children: Vec<Child>,
}

impl LiveElement {
    pub fn new(classification: Classification) -> Self {
        LiveElement {
            classification,
            ..Default::default()
        }
    }

    /// Record attributes; a repeated name keeps its last value
    pub fn set_attributes(&mut self, attributes: &[Attribute<'_>]) {
        for attribute in attributes {
            let (name, value) = attribute.to_owned_pair();
            self.attributes.insert(name, value);
        }
    }

    /// Index of the pattern this element is a result of
    pub fn result_of(&self) -> Option<usize> {
        self.classification.exact
    }

    /// True if the element will be attached to its parent on close
    pub fn is_retained_child(&self) -> bool {
        self.classification.prefix
    }

    /// True if anything about this element can reach the caller
    pub fn is_reportable(&self) -> bool {
        self.classification.exact.is_some() || self.classification.prefix
    }

    pub fn append_text(&mut self, text: &[u8]) {
        self.text.extend_from_slice(text);
    }

    /// Drop accumulated text, returning how many bytes were released
    pub fn clear_text(&mut self) -> usize {
        let released = self.text.len();
        self.text = Vec::new();
        released
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    pub fn attach(&mut self, name: &str, node: Node) {
        self.children.push(Child {
            name: name.to_string(),
            node,
        });
    }

    /// Render into the configured result form, consuming the live element
    pub fn render(self, name: &str, rendering: Rendering, text: TextOptions) -> Node {
        let content = text.finish(&self.text);
        match rendering {
            Rendering::Structural => {
                let children = self
                    .children
                    .into_iter()
                    .filter_map(|child| child.node.into_element())
                    .collect();
                Node::Element(Element::new(name, self.attributes, content, children))
            }
            Rendering::Collapsed => {
                let children = self.children.into_iter().filter_map(|child| {
                    let value = child.node.into_value()?;
                    Some((child.name, value))
                });
                Node::Value(Value::collapse(content, self.attributes, children))
            }
        }
    }
}
