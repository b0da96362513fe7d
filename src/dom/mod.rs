//! Result Nodes
//!
//! Matched subtrees are rendered into one of two forms, chosen per stream:
//! - [`Element`]: structural, with shortcut fields
//! - [`Value`]: collapsed into plain text/list/map values

pub mod builder;
pub mod collapsed;
pub mod node;

pub use builder::{LiveElement, Rendering, TextOptions};
pub use collapsed::Value;
pub use node::{Element, Field, RESERVED_FIELDS};

use serde::Serialize;

/// A finalized result, delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Value(Value),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Node::Value(value) => Some(value),
            Node::Element(_) => None,
        }
    }

    pub fn into_element(self) -> Option<Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Node::Value(value) => Some(value),
            Node::Element(_) => None,
        }
    }
}
