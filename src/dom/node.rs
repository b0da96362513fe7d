//! Structural result rendering
//!
//! An [`Element`] keeps the full shape of a matched subtree: tag name,
//! attributes, text and ordered children. On top of that, attributes and
//! first children of a given name are exposed as *shortcut fields*, merged
//! in a single explicit step with this precedence:
//!
//! 1. the reserved names `attributes`, `children`, `tagName`, `text`
//! 2. attributes, in name order
//! 3. children, first occurrence of each name in document order
//!
//! A name already taken by an earlier rule is never overwritten; the shadowed
//! value stays reachable through [`Element::attributes`] or
//! [`Element::children`].

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Field names that shortcut fields can never take
pub const RESERVED_FIELDS: [&str; 4] = ["attributes", "children", "tagName", "text"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shortcut {
    Attribute,
    /// Index into `children`
    Child(usize),
}

/// A field resolved through the shortcut table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    Attribute(&'a str),
    Child(&'a Element),
}

/// Structural result node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag_name: String,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    children: Vec<Element>,
    /// Shortcut fields in merge order
    shortcuts: Vec<(String, Shortcut)>,
}

impl Element {
    /// Build an element and merge its shortcut fields
    pub fn new(
        tag_name: impl Into<String>,
        attributes: BTreeMap<String, String>,
        text: Option<String>,
        children: Vec<Element>,
    ) -> Self {
        let mut element = Element {
            tag_name: tag_name.into(),
            attributes,
            text,
            children,
            shortcuts: Vec::new(),
        };
        element.merge_shortcuts();
        element
    }

    fn merge_shortcuts(&mut self) {
        let mut shortcuts: Vec<(String, Shortcut)> = Vec::new();
        let taken = |shortcuts: &[(String, Shortcut)], name: &str| {
            is_reserved(name) || shortcuts.iter().any(|(n, _)| n == name)
        };

        for name in self.attributes.keys() {
            if !taken(&shortcuts, name) {
                shortcuts.push((name.clone(), Shortcut::Attribute));
            }
        }
        for (idx, child) in self.children.iter().enumerate() {
            if !taken(&shortcuts, &child.tag_name) {
                shortcuts.push((child.tag_name.clone(), Shortcut::Child(idx)));
            }
        }
        self.shortcuts = shortcuts;
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First child with the given tag name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag_name == name)
    }

    /// Look up a shortcut field. Reserved names never resolve here.
    pub fn field(&self, name: &str) -> Option<Field<'_>> {
        let (_, shortcut) = self.shortcuts.iter().find(|(n, _)| n == name)?;
        match *shortcut {
            Shortcut::Attribute => self.attribute(name).map(Field::Attribute),
            Shortcut::Child(idx) => self.children.get(idx).map(Field::Child),
        }
    }

    /// Shortcut field names in merge order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.shortcuts.iter().map(|(n, _)| n.as_str())
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 3 + usize::from(self.text.is_some()) + self.shortcuts.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("children", &self.children)?;
        map.serialize_entry("attributes", &self.attributes)?;
        map.serialize_entry("tagName", &self.tag_name)?;
        if let Some(text) = &self.text {
            map.serialize_entry("text", text)?;
        }
        for (name, shortcut) in &self.shortcuts {
            match *shortcut {
                Shortcut::Attribute => {
                    if let Some(value) = self.attributes.get(name) {
                        map.serialize_entry(name, value)?;
                    }
                }
                Shortcut::Child(idx) => {
                    if let Some(child) = self.children.get(idx) {
                        map.serialize_entry(name, child)?;
                    }
                }
            }
        }
        map.end()
    }
}
