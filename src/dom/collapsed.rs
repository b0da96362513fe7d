//! Collapsed result rendering
//!
//! A leaf with text and nothing else collapses to its text. Everything else
//! becomes a map: `text` first (when non-empty), then attributes, then
//! children in document order. A name seen a second time turns its slot into
//! a list; later occurrences append to it.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn empty_map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Collapse an element's parts into a value
    pub fn collapse<A, C>(text: Option<String>, attributes: A, children: C) -> Self
    where
        A: IntoIterator<Item = (String, String)>,
        C: IntoIterator<Item = (String, Value)>,
    {
        let mut attributes = attributes.into_iter().peekable();
        let mut children = children.into_iter().peekable();

        if attributes.peek().is_none() && children.peek().is_none() {
            if let Some(text) = text {
                return Value::Text(text);
            }
            return Value::empty_map();
        }

        let mut map = BTreeMap::new();
        if let Some(text) = text {
            fold(&mut map, "text".to_string(), Value::Text(text));
        }
        for (name, value) in attributes {
            fold(&mut map, name, Value::Text(value));
        }
        for (name, value) in children {
            fold(&mut map, name, value);
        }
        Value::Map(map)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Map entry by name; `None` for scalars and lists
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_map()?.get(name)
    }
}

/// Insert `value` under `name`, promoting an occupied slot to a list
fn fold(map: &mut BTreeMap<String, Value>, name: String, value: Value) {
    match map.remove(&name) {
        None => {
            map.insert(name, value);
        }
        Some(Value::List(mut items)) => {
            items.push(value);
            map.insert(name, Value::List(items));
        }
        Some(existing) => {
            map.insert(name, Value::List(vec![existing, value]));
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}
