//! Key-addressable view of a listing tree.
//!
//! Attributes live under the `$` key, text under `_`, and every child tag
//! maps to the array of its occurrences. An element with neither attributes
//! nor children collapses to bare text. Diff paths are built from this
//! shape, e.g. `estate.0.type.0.$.id`.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::Element;

/// Key for the attribute object.
pub const ATTRIBUTES_KEY: &str = "$";

/// Key for the text value of an element that also has attributes or children.
pub const TEXT_KEY: &str = "_";

/// Tree node content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A leaf string.
    Text(String),
    /// Named members in insertion order.
    Object(IndexMap<String, Value>),
    /// Repeated occurrences.
    Array(Vec<Value>),
}

/// One step of a path into a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

impl Value {
    /// Build the value view of an element.
    #[must_use]
    pub fn from_element(element: &Element) -> Self {
        if element.attributes.is_empty() && element.children.is_empty() {
            return Self::Text(element.text.clone().unwrap_or_default());
        }

        let mut members = IndexMap::new();
        if !element.attributes.is_empty() {
            let attrs = element
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), Self::Text(v.clone())))
                .collect();
            members.insert(ATTRIBUTES_KEY.to_string(), Self::Object(attrs));
        }
        if let Some(text) = element.text.as_ref().filter(|t| !t.trim().is_empty()) {
            members.insert(TEXT_KEY.to_string(), Self::Text(text.clone()));
        }
        for child in &element.children {
            let slot = members
                .entry(child.name.clone())
                .or_insert_with(|| Self::Array(Vec::new()));
            if let Self::Array(items) = slot {
                items.push(Self::from_element(child));
            }
        }
        Self::Object(members)
    }

    /// Follow a path of segments.
    #[must_use]
    pub fn get(&self, path: &[PathSegment]) -> Option<&Value> {
        path.iter().try_fold(self, |node, segment| match (node, segment) {
            (Self::Object(map), PathSegment::Key(k)) => map.get(k),
            (Self::Array(items), PathSegment::Index(i)) => items.get(*i),
            _ => None,
        })
    }

    /// Text of a leaf, or the `_` member of an object.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Object(map) => match map.get(TEXT_KEY) {
                Some(Self::Text(t)) => Some(t),
                _ => None,
            },
            Self::Array(_) => None,
        }
    }

    /// Compact single-line rendering used in reports.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Array(items) if items.len() == 1 => items[0].render(),
            Self::Array(items) if items.len() > 4 => {
                let head: Vec<String> = items[..3].iter().map(Self::render).collect();
                let last = items.last().map(Self::render).unwrap_or_default();
                format!("[{},...,{last}]", head.join(","))
            }
            Self::Array(items) => {
                let all: Vec<String> = items.iter().map(Self::render).collect();
                format!("[{}]", all.join(","))
            }
            Self::Object(map) => {
                let members: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k:?}:{}", v.render_quoted()))
                    .collect();
                format!("{{{}}}", members.join(","))
            }
        }
    }

    fn render_quoted(&self) -> String {
        match self {
            Self::Text(t) => format!("{t:?}"),
            other => other.render(),
        }
    }
}

/// Normalise a value for comparison.
///
/// Text leaves are trimmed; objects and arrays that end up empty are
/// removed. Returns `None` when nothing is left. The input is not modified.
///
/// # Examples
/// ```
/// use indexmap::IndexMap;
/// use rex_converter::tree::{normalize, Value};
///
/// let mut inner = IndexMap::new();
/// inner.insert("empty".to_string(), Value::Object(IndexMap::new()));
/// let mut outer = IndexMap::new();
/// outer.insert("name".to_string(), Value::Text("  flat ".to_string()));
/// outer.insert("meta".to_string(), Value::Object(inner));
///
/// let mut expected = IndexMap::new();
/// expected.insert("name".to_string(), Value::Text("flat".to_string()));
/// assert_eq!(normalize(&Value::Object(outer)), Some(Value::Object(expected)));
/// ```
#[must_use]
pub fn normalize(value: &Value) -> Option<Value> {
    match value {
        Value::Text(t) => Some(Value::Text(t.trim().to_string())),
        Value::Object(map) => {
            let members: IndexMap<String, Value> = map
                .iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k.clone(), v)))
                .collect();
            (!members.is_empty()).then_some(Value::Object(members))
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.iter().filter_map(normalize).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
    }
}
