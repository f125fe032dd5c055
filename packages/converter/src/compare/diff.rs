//! Structural diff of two listing values.

use std::fmt;

use crate::tree::{PathSegment, Value};

/// What happened at a path, seen from the original to the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    /// Only in the conversion.
    Added,
    /// Only in the original.
    Deleted,
    /// In both, with different values.
    Edited,
}

impl DiffKind {
    /// Short code used by the per-path statistics.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Added => 'N',
            Self::Deleted => 'D',
            Self::Edited => 'E',
        }
    }

    /// Word used in reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "redundant",
            Self::Deleted => "missing",
            Self::Edited => "changed",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub path: Vec<PathSegment>,
    pub left: Option<Value>,
    pub right: Option<Value>,
}

impl DiffEntry {
    /// Dot-joined path, e.g. `estate.0.type.0.$.id`.
    #[must_use]
    pub fn path_string(&self) -> String {
        join_path(&self.path)
    }
}

/// Join path segments with dots.
#[must_use]
pub fn join_path(path: &[PathSegment]) -> String {
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join(".")
}

/// Differences between two values, in document order of the left side
/// followed by additions.
///
/// Objects are compared by key and arrays by index. Values of different
/// shapes are a single edit at their common path.
///
/// # Examples
/// ```
/// use rex_converter::compare::{diff, DiffKind};
/// use rex_converter::tree::{Element, Value};
///
/// let left = Value::from_element(&Element::new("order").with_child(Element::new("price").with_text("10")));
/// let right = Value::from_element(&Element::new("order").with_child(Element::new("price").with_text("12")));
/// let changes = diff(&left, &right);
/// assert_eq!(changes.len(), 1);
/// assert_eq!(changes[0].kind, DiffKind::Edited);
/// assert_eq!(changes[0].path_string(), "price.0");
/// ```
#[must_use]
pub fn diff(left: &Value, right: &Value) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    walk(&mut Vec::new(), left, right, &mut out);
    out
}

fn walk(path: &mut Vec<PathSegment>, left: &Value, right: &Value, out: &mut Vec<DiffEntry>) {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            for (key, lv) in l {
                path.push(PathSegment::Key(key.clone()));
                match r.get(key) {
                    Some(rv) => walk(path, lv, rv, out),
                    None => out.push(entry(DiffKind::Deleted, path, Some(lv), None)),
                }
                path.pop();
            }
            for (key, rv) in r.iter().filter(|(k, _)| !l.contains_key(*k)) {
                path.push(PathSegment::Key(key.clone()));
                out.push(entry(DiffKind::Added, path, None, Some(rv)));
                path.pop();
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            for index in 0..l.len().max(r.len()) {
                path.push(PathSegment::Index(index));
                match (l.get(index), r.get(index)) {
                    (Some(lv), Some(rv)) => walk(path, lv, rv, out),
                    (Some(lv), None) => out.push(entry(DiffKind::Deleted, path, Some(lv), None)),
                    (None, Some(rv)) => out.push(entry(DiffKind::Added, path, None, Some(rv))),
                    (None, None) => {}
                }
                path.pop();
            }
        }
        (Value::Text(a), Value::Text(b)) if a == b => {}
        _ => out.push(entry(DiffKind::Edited, path, Some(left), Some(right))),
    }
}

fn entry(kind: DiffKind, path: &[PathSegment], left: Option<&Value>, right: Option<&Value>) -> DiffEntry {
    DiffEntry {
        kind,
        path: path.to_vec(),
        left: left.cloned(),
        right: right.cloned(),
    }
}
