//! XPath-like subtree patterns.

use std::fmt;
use std::str::FromStr;

use crate::error::{ConvertError, Result};

/// One step of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// `*`: any element.
    Any,
    /// A local element name.
    Name(String),
}

impl Step {
    fn matches(&self, name: &str) -> bool {
        match self {
            Step::Any => true,
            Step::Name(n) => n == name,
        }
    }
}

/// Selects elements by the path of open elements leading to them.
///
/// - `//orders/order` matches an `order` inside `orders` at any depth
/// - `/orders/order` matches only when `orders` is the document root
/// - `*` matches any single element name
///
/// A pattern without a leading slash behaves like `//`.
///
/// # Examples
/// ```
/// use rex_converter::registry::SubtreePattern;
///
/// let pattern: SubtreePattern = "//flats/flat".parse().unwrap();
/// assert!(pattern.matches(&["root", "flats", "flat"]));
/// assert!(!pattern.matches(&["root", "flats"]));
///
/// let anchored: SubtreePattern = "/flats/*".parse().unwrap();
/// assert!(anchored.matches(&["flats", "flat"]));
/// assert!(!anchored.matches(&["root", "flats", "flat"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreePattern {
    source: String,
    anchored: bool,
    steps: Vec<Step>,
}

impl SubtreePattern {
    /// Compile a pattern.
    ///
    /// # Errors
    /// `InvalidPattern` when the pattern is empty or contains an empty step.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| ConvertError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let (anchored, body) = if let Some(rest) = pattern.strip_prefix("//") {
            (false, rest)
        } else if let Some(rest) = pattern.strip_prefix('/') {
            (true, rest)
        } else {
            (false, pattern)
        };

        if body.is_empty() {
            return Err(invalid("no element steps"));
        }

        let steps = body
            .split('/')
            .map(|step| match step.trim() {
                "" => Err(invalid("empty step")),
                "*" => Ok(Step::Any),
                name if name.contains(['[', ']', '@', '(', ')']) => {
                    Err(invalid("predicates and axes are not supported"))
                }
                name => Ok(Step::Name(name.to_string())),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: pattern.to_string(),
            anchored,
            steps,
        })
    }

    /// Whether the element at the end of `path` (root first) is selected.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> bool {
        if path.len() < self.steps.len() || (self.anchored && path.len() != self.steps.len()) {
            return false;
        }
        let tail = &path[path.len() - self.steps.len()..];
        self.steps
            .iter()
            .zip(tail)
            .all(|(step, name)| step.matches(name.as_ref()))
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for SubtreePattern {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SubtreePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendant_pattern() {
        let p = SubtreePattern::parse("//orders/order").unwrap();
        assert!(p.matches(&["orders", "order"]));
        assert!(p.matches(&["root", "orders", "order"]));
        assert!(!p.matches(&["root", "order"]));
        assert!(!p.matches(&["orders", "order", "type"]));
    }

    #[test]
    fn test_relative_pattern_is_descendant() {
        let p = SubtreePattern::parse("order").unwrap();
        assert!(p.matches(&["root", "orders", "order"]));
        assert!(p.matches(&["order"]));
    }

    #[test]
    fn test_anchored_pattern() {
        let p = SubtreePattern::parse("/root/orders").unwrap();
        assert!(p.matches(&["root", "orders"]));
        assert!(!p.matches(&["x", "root", "orders"]));
    }

    #[test]
    fn test_wildcard_step() {
        let p = SubtreePattern::parse("//*/flat").unwrap();
        assert!(p.matches(&["flats", "flat"]));
        assert!(p.matches(&["rent", "flat"]));
        assert!(!p.matches(&["flat"]));
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in ["", "/", "//", "//a//b", "/a/", "//a[1]", "//a/@id"] {
            let err = SubtreePattern::parse(bad).unwrap_err();
            assert!(matches!(err, ConvertError::InvalidPattern { .. }), "{bad}");
        }
    }

    #[test]
    fn test_display_round_trips_source() {
        let p: SubtreePattern = "//flats/flat".parse().unwrap();
        assert_eq!(p.to_string(), "//flats/flat");
    }
}
