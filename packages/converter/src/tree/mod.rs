//! Listing trees: the in-memory form of one XML subtree.
//!
//! An [`Element`] mirrors the XML it was parsed from: ordered attributes, an
//! optional text value and ordered, possibly repeating, children. Identity
//! is positional. A missing attribute or child is different from a present
//! but empty one, which is why text is an `Option`.
//!
//! [`Value`] is the derived, key-addressable view used for structural
//! comparison.

mod value;

pub use value::{normalize, PathSegment, Value};

/// One element of a listing tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name without namespace prefix.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Character data directly inside the element, if any.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set an attribute and return the element.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set the text value and return the element.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Append a child and return the element.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing an existing one with the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Append a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append a text-only child when `text` is present.
    pub fn push_text(&mut self, name: &str, text: Option<String>) {
        if let Some(text) = text {
            self.children.push(Element::new(name).with_text(text));
        }
    }

    /// Replace the first child with the same name, or append.
    ///
    /// A replaced child keeps the position of the one it replaces.
    pub fn set_child(&mut self, child: Element) {
        match self.children.iter_mut().find(|c| c.name == child.name) {
            Some(slot) => *slot = child,
            None => self.children.push(child),
        }
    }

    /// Remove every child with the given name.
    pub fn remove_children(&mut self, name: &str) {
        self.children.retain(|c| c.name != name);
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get the text value.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable access to the first child with the given name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// All children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a `/`-separated path of first-matching children.
    ///
    /// An empty path returns the element itself.
    ///
    /// # Examples
    /// ```
    /// use rex_converter::tree::Element;
    ///
    /// let order = Element::new("order").with_child(
    ///     Element::new("estate").with_child(Element::new("type").with_attr("id", "2")),
    /// );
    /// assert!(order.find("estate/type").is_some());
    /// assert!(order.find("estate/object").is_none());
    /// ```
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|step| !step.is_empty())
            .try_fold(self, |node, step| node.child(step))
    }

    /// Resolve `path` to a string: `a/b` is the text of `b`, `a/b@id` its
    /// `id` attribute, `@id` an attribute of this element.
    ///
    /// # Examples
    /// ```
    /// use rex_converter::tree::Element;
    ///
    /// let order = Element::new("order")
    ///     .with_attr("id", "42")
    ///     .with_child(Element::new("type").with_attr("id", "2").with_text("продажа"));
    /// assert_eq!(order.value_at("@id"), Some("42"));
    /// assert_eq!(order.value_at("type@id"), Some("2"));
    /// assert_eq!(order.value_at("type"), Some("продажа"));
    /// ```
    #[must_use]
    pub fn value_at(&self, path: &str) -> Option<&str> {
        match path.split_once('@') {
            Some((element, attribute)) => self.find(element)?.attr(attribute),
            None => self.find(path)?.text(),
        }
    }

    /// First present, non-blank value among several candidate paths.
    #[must_use]
    pub fn coalesce(&self, paths: &[&str]) -> Option<&str> {
        paths
            .iter()
            .filter_map(|p| self.value_at(p))
            .find(|v| !v.trim().is_empty())
    }

    /// Whether the element carries no attributes, text or children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.text.is_none() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Element {
        Element::new("order")
            .with_attr("id", "7")
            .with_child(
                Element::new("estate").with_child(
                    Element::new("location")
                        .with_child(Element::new("region").with_attr("id", "7800000000000"))
                        .with_child(Element::new("street").with_text("Невский пр.")),
                ),
            )
            .with_child(Element::new("meta").with_child(Element::new("extid").with_text("77")))
    }

    #[test]
    fn test_find_nested() {
        let order = order();
        assert_eq!(order.find("estate/location/street").map(|e| e.name.as_str()), Some("street"));
        assert!(order.find("estate/flat").is_none());
        assert_eq!(order.find("").map(|e| e.name.as_str()), Some("order"));
    }

    #[test]
    fn test_value_at_attribute_and_text() {
        let order = order();
        assert_eq!(order.value_at("estate/location/region@id"), Some("7800000000000"));
        assert_eq!(order.value_at("estate/location/street"), Some("Невский пр."));
        assert_eq!(order.value_at("estate/location/region"), None);
    }

    #[test]
    fn test_coalesce_takes_first_present() {
        let order = order();
        assert_eq!(order.coalesce(&["@id", "meta/extid"]), Some("7"));
        assert_eq!(order.coalesce(&["@missing", "meta/extid"]), Some("77"));
        assert_eq!(order.coalesce(&["@missing"]), None);
    }

    #[test]
    fn test_set_child_keeps_position() {
        let mut flat = Element::new("flat")
            .with_child(Element::new("id").with_text("1"))
            .with_child(Element::new("actual").with_text("продается"))
            .with_child(Element::new("price").with_text("100"));
        flat.set_child(Element::new("actual").with_text("продается/арендуется"));
        flat.set_child(Element::new("park").with_text("+"));

        let names: Vec<_> = flat.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "actual", "price", "park"]);
        assert_eq!(flat.value_at("actual"), Some("продается/арендуется"));
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut e = Element::new("metro").with_attr("farval", "5");
        e.set_attr("farval", "10");
        assert_eq!(e.attributes.len(), 1);
        assert_eq!(e.attr("farval"), Some("10"));
    }

    #[test]
    fn test_absent_and_empty_differ() {
        let empty = Element::new("rent").with_text("");
        let absent = Element::new("rent");
        assert_ne!(empty, absent);
        assert!(absent.is_empty());
        assert!(!empty.is_empty());
    }
}
