//! Helpers for navigating roxmltree documents.
//!
//! Static trees are used where a whole document is needed at once: schema
//! loading and document validation.

use roxmltree::Node;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use rex_converter::xml::get_tag_name;
///
/// let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element name="flat"/></xs:schema>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "schema");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Find the first child element with the given tag name.
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Get all element children of a node.
///
/// Text nodes, comments and processing instructions are skipped.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Get the concatenated text content of a node's direct text children.
///
/// Returns `None` when the node has no non-blank text.
pub fn get_text(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Line and column (both 1-based) where a node starts.
pub fn node_position(node: Node<'_, '_>) -> (u32, u32) {
    let pos = node.document().text_pos_at(node.range().start);
    (pos.row, pos.col)
}
