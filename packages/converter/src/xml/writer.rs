//! Serialising listing trees.

use quick_xml::escape::escape;

use crate::config::XML_DECLARATION;
use crate::tree::Element;

/// Serialise an element and its subtree without an XML declaration.
///
/// # Examples
/// ```
/// use rex_converter::tree::Element;
/// use rex_converter::xml::to_xml;
///
/// let price = Element::new("price").with_attr("currency", "RUB").with_text("100 & more");
/// assert_eq!(to_xml(&price), r#"<price currency="RUB">100 &amp; more</price>"#);
/// ```
#[must_use]
pub fn to_xml(element: &Element) -> String {
    let mut out = String::new();
    write_element(&mut out, element);
    out
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    if element.text.is_none() && element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    if let Some(text) = &element.text {
        out.push_str(&escape(text.as_str()));
    }
    for child in &element.children {
        write_element(out, child);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

/// Wrap serialised fragments into a complete document under `root`.
///
/// Fragments are joined with newlines; `attributes` go onto the root tag
/// unescaped, so they must be plain literals.
#[must_use]
pub fn wrap_document(root: &str, attributes: &[(&str, &str)], fragments: &[String]) -> String {
    let mut out = String::from(XML_DECLARATION);
    out.push('<');
    out.push_str(root);
    for (key, value) in attributes {
        out.push_str(&format!(" {key}=\"{value}\""));
    }
    out.push('>');
    out.push_str(&fragments.join("\n"));
    out.push_str("</");
    out.push_str(root);
    out.push('>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_element;

    #[test]
    fn test_empty_element_self_closes() {
        assert_eq!(to_xml(&Element::new("rent")), "<rent/>");
        assert_eq!(
            to_xml(&Element::new("region").with_attr("id", "1")),
            r#"<region id="1"/>"#
        );
    }

    #[test]
    fn test_present_but_empty_text_is_kept() {
        assert_eq!(to_xml(&Element::new("short").with_text("")), "<short></short>");
    }

    #[test]
    fn test_nested_serialisation_parses_back() {
        let order = Element::new("order")
            .with_attr("id", "3")
            .with_child(Element::new("type").with_attr("id", "2").with_text("продажа"))
            .with_child(
                Element::new("estate").with_child(Element::new("desc").with_text("<светлая>")),
            );
        let xml = to_xml(&order);
        assert_eq!(parse_element(&xml).unwrap(), order);
    }

    #[test]
    fn test_wrap_document() {
        let doc = wrap_document("orders", &[("rev", "1.0")], &["<a/>".to_string(), "<b/>".to_string()]);
        assert_eq!(
            doc,
            r#"<?xml version="1.0" encoding="UTF-8"?><orders rev="1.0"><a/>
<b/></orders>"#
        );
    }
}
