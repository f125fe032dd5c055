//! Building listing trees from quick-xml events.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ConvertError, Result};
use crate::tree::Element;

/// Remove a leading byte-order mark.
pub fn strip_bom(xml: &str) -> &str {
    xml.strip_prefix('\u{feff}').unwrap_or(xml)
}

/// Create a reader over an in-memory document that keeps whitespace as-is.
pub(crate) fn reader_for(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(strip_bom(xml));
    reader.trim_text(false);
    reader.check_end_names(true);
    reader
}

/// Create an element (without children) from a start tag.
pub(crate) fn start_element(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Append character data to an element's text.
///
/// Whitespace-only runs are dropped so indentation between child elements
/// does not turn into text.
pub(crate) fn append_text(element: &mut Element, text: Cow<'_, str>) {
    if text.trim().is_empty() {
        return;
    }
    match element.text.as_mut() {
        Some(existing) => existing.push_str(&text),
        None => element.text = Some(text.into_owned()),
    }
}

/// Parse a complete document and return its root element.
///
/// # Errors
/// Returns an error on malformed XML, unclosed elements or an empty document.
///
/// # Examples
/// ```
/// use rex_converter::xml::parse_element;
///
/// let order = parse_element(r#"<order id="1"><type id="2">продажа</type></order>"#).unwrap();
/// assert_eq!(order.value_at("type@id"), Some("2"));
/// ```
pub fn parse_element(xml: &str) -> Result<Element> {
    let mut reader = reader_for(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(start_element(&e)?),
            Event::Empty(e) => {
                let element = start_element(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.push(element),
                    None => root = root.or(Some(element)),
                }
            }
            Event::End(_) => {
                if let Some(done) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.push(done),
                        None => root = root.or(Some(done)),
                    }
                }
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    append_text(current, e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    append_text(current, String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConvertError::Xml(quick_xml::Error::UnexpectedEof(format!(
            "element <{}> is not closed",
            open.name
        ))));
    }
    root.ok_or_else(|| {
        ConvertError::Xml(quick_xml::Error::UnexpectedEof("document has no root element".into()))
    })
}
