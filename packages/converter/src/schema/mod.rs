//! XSD validation of generated documents.
//!
//! Covers the subset of XSD the listing schemas use: global and local
//! element declarations, named and anonymous types, sequence/choice/all
//! groups with occurrence bounds, attributes, and restriction facets on
//! simple types. Unsupported constructs are skipped with a debug log.

mod loader;
mod model;
mod validator;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::Document as XmlDocument;

pub use loader::{parse_schema, XS_NAMESPACE};
pub use model::{
    AttributeDecl, Builtin, ComplexType, Content, ElementDecl, Facets, Occurs, Particle,
    SimpleType, TypeRef,
};

use crate::error::Result;
use crate::report::ErrorCollector;
use crate::types::Document;
use crate::xml::reader::strip_bom;
use validator::Validator;

/// A named global type.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Simple(SimpleType),
    Complex(ComplexType),
}

/// A loaded XSD schema.
#[derive(Debug, Clone)]
pub struct Schema {
    /// File name the schema was loaded from, used in messages.
    pub name: String,
    pub(crate) elements: HashMap<String, ElementDecl>,
    pub(crate) types: HashMap<String, TypeDef>,
}

/// One schema violation, positioned at the offending element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | at line {} at col {}", self.message, self.line, self.column)
    }
}

impl Schema {
    /// Load a schema from an XSD file.
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `XmlTree` or `Schema` if it is not a
    /// usable XSD.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::debug!(schema = %name, "Loaded XSD schema");
        parse_schema(&name, &text)
    }

    /// Parse a schema from XSD text.
    ///
    /// # Errors
    /// `XmlTree` or `Schema` if the text is not a usable XSD.
    pub fn parse(name: &str, xsd: &str) -> Result<Self> {
        parse_schema(name, xsd)
    }

    /// Whether a global element with this name is declared.
    #[must_use]
    pub fn declares(&self, element: &str) -> bool {
        self.elements.contains_key(element)
    }

    /// Validate a parsed document; an empty result means it is valid.
    #[must_use]
    pub fn validate(&self, doc: &XmlDocument<'_>) -> Vec<Violation> {
        let mut validator = Validator::new(self);
        validator.root(doc.root_element());
        validator.finish()
    }

    /// Parse and validate XML text.
    ///
    /// # Errors
    /// `XmlTree` if the text is not well-formed XML.
    ///
    /// # Examples
    /// ```
    /// use rex_converter::schema::Schema;
    ///
    /// let schema = Schema::parse("ids.xsd", r#"
    ///     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    ///       <xs:element name="id" type="xs:integer"/>
    ///     </xs:schema>"#).unwrap();
    /// assert!(schema.validate_str("<id>42</id>").unwrap().is_empty());
    /// assert_eq!(schema.validate_str("<id>x</id>").unwrap().len(), 1);
    /// ```
    pub fn validate_str(&self, xml: &str) -> Result<Vec<Violation>> {
        let doc = XmlDocument::parse(strip_bom(xml))?;
        Ok(self.validate(&doc))
    }
}

/// Validate a document against candidate schemas.
///
/// The first schema that accepts the document wins. If none does, the
/// violations found by the last usable schema are recorded as fatal errors
/// keyed by line number. Unusable schemas are skipped with a warning.
pub fn validate_document(doc: &Document, schemas: &[PathBuf], errors: &mut ErrorCollector) -> bool {
    let tree = match XmlDocument::parse(strip_bom(&doc.contents)) {
        Ok(tree) => tree,
        Err(e) => {
            errors.fatal(None, format!("{}: couldn't parse XML: {e}", doc.name));
            return false;
        }
    };

    let mut last: Option<(String, Vec<Violation>)> = None;
    for path in schemas {
        let schema = match Schema::load(path) {
            Ok(schema) => schema,
            Err(e) => {
                tracing::warn!(schema = %path.display(), error = %e, "Skipping unusable schema");
                errors.warn(None, format!("Couldn't use XSD schema {}: {e}", path.display()));
                continue;
            }
        };
        let violations = schema.validate(&tree);
        if violations.is_empty() {
            tracing::debug!(document = %doc.name, schema = %schema.name, "Document is valid");
            return true;
        }
        tracing::debug!(
            document = %doc.name,
            schema = %schema.name,
            violations = violations.len(),
            "Document rejected by schema"
        );
        last = Some((schema.name, violations));
    }

    match last {
        Some((schema, violations)) => {
            for violation in violations {
                errors.fatal(
                    Some(&violation.line.to_string()),
                    format!("{schema}: {violation}"),
                );
            }
        }
        None => errors.fatal(
            None,
            format!("{}: no usable XSD schema to validate against", doc.name),
        ),
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Level;
    use pretty_assertions::assert_eq;

    const FLATS_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="yesno">
    <xs:restriction base="xs:string">
      <xs:enumeration value="+"/>
      <xs:enumeration value="-"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="phone">
    <xs:restriction base="xs:string">
      <xs:pattern value="8[0-9]{10}"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:complexType name="area">
    <xs:attribute name="pl_ob" type="xs:decimal" use="required"/>
    <xs:attribute name="kitch">
      <xs:simpleType>
        <xs:restriction base="xs:integer">
          <xs:maxInclusive value="500"/>
        </xs:restriction>
      </xs:simpleType>
    </xs:attribute>
  </xs:complexType>
  <xs:complexType name="price">
    <xs:simpleContent>
      <xs:extension base="xs:decimal">
        <xs:attribute name="currency" type="xs:string"/>
      </xs:extension>
    </xs:simpleContent>
  </xs:complexType>
  <xs:element name="flats">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="flat" maxOccurs="unbounded">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="id" type="xs:positiveInteger"/>
              <xs:element name="nova" type="yesno" minOccurs="0"/>
              <xs:choice>
                <xs:element name="address" type="xs:string"/>
                <xs:element name="place_geo" type="xs:string"/>
              </xs:choice>
              <xs:element name="price" type="price"/>
              <xs:element name="sq" type="area"/>
              <xs:element name="telefon" type="phone" minOccurs="0" maxOccurs="3"/>
              <xs:any minOccurs="0" maxOccurs="unbounded"/>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    fn schema() -> Schema {
        Schema::parse("flats_spb.xsd", FLATS_XSD).unwrap()
    }

    fn flats(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<flats xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="flats_spb.xsd">
{body}
</flats>"#
        )
    }

    fn messages(xml: &str) -> Vec<String> {
        schema()
            .validate_str(xml)
            .unwrap()
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    const VALID_FLAT: &str = r#"<flat><id>7</id><nova>+</nova><address>Невский, 1</address><price currency="RUB">100</price><sq pl_ob="45.5" kitch="9"/><telefon>88121234567</telefon></flat>"#;

    #[test]
    fn test_declares_global_elements_only() {
        let schema = schema();
        assert!(schema.declares("flats"));
        assert!(!schema.declares("flat"));
    }

    #[test]
    fn test_valid_document() {
        assert_eq!(messages(&flats(VALID_FLAT)), Vec::<String>::new());
    }

    #[test]
    fn test_any_accepts_trailing_elements() {
        let flat = VALID_FLAT.replace("</flat>", "<remark>text</remark><photos>a.jpg</photos></flat>");
        assert!(messages(&flats(&flat)).is_empty());
    }

    #[test]
    fn test_missing_required_child() {
        let flat = r#"<flat><id>7</id><address>x</address><price>1</price></flat>"#;
        assert_eq!(
            messages(&flats(flat)),
            ["Element 'flat': Missing child element(s). Expected is ( sq )."]
        );
    }

    #[test]
    fn test_invalid_atomic_value() {
        let flat = VALID_FLAT.replace("<id>7</id>", "<id>abc</id>");
        assert_eq!(
            messages(&flats(&flat)),
            ["Element 'id': 'abc' is not a valid value of the atomic type 'xs:positiveInteger'."]
        );
    }

    #[test]
    fn test_enumeration_facet() {
        let flat = VALID_FLAT.replace("<nova>+</nova>", "<nova>да</nova>");
        assert_eq!(
            messages(&flats(&flat)),
            ["Element 'nova': [facet 'enumeration'] The value 'да' is not an element of the set {'+', '-'}."]
        );
    }

    #[test]
    fn test_pattern_facet() {
        let flat = VALID_FLAT.replace("88121234567", "1234");
        assert_eq!(
            messages(&flats(&flat)),
            ["Element 'telefon': [facet 'pattern'] The value '1234' is not accepted by the pattern '8[0-9]{10}'."]
        );
    }

    #[test]
    fn test_attribute_checks() {
        let flat = VALID_FLAT.replace(r#"<sq pl_ob="45.5" kitch="9"/>"#, r#"<sq kitch="900" extra="1"/>"#);
        assert_eq!(
            messages(&flats(&flat)),
            [
                "Element 'sq': The attribute 'pl_ob' is required but missing.",
                "Element 'sq', attribute 'kitch': [facet 'maxInclusive'] The value '900' is greater than the maximum value '500'.",
                "Element 'sq', attribute 'extra': The attribute 'extra' is not allowed.",
            ]
        );
    }

    #[test]
    fn test_simple_content_with_attribute() {
        let flat = VALID_FLAT.replace(r#"<price currency="RUB">100</price>"#, r#"<price currency="RUB">сто</price>"#);
        assert_eq!(
            messages(&flats(&flat)),
            ["Element 'price': 'сто' is not a valid value of the atomic type 'xs:decimal'."]
        );
    }

    #[test]
    fn test_choice_and_order() {
        let flat = VALID_FLAT.replace("<address>Невский, 1</address>", "");
        assert_eq!(
            messages(&flats(&flat)),
            ["Element 'price': This element is not expected. Expected is ( address, place_geo )."]
        );
    }

    #[test]
    fn test_max_occurs_exceeded_falls_to_any() {
        let phones = "<telefon>88121234567</telefon>".repeat(4);
        let flat = VALID_FLAT.replace("<telefon>88121234567</telefon>", &phones);
        // The fourth phone is taken by xs:any and not checked.
        assert!(messages(&flats(&flat)).is_empty());
    }

    #[test]
    fn test_element_only_content() {
        let xml = flats(&format!("stray text{VALID_FLAT}"));
        assert_eq!(
            messages(&xml),
            ["Element 'flats': Character content other than whitespace is not allowed because the content type is 'element-only'."]
        );
    }

    #[test]
    fn test_unknown_root() {
        assert_eq!(
            messages("<rent/>"),
            ["Element 'rent': No matching global declaration available for the validation root."]
        );
    }

    #[test]
    fn test_violation_position() {
        let xml = flats(&VALID_FLAT.replace("<id>7</id>", "<id>x</id>"));
        let violations = schema().validate_str(&xml).unwrap();
        assert_eq!(violations[0].line, 3);
        assert!(violations[0].column > 1);
    }

    #[test]
    fn test_validate_document_first_valid_schema_wins() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("rent_spb.xsd");
        let good = dir.path().join("flats_spb.xsd");
        std::fs::write(
            &other,
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element name="rent"/></xs:schema>"#,
        )
        .unwrap();
        std::fs::write(&good, FLATS_XSD).unwrap();

        let doc = Document::new("flats_spb.xml", flats(VALID_FLAT));
        let mut errors = ErrorCollector::new("export", "xsd");
        assert!(validate_document(&doc, &[other, good], &mut errors));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_document_records_last_violations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flats_spb.xsd");
        std::fs::write(&path, FLATS_XSD).unwrap();
        let missing = dir.path().join("missing.xsd");

        let doc = Document::new("flats_spb.xml", flats(&VALID_FLAT.replace("<id>7</id>", "<id>0</id>")));
        let mut errors = ErrorCollector::new("export", "xsd");
        assert!(!validate_document(&doc, &[missing, path], &mut errors));

        let records = errors.list();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, Level::Warn);
        assert_eq!(records[1].level, Level::Fatal);
        assert_eq!(records[1].id.as_deref(), Some("3"));
        assert!(records[1].message.starts_with("flats_spb.xsd: Element 'id'"));
        assert!(records[1].message.contains("| at line 3 at col"));
    }

    #[test]
    fn test_validate_document_unparseable_xml() {
        let doc = Document::new("broken.xml", "<flats>");
        let mut errors = ErrorCollector::new("export", "xsd");
        assert!(!validate_document(&doc, &[], &mut errors));
        assert!(errors.list()[0].message.contains("couldn't parse XML"));
    }
}
