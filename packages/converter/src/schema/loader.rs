//! Building a [`Schema`] from XSD text.

use std::collections::HashMap;

use regex::Regex;
use roxmltree::{Document, Node};

use super::model::{
    AttributeDecl, Builtin, ComplexType, Content, ElementDecl, Facets, Occurs, Particle,
    SimpleType, TypeRef,
};
use super::{Schema, TypeDef};
use crate::error::{ConvertError, Result};
use crate::xml::reader::strip_bom;
use crate::xml::{element_children, get_tag_name};

/// Namespace of XSD itself.
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

struct Loader<'n> {
    name: &'n str,
}

impl Loader<'_> {
    fn error(&self, reason: impl Into<String>) -> ConvertError {
        ConvertError::Schema {
            name: self.name.to_string(),
            reason: reason.into(),
        }
    }

    fn required_attr<'a>(&self, node: Node<'a, '_>, attr: &str) -> Result<&'a str> {
        node.attribute(attr).ok_or_else(|| {
            let (line, _) = crate::xml::node_position(node);
            self.error(format!(
                "<{}> without '{attr}' at line {line}",
                get_tag_name(node)
            ))
        })
    }

    /// Resolve a `prefix:name` type reference.
    fn type_ref(&self, node: Node<'_, '_>, qname: &str) -> TypeRef {
        let (prefix, local) = match qname.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, qname),
        };
        if node.lookup_namespace_uri(prefix) == Some(XS_NAMESPACE) {
            return TypeRef::Builtin(Builtin::from_name(local).unwrap_or(Builtin::AnyType));
        }
        TypeRef::Named(local.to_string())
    }

    fn occurs(&self, node: Node<'_, '_>) -> Result<Occurs> {
        let parse = |attr: &str, value: &str| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| self.error(format!("invalid {attr} '{value}'")))
        };
        let min = node
            .attribute("minOccurs")
            .map(|v| parse("minOccurs", v))
            .transpose()?
            .unwrap_or(1);
        let max = match node.attribute("maxOccurs") {
            Some("unbounded") => None,
            Some(v) => Some(parse("maxOccurs", v)?),
            None => Some(1),
        };
        Ok(Occurs { min, max })
    }

    fn element(&self, node: Node<'_, '_>) -> Result<Particle> {
        let occurs = self.occurs(node)?;
        if let Some(reference) = node.attribute("ref") {
            let local = reference.rsplit(':').next().unwrap_or(reference);
            return Ok(Particle::Ref(local.to_string(), occurs));
        }
        Ok(Particle::Element(self.element_decl(node)?, occurs))
    }

    fn element_decl(&self, node: Node<'_, '_>) -> Result<ElementDecl> {
        let name = self.required_attr(node, "name")?.to_string();
        let type_ref = if let Some(t) = node.attribute("type") {
            Some(self.type_ref(node, t))
        } else {
            self.inline_type(node)?
        };
        Ok(ElementDecl { name, type_ref })
    }

    fn inline_type(&self, node: Node<'_, '_>) -> Result<Option<TypeRef>> {
        for child in element_children(node) {
            match get_tag_name(child) {
                "complexType" => return Ok(Some(TypeRef::Complex(Box::new(self.complex(child)?)))),
                "simpleType" => return Ok(Some(TypeRef::Simple(Box::new(self.simple(child)?)))),
                _ => {}
            }
        }
        Ok(None)
    }

    fn group(&self, node: Node<'_, '_>) -> Result<Particle> {
        let occurs = self.occurs(node)?;
        let mut items = Vec::new();
        for child in element_children(node) {
            match get_tag_name(child) {
                "element" => items.push(self.element(child)?),
                "sequence" | "choice" | "all" => items.push(self.group(child)?),
                "any" => items.push(Particle::Any(self.occurs(child)?)),
                "annotation" => {}
                other => tracing::debug!(schema = self.name, tag = other, "Ignoring unsupported particle"),
            }
        }
        Ok(match get_tag_name(node) {
            "choice" => Particle::Choice(items, occurs),
            "all" => Particle::All(items, occurs),
            _ => Particle::Sequence(items, occurs),
        })
    }

    fn attribute(&self, node: Node<'_, '_>) -> Result<AttributeDecl> {
        let name = match (node.attribute("name"), node.attribute("ref")) {
            (Some(name), _) => name.to_string(),
            (None, Some(reference)) => reference.rsplit(':').next().unwrap_or(reference).to_string(),
            (None, None) => return Err(self.error("<attribute> without 'name' or 'ref'")),
        };
        let type_ref = match node.attribute("type") {
            Some(t) => Some(self.type_ref(node, t)),
            None => self.inline_type(node)?,
        };
        Ok(AttributeDecl {
            name,
            type_ref,
            required: node.attribute("use") == Some("required"),
        })
    }

    /// Read attribute declarations and `anyAttribute` among the children.
    fn attributes(&self, node: Node<'_, '_>, into: &mut ComplexType) -> Result<()> {
        for child in element_children(node) {
            match get_tag_name(child) {
                "attribute" => into.attributes.push(self.attribute(child)?),
                "anyAttribute" => into.any_attribute = true,
                _ => {}
            }
        }
        Ok(())
    }

    fn complex(&self, node: Node<'_, '_>) -> Result<ComplexType> {
        let mut ty = ComplexType {
            base: None,
            content: Content::Empty,
            attributes: Vec::new(),
            any_attribute: false,
            mixed: node.attribute("mixed") == Some("true"),
        };
        self.attributes(node, &mut ty)?;

        for child in element_children(node) {
            match get_tag_name(child) {
                "sequence" | "choice" | "all" => ty.content = Content::Elements(self.group(child)?),
                "simpleContent" => {
                    for derivation in element_children(child) {
                        let base = self.required_attr(derivation, "base")?;
                        ty.content = Content::Simple(self.type_ref(derivation, base));
                        self.attributes(derivation, &mut ty)?;
                    }
                }
                "complexContent" => {
                    for derivation in element_children(child) {
                        if get_tag_name(derivation) == "extension" {
                            let base = self.required_attr(derivation, "base")?;
                            if let TypeRef::Named(name) = self.type_ref(derivation, base) {
                                ty.base = Some(name);
                            }
                        }
                        for part in element_children(derivation) {
                            if matches!(get_tag_name(part), "sequence" | "choice" | "all") {
                                ty.content = Content::Elements(self.group(part)?);
                            }
                        }
                        self.attributes(derivation, &mut ty)?;
                    }
                }
                _ => {}
            }
        }
        Ok(ty)
    }

    fn simple(&self, node: Node<'_, '_>) -> Result<SimpleType> {
        for child in element_children(node) {
            match get_tag_name(child) {
                "restriction" => return self.restriction(child),
                "list" | "union" => {
                    return Ok(SimpleType {
                        base: TypeRef::Builtin(Builtin::String),
                        facets: Facets::default(),
                    })
                }
                _ => {}
            }
        }
        Err(self.error("<simpleType> without restriction, list or union"))
    }

    fn restriction(&self, node: Node<'_, '_>) -> Result<SimpleType> {
        let base = match node.attribute("base") {
            Some(b) => self.type_ref(node, b),
            None => match self.inline_type(node)? {
                Some(t) => t,
                None => return Err(self.error("<restriction> without base")),
            },
        };

        let mut facets = Facets::default();
        for facet in element_children(node) {
            let Some(value) = facet.attribute("value") else {
                continue;
            };
            let number = || {
                value
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| self.error(format!("invalid {} '{value}'", get_tag_name(facet))))
            };
            let length = || {
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| self.error(format!("invalid {} '{value}'", get_tag_name(facet))))
            };
            match get_tag_name(facet) {
                "enumeration" => facets.enumeration.push(value.to_string()),
                "pattern" => {
                    let regex = Regex::new(&format!("^(?:{value})$"))
                        .map_err(|e| self.error(format!("invalid pattern '{value}': {e}")))?;
                    facets.patterns.push(regex);
                }
                "minInclusive" => facets.min_inclusive = Some(number()?),
                "maxInclusive" => facets.max_inclusive = Some(number()?),
                "minExclusive" => facets.min_exclusive = Some(number()?),
                "maxExclusive" => facets.max_exclusive = Some(number()?),
                "length" => facets.length = Some(length()?),
                "minLength" => facets.min_length = Some(length()?),
                "maxLength" => facets.max_length = Some(length()?),
                _ => {}
            }
        }
        Ok(SimpleType { base, facets })
    }
}

/// Parse XSD text into a schema named `name`.
///
/// # Errors
/// `XmlTree` if the text is not XML, `Schema` if it is not a usable XSD.
pub fn parse_schema(name: &str, xsd: &str) -> Result<Schema> {
    let doc = Document::parse(strip_bom(xsd))?;
    let root = doc.root_element();
    let loader = Loader { name };
    if get_tag_name(root) != "schema" || root.tag_name().namespace() != Some(XS_NAMESPACE) {
        return Err(loader.error("root element is not xs:schema"));
    }

    let mut elements = HashMap::new();
    let mut types = HashMap::new();
    for child in element_children(root) {
        match get_tag_name(child) {
            "element" => {
                let decl = loader.element_decl(child)?;
                elements.insert(decl.name.clone(), decl);
            }
            "complexType" => {
                let name = loader.required_attr(child, "name")?.to_string();
                types.insert(name, TypeDef::Complex(loader.complex(child)?));
            }
            "simpleType" => {
                let name = loader.required_attr(child, "name")?.to_string();
                types.insert(name, TypeDef::Simple(loader.simple(child)?));
            }
            "annotation" => {}
            other => tracing::debug!(schema = name, tag = other, "Ignoring unsupported declaration"),
        }
    }

    if elements.is_empty() {
        return Err(loader.error("no global element declarations"));
    }

    Ok(Schema {
        name: name.to_string(),
        elements,
        types,
    })
}
