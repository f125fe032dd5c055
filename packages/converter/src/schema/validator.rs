//! Checking a parsed document against a [`Schema`].
//!
//! Content models are matched greedily: every particle takes as many
//! children as it can before the next one is tried. That is exact for the
//! deterministic models XSD requires. Messages follow the wording of
//! libxml2 so reports stay familiar to people used to `xmllint`.

use roxmltree::Node;

use super::model::{
    AttributeDecl, Builtin, ComplexType, Content, ElementDecl, Particle, SimpleType, TypeRef,
};
use super::{Schema, TypeDef, Violation};
use crate::config::XSI_NAMESPACE;
use crate::xml::{element_children, get_tag_name, node_position};

/// Guard against self-referencing named simple types.
const MAX_TYPE_DEPTH: usize = 32;

/// What a child element was matched against.
#[derive(Clone, Copy)]
enum Slot<'s> {
    Decl(&'s ElementDecl),
    Any,
}

/// A content model could not continue at child `at`.
struct Miss {
    at: usize,
    expected: Vec<String>,
}

pub(super) struct Validator<'s> {
    schema: &'s Schema,
    violations: Vec<Violation>,
}

impl<'s> Validator<'s> {
    pub(super) fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            violations: Vec::new(),
        }
    }

    pub(super) fn finish(self) -> Vec<Violation> {
        self.violations
    }

    fn report(&mut self, node: Node<'_, '_>, message: String) {
        let (line, column) = node_position(node);
        self.violations.push(Violation {
            message,
            line,
            column,
        });
    }

    pub(super) fn root(&mut self, node: Node<'_, '_>) {
        let name = get_tag_name(node);
        match self.schema.elements.get(name) {
            Some(decl) => self.element(node, decl),
            None => self.report(
                node,
                format!("Element '{name}': No matching global declaration available for the validation root."),
            ),
        }
    }

    fn element(&mut self, node: Node<'_, '_>, decl: &'s ElementDecl) {
        // Untyped declarations accept anything.
        if let Some(type_ref) = &decl.type_ref {
            self.typed(node, type_ref);
        }
    }

    fn typed(&mut self, node: Node<'_, '_>, type_ref: &'s TypeRef) {
        match type_ref {
            TypeRef::Builtin(Builtin::AnyType) => {}
            TypeRef::Builtin(_) | TypeRef::Simple(_) => self.simple_element(node, type_ref),
            TypeRef::Complex(complex) => self.complex_element(node, complex),
            TypeRef::Named(name) => match self.schema.types.get(name) {
                Some(TypeDef::Simple(_)) => self.simple_element(node, type_ref),
                Some(TypeDef::Complex(complex)) => self.complex_element(node, complex),
                None => self.report(
                    node,
                    format!("Element '{}': The type '{name}' is not defined.", get_tag_name(node)),
                ),
            },
        }
    }

    fn simple_element(&mut self, node: Node<'_, '_>, type_ref: &'s TypeRef) {
        let name = get_tag_name(node);
        if element_children(node).next().is_some() {
            self.report(
                node,
                format!("Element '{name}': Element content is not allowed, because the type definition is simple."),
            );
            return;
        }
        for attr in node.attributes() {
            if attr.namespace() != Some(XSI_NAMESPACE) {
                self.report(
                    node,
                    format!(
                        "Element '{name}', attribute '{}': The attribute '{}' is not allowed.",
                        attr.name(),
                        attr.name()
                    ),
                );
            }
        }
        let text = direct_text(node);
        if let Err(reason) = self.check_value(type_ref, &text, 0) {
            self.report(node, format!("Element '{name}': {reason}"));
        }
    }

    fn complex_element(&mut self, node: Node<'_, '_>, complex: &'s ComplexType) {
        let name = get_tag_name(node);
        let (attributes, any_attribute) = self.effective_attributes(complex);
        self.check_attributes(node, &attributes, any_attribute);

        let text = direct_text(node);
        match self.effective_content(complex) {
            None => {
                for child in element_children(node) {
                    self.report(
                        child,
                        format!("Element '{}': This element is not expected.", get_tag_name(child)),
                    );
                }
                if !complex.mixed && !text.trim().is_empty() {
                    self.report(
                        node,
                        format!("Element '{name}': Character content is not allowed, because the content type is empty."),
                    );
                }
            }
            Some(ContentRef::Simple(type_ref)) => self.simple_content(node, type_ref, &text),
            Some(ContentRef::Elements(particles)) => {
                if !complex.mixed && !text.trim().is_empty() {
                    self.report(
                        node,
                        format!("Element '{name}': Character content other than whitespace is not allowed because the content type is 'element-only'."),
                    );
                }
                self.children(node, &particles);
            }
        }
    }

    fn simple_content(&mut self, node: Node<'_, '_>, type_ref: &'s TypeRef, text: &str) {
        let name = get_tag_name(node);
        if element_children(node).next().is_some() {
            self.report(
                node,
                format!("Element '{name}': Element content is not allowed, because the content type is a simple type definition."),
            );
            return;
        }
        if let Err(reason) = self.check_value(type_ref, text, 0) {
            self.report(node, format!("Element '{name}': {reason}"));
        }
    }

    fn check_attributes(
        &mut self,
        node: Node<'_, '_>,
        declared: &[&'s AttributeDecl],
        any_attribute: bool,
    ) {
        let name = get_tag_name(node);
        for decl in declared {
            match node.attribute(decl.name.as_str()) {
                None if decl.required => self.report(
                    node,
                    format!(
                        "Element '{name}': The attribute '{}' is required but missing.",
                        decl.name
                    ),
                ),
                None => {}
                Some(value) => {
                    if let Some(type_ref) = &decl.type_ref {
                        if let Err(reason) = self.check_value(type_ref, value, 0) {
                            self.report(
                                node,
                                format!("Element '{name}', attribute '{}': {reason}", decl.name),
                            );
                        }
                    }
                }
            }
        }
        if any_attribute {
            return;
        }
        for attr in node.attributes() {
            if attr.namespace() == Some(XSI_NAMESPACE) {
                continue;
            }
            if !declared.iter().any(|d| d.name == attr.name()) {
                self.report(
                    node,
                    format!(
                        "Element '{name}', attribute '{}': The attribute '{}' is not allowed.",
                        attr.name(),
                        attr.name()
                    ),
                );
            }
        }
    }

    /// Attributes of a complex type including those of its base types.
    fn effective_attributes(&self, complex: &'s ComplexType) -> (Vec<&'s AttributeDecl>, bool) {
        let mut attributes: Vec<&AttributeDecl> = complex.attributes.iter().collect();
        let mut any = complex.any_attribute;
        let mut base = complex.base.as_deref();
        let mut depth = 0;
        while let Some(Some(TypeDef::Complex(parent))) = base.map(|b| self.schema.types.get(b)) {
            attributes.extend(parent.attributes.iter());
            any |= parent.any_attribute;
            base = parent.base.as_deref();
            depth += 1;
            if depth > MAX_TYPE_DEPTH {
                break;
            }
        }
        (attributes, any)
    }

    /// Content model of a complex type with base type content prepended.
    fn effective_content(&self, complex: &'s ComplexType) -> Option<ContentRef<'s>> {
        let mut chain = vec![complex];
        let mut base = complex.base.as_deref();
        while let Some(Some(TypeDef::Complex(parent))) = base.map(|b| self.schema.types.get(b)) {
            if chain.len() > MAX_TYPE_DEPTH {
                break;
            }
            chain.push(parent);
            base = parent.base.as_deref();
        }

        let mut particles = Vec::new();
        for ty in chain.iter().rev() {
            match &ty.content {
                Content::Empty => {}
                Content::Simple(type_ref) => return Some(ContentRef::Simple(type_ref)),
                Content::Elements(particle) => particles.push(particle),
            }
        }
        (!particles.is_empty()).then_some(ContentRef::Elements(particles))
    }

    fn children(&mut self, node: Node<'_, '_>, particles: &[&'s Particle]) {
        let children: Vec<Node<'_, '_>> = element_children(node).collect();
        let names: Vec<&str> = children.iter().map(|c| get_tag_name(*c)).collect();

        let mut slots = Vec::new();
        let mut outcome = Ok(0);
        for &particle in particles {
            let pos = match outcome {
                Ok(pos) => pos,
                Err(_) => break,
            };
            outcome = self.repeated(particle, &names, pos, &mut slots);
        }

        match outcome {
            Ok(end) if end < children.len() => self.report(
                children[end],
                format!("Element '{}': This element is not expected.", names[end]),
            ),
            Ok(_) => {}
            Err(miss) => {
                let expected = miss.expected.join(", ");
                if let Some(child) = children.get(miss.at) {
                    self.report(
                        *child,
                        format!(
                            "Element '{}': This element is not expected. Expected is ( {expected} ).",
                            names[miss.at]
                        ),
                    );
                } else {
                    self.report(
                        node,
                        format!(
                            "Element '{}': Missing child element(s). Expected is ( {expected} ).",
                            get_tag_name(node)
                        ),
                    );
                }
            }
        }

        for (index, slot) in slots {
            if let Slot::Decl(decl) = slot {
                self.element(children[index], decl);
            }
        }
    }

    /// Match a particle as many times as its occurrence bounds allow.
    fn repeated(
        &self,
        particle: &'s Particle,
        names: &[&str],
        pos: usize,
        out: &mut Vec<(usize, Slot<'s>)>,
    ) -> Result<usize, Miss> {
        let occurs = particle.occurs();
        let mut count = 0;
        let mut cur = pos;
        while occurs.allows(count) {
            let mut trial = Vec::new();
            match self.once(particle, names, cur, &mut trial) {
                Ok(next) if next > cur => {
                    out.extend(trial);
                    cur = next;
                    count += 1;
                }
                // An empty match satisfies any remaining minimum.
                Ok(_) => return Ok(cur),
                Err(_) if count >= occurs.min => break,
                Err(miss) => {
                    out.extend(trial);
                    return Err(miss);
                }
            }
        }
        Ok(cur)
    }

    fn once(
        &self,
        particle: &'s Particle,
        names: &[&str],
        pos: usize,
        out: &mut Vec<(usize, Slot<'s>)>,
    ) -> Result<usize, Miss> {
        match particle {
            Particle::Element(decl, _) => Self::single(decl, names, pos, out),
            Particle::Ref(name, _) => match self.schema.elements.get(name) {
                Some(decl) => Self::single(decl, names, pos, out),
                None => Err(Miss {
                    at: pos,
                    expected: vec![name.clone()],
                }),
            },
            Particle::Any(_) => {
                if pos < names.len() {
                    out.push((pos, Slot::Any));
                    Ok(pos + 1)
                } else {
                    Err(Miss {
                        at: pos,
                        expected: vec!["##any".to_string()],
                    })
                }
            }
            Particle::Sequence(items, _) => {
                let mut cur = pos;
                for item in items {
                    cur = self.repeated(item, names, cur, out)?;
                }
                Ok(cur)
            }
            Particle::Choice(items, _) => {
                let mut empty = false;
                let mut expected = Vec::new();
                for item in items {
                    let mut trial = Vec::new();
                    match self.repeated(item, names, pos, &mut trial) {
                        Ok(next) if next > pos => {
                            out.extend(trial);
                            return Ok(next);
                        }
                        Ok(_) => empty = true,
                        Err(miss) => expected.extend(miss.expected),
                    }
                }
                if empty {
                    Ok(pos)
                } else {
                    Err(Miss { at: pos, expected })
                }
            }
            Particle::All(items, _) => {
                let mut used = vec![false; items.len()];
                let mut cur = pos;
                'next: while cur < names.len() {
                    for (i, item) in items.iter().enumerate() {
                        if used[i] {
                            continue;
                        }
                        let mut trial = Vec::new();
                        if let Ok(next) = self.once(item, names, cur, &mut trial) {
                            if next > cur {
                                out.extend(trial);
                                used[i] = true;
                                cur = next;
                                continue 'next;
                            }
                        }
                    }
                    break;
                }
                let missing: Vec<String> = items
                    .iter()
                    .zip(&used)
                    .filter(|(item, used)| !**used && item.occurs().min > 0)
                    .flat_map(|(item, _)| self.first_names(item))
                    .collect();
                if missing.is_empty() {
                    Ok(cur)
                } else {
                    Err(Miss {
                        at: cur,
                        expected: missing,
                    })
                }
            }
        }
    }

    fn single(
        decl: &'s ElementDecl,
        names: &[&str],
        pos: usize,
        out: &mut Vec<(usize, Slot<'s>)>,
    ) -> Result<usize, Miss> {
        if names.get(pos) == Some(&decl.name.as_str()) {
            out.push((pos, Slot::Decl(decl)));
            Ok(pos + 1)
        } else {
            Err(Miss {
                at: pos,
                expected: vec![decl.name.clone()],
            })
        }
    }

    /// Element names that can start a particle, for messages.
    fn first_names(&self, particle: &Particle) -> Vec<String> {
        match particle {
            Particle::Element(decl, _) => vec![decl.name.clone()],
            Particle::Ref(name, _) => vec![name.clone()],
            Particle::Any(_) => vec!["##any".to_string()],
            Particle::Sequence(items, _) => items
                .first()
                .map(|item| self.first_names(item))
                .unwrap_or_default(),
            Particle::Choice(items, _) | Particle::All(items, _) => {
                items.iter().flat_map(|item| self.first_names(item)).collect()
            }
        }
    }

    /// Check a text value against a simple type.
    fn check_value(&self, type_ref: &TypeRef, value: &str, depth: usize) -> Result<(), String> {
        if depth > MAX_TYPE_DEPTH {
            return Ok(());
        }
        match type_ref {
            TypeRef::Builtin(builtin) => {
                if builtin.accepts(value) {
                    Ok(())
                } else {
                    Err(format!(
                        "'{value}' is not a valid value of the atomic type '{}'.",
                        builtin.name()
                    ))
                }
            }
            TypeRef::Simple(simple) => self.check_simple(simple, value, depth),
            TypeRef::Named(name) => match self.schema.types.get(name) {
                Some(TypeDef::Simple(simple)) => self.check_simple(simple, value, depth),
                Some(TypeDef::Complex(_)) => Err(format!("The type '{name}' is not a simple type.")),
                None => Err(format!("The type '{name}' is not defined.")),
            },
            TypeRef::Complex(_) => Err("An anonymous complex type is not a simple type.".to_string()),
        }
    }

    fn check_simple(&self, simple: &SimpleType, value: &str, depth: usize) -> Result<(), String> {
        self.check_value(&simple.base, value, depth + 1)?;

        let builtin = self.root_builtin(&simple.base, depth);
        let value = builtin.normalize(value);
        let value = value.as_ref();
        let facets = &simple.facets;

        if !facets.enumeration.is_empty() && !facets.enumeration.iter().any(|e| e == value) {
            let set = facets
                .enumeration
                .iter()
                .map(|e| format!("'{e}'"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(format!(
                "[facet 'enumeration'] The value '{value}' is not an element of the set {{{set}}}."
            ));
        }
        if !facets.patterns.is_empty() && !facets.patterns.iter().any(|p| p.is_match(value)) {
            let pattern = facets.patterns[0].as_str();
            let pattern = pattern
                .strip_prefix("^(?:")
                .and_then(|p| p.strip_suffix(")$"))
                .unwrap_or(pattern);
            return Err(format!(
                "[facet 'pattern'] The value '{value}' is not accepted by the pattern '{pattern}'."
            ));
        }

        let length = value.chars().count();
        if let Some(expected) = facets.length.filter(|&l| l != length) {
            return Err(format!(
                "[facet 'length'] The value has a length of '{length}'; this differs from the allowed length of '{expected}'."
            ));
        }
        if let Some(min) = facets.min_length.filter(|&l| length < l) {
            return Err(format!(
                "[facet 'minLength'] The value has a length of '{length}'; this underruns the allowed minimum length of '{min}'."
            ));
        }
        if let Some(max) = facets.max_length.filter(|&l| length > l) {
            return Err(format!(
                "[facet 'maxLength'] The value has a length of '{length}'; this exceeds the allowed maximum length of '{max}'."
            ));
        }

        if let Some(number) = builtin.is_numeric().then(|| value.trim().parse::<f64>().ok()).flatten() {
            let bound = |facet: &str, limit: f64, relation: &str| -> Result<(), String> {
                Err(format!(
                    "[facet '{facet}'] The value '{value}' is {relation} the {} value '{}'.",
                    if facet.starts_with("min") { "minimum" } else { "maximum" },
                    crate::numbers::format_number(limit)
                ))
            };
            if let Some(min) = facets.min_inclusive.filter(|&m| number < m) {
                return bound("minInclusive", min, "less than");
            }
            if let Some(max) = facets.max_inclusive.filter(|&m| number > m) {
                return bound("maxInclusive", max, "greater than");
            }
            if let Some(min) = facets.min_exclusive.filter(|&m| number <= m) {
                return bound("minExclusive", min, "less than or equal to");
            }
            if let Some(max) = facets.max_exclusive.filter(|&m| number >= m) {
                return bound("maxExclusive", max, "greater than or equal to");
            }
        }
        Ok(())
    }

    /// The built-in type a simple type is ultimately derived from.
    fn root_builtin(&self, type_ref: &TypeRef, depth: usize) -> Builtin {
        if depth > MAX_TYPE_DEPTH {
            return Builtin::String;
        }
        match type_ref {
            TypeRef::Builtin(builtin) => *builtin,
            TypeRef::Simple(simple) => self.root_builtin(&simple.base, depth + 1),
            TypeRef::Named(name) => match self.schema.types.get(name) {
                Some(TypeDef::Simple(simple)) => self.root_builtin(&simple.base, depth + 1),
                _ => Builtin::String,
            },
            TypeRef::Complex(_) => Builtin::String,
        }
    }
}

enum ContentRef<'s> {
    Simple(&'s TypeRef),
    Elements(Vec<&'s Particle>),
}

/// Concatenated direct text of a node, without descendant text.
fn direct_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect()
}
