//! In-memory form of an XSD schema.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// Built-in simple types that are checked lexically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    AnyType,
    String,
    NormalizedString,
    Token,
    AnyUri,
    Integer,
    Int,
    Long,
    Short,
    Byte,
    NonNegativeInteger,
    PositiveInteger,
    UnsignedInt,
    Decimal,
    Float,
    Double,
    Boolean,
    Date,
    DateTime,
}

impl Builtin {
    /// Look up a built-in type by its local name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "anyType" | "anySimpleType" => Self::AnyType,
            "string" => Self::String,
            "normalizedString" => Self::NormalizedString,
            "token" | "NMTOKEN" | "Name" | "NCName" | "language" | "ID" | "IDREF" => Self::Token,
            "anyURI" => Self::AnyUri,
            "integer" => Self::Integer,
            "int" => Self::Int,
            "long" => Self::Long,
            "short" => Self::Short,
            "byte" => Self::Byte,
            "nonNegativeInteger" | "unsignedLong" => Self::NonNegativeInteger,
            "positiveInteger" => Self::PositiveInteger,
            "unsignedInt" | "unsignedShort" | "unsignedByte" => Self::UnsignedInt,
            "decimal" => Self::Decimal,
            "float" => Self::Float,
            "double" => Self::Double,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            _ => return None,
        })
    }

    /// Name as written in messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AnyType => "xs:anyType",
            Self::String => "xs:string",
            Self::NormalizedString => "xs:normalizedString",
            Self::Token => "xs:token",
            Self::AnyUri => "xs:anyURI",
            Self::Integer => "xs:integer",
            Self::Int => "xs:int",
            Self::Long => "xs:long",
            Self::Short => "xs:short",
            Self::Byte => "xs:byte",
            Self::NonNegativeInteger => "xs:nonNegativeInteger",
            Self::PositiveInteger => "xs:positiveInteger",
            Self::UnsignedInt => "xs:unsignedInt",
            Self::Decimal => "xs:decimal",
            Self::Float => "xs:float",
            Self::Double => "xs:double",
            Self::Boolean => "xs:boolean",
            Self::Date => "xs:date",
            Self::DateTime => "xs:dateTime",
        }
    }

    /// Whether whitespace is collapsed before checking.
    fn collapses(self) -> bool {
        !matches!(self, Self::String | Self::NormalizedString | Self::AnyType)
    }

    /// Normalise whitespace the way the type's facet checks see the value.
    #[must_use]
    pub fn normalize<'v>(self, value: &'v str) -> std::borrow::Cow<'v, str> {
        if self.collapses() {
            let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed == value {
                std::borrow::Cow::Borrowed(value)
            } else {
                std::borrow::Cow::Owned(collapsed)
            }
        } else {
            std::borrow::Cow::Borrowed(value)
        }
    }

    /// Check the lexical form of a value.
    #[must_use]
    pub fn accepts(self, value: &str) -> bool {
        let v = self.normalize(value);
        let v = v.as_ref();
        match self {
            Self::AnyType | Self::String | Self::NormalizedString | Self::Token | Self::AnyUri => true,
            Self::Integer => integer(v).is_some(),
            Self::Int => integer(v).is_some_and(|n| i32::try_from(n).is_ok()),
            Self::Long => integer(v).is_some_and(|n| i64::try_from(n).is_ok()),
            Self::Short => integer(v).is_some_and(|n| i16::try_from(n).is_ok()),
            Self::Byte => integer(v).is_some_and(|n| i8::try_from(n).is_ok()),
            Self::NonNegativeInteger => integer(v).is_some_and(|n| n >= 0),
            Self::PositiveInteger => integer(v).is_some_and(|n| n > 0),
            Self::UnsignedInt => integer(v).is_some_and(|n| u32::try_from(n).is_ok()),
            Self::Decimal => decimal(v),
            Self::Float | Self::Double => {
                matches!(v, "INF" | "-INF" | "NaN") || (decimal_or_exp(v) && v.parse::<f64>().is_ok())
            }
            Self::Boolean => matches!(v, "true" | "false" | "1" | "0"),
            Self::Date => NaiveDate::parse_from_str(strip_timezone(v), "%Y-%m-%d").is_ok(),
            Self::DateTime => {
                chrono::DateTime::parse_from_rfc3339(v).is_ok()
                    || NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            }
        }
    }

    /// Whether values of this type are compared numerically by range facets.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::Int
                | Self::Long
                | Self::Short
                | Self::Byte
                | Self::NonNegativeInteger
                | Self::PositiveInteger
                | Self::UnsignedInt
                | Self::Decimal
                | Self::Float
                | Self::Double
        )
    }
}

fn integer(v: &str) -> Option<i128> {
    let digits = v.strip_prefix(['+', '-']).unwrap_or(v);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    v.parse::<i128>().ok()
}

fn decimal(v: &str) -> bool {
    let body = v.strip_prefix(['+', '-']).unwrap_or(v);
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    (!int.is_empty() || !frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

fn decimal_or_exp(v: &str) -> bool {
    match v.split_once(['e', 'E']) {
        Some((mantissa, exp)) => decimal(mantissa) && integer(exp).is_some(),
        None => decimal(v),
    }
}

fn strip_timezone(v: &str) -> &str {
    if let Some(rest) = v.strip_suffix('Z') {
        return rest;
    }
    let bytes = v.as_bytes();
    match bytes.len().checked_sub(6) {
        Some(at) if matches!(bytes[at], b'+' | b'-') && bytes[at + 3] == b':' => &v[..at],
        _ => v,
    }
}

/// Reference to a type, by name or inline.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Builtin(Builtin),
    /// A named type defined in the schema.
    Named(String),
    Simple(Box<SimpleType>),
    Complex(Box<ComplexType>),
}

/// Restriction facets of a simple type.
#[derive(Debug, Clone, Default)]
pub struct Facets {
    pub enumeration: Vec<String>,
    pub patterns: Vec<Regex>,
    pub min_inclusive: Option<f64>,
    pub max_inclusive: Option<f64>,
    pub min_exclusive: Option<f64>,
    pub max_exclusive: Option<f64>,
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// A simple type: a base type narrowed by facets.
#[derive(Debug, Clone)]
pub struct SimpleType {
    pub base: TypeRef,
    pub facets: Facets,
}

/// Occurrence bounds; `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    pub min: u32,
    pub max: Option<u32>,
}

impl Default for Occurs {
    fn default() -> Self {
        Self { min: 1, max: Some(1) }
    }
}

impl Occurs {
    /// Whether `n` more occurrences are allowed.
    #[must_use]
    pub fn allows(&self, n: u32) -> bool {
        self.max.is_none_or(|max| n < max)
    }
}

/// An element declaration.
#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub name: String,
    /// `None` when neither a type nor an inline definition is given.
    pub type_ref: Option<TypeRef>,
}

/// A content model particle.
#[derive(Debug, Clone)]
pub enum Particle {
    Element(ElementDecl, Occurs),
    /// `ref` to a global element.
    Ref(String, Occurs),
    Sequence(Vec<Particle>, Occurs),
    Choice(Vec<Particle>, Occurs),
    All(Vec<Particle>, Occurs),
    /// `xs:any`.
    Any(Occurs),
}

impl Particle {
    #[must_use]
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Element(_, o)
            | Self::Ref(_, o)
            | Self::Sequence(_, o)
            | Self::Choice(_, o)
            | Self::All(_, o)
            | Self::Any(o) => *o,
        }
    }
}

/// An attribute declaration.
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: String,
    pub type_ref: Option<TypeRef>,
    pub required: bool,
}

/// Content of a complex type.
#[derive(Debug, Clone)]
pub enum Content {
    /// No child elements and no text.
    Empty,
    /// Child elements.
    Elements(Particle),
    /// Text of a simple type.
    Simple(TypeRef),
}

/// A complex type.
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Named complex type this one extends.
    pub base: Option<String>,
    pub content: Content,
    pub attributes: Vec<AttributeDecl>,
    pub any_attribute: bool,
    pub mixed: bool,
}
