//! Mandatory Field Matrix: required fields per direction and subtype.
//!
//! Paths use the [`Element::value_at`] syntax and are checked against the
//! converted listing. A field is present when its value is not blank.

use std::fmt;

use super::routing::Subtype;
use crate::tree::Element;
use crate::types::Direction;

/// What must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Value(&'static str),
    /// At least one of the paths.
    AnyOf(&'static [&'static str]),
}

/// When a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// Sale of a room.
    SellRoom,
    /// Any sale.
    Sell,
    /// Listings in the city region.
    City,
    /// Only when the element at the path exists in the listing.
    Present(&'static str),
}

/// One required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub check: Check,
    pub description: &'static str,
    pub when: Condition,
}

impl Rule {
    const fn field(path: &'static str, description: &'static str) -> Self {
        Self {
            check: Check::Value(path),
            description,
            when: Condition::Always,
        }
    }

    const fn when(mut self, when: Condition) -> Self {
        self.when = when;
        self
    }

    const fn any(paths: &'static [&'static str], description: &'static str) -> Self {
        Self {
            check: Check::AnyOf(paths),
            description,
            when: Condition::Always,
        }
    }

    fn applies(&self, facts: &Facts, listing: &Element) -> bool {
        match self.when {
            Condition::Always => true,
            Condition::SellRoom => facts.deal_type == 2 && facts.object_type == 2,
            Condition::Sell => facts.deal_type == 2,
            Condition::City => facts.city,
            Condition::Present(path) => listing.find(path).is_some(),
        }
    }

    fn satisfied(&self, listing: &Element) -> bool {
        let present = |path: &str| listing.value_at(path).is_some_and(|v| !v.trim().is_empty());
        match self.check {
            Check::Value(path) => present(path),
            Check::AnyOf(paths) => paths.iter().any(|p| present(p)),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.check {
            Check::Value(path) => write!(f, "Missing {} ({path})", self.description),
            Check::AnyOf(paths) => write!(f, "Missing {} ({})", self.description, paths.join(" or ")),
        }
    }
}

/// Facts about the source listing that conditions depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Facts {
    pub deal_type: i64,
    pub object_type: i64,
    pub city: bool,
}

const EXPORT_COMMON: &[Rule] = &[
    Rule::field("id", "object ID"),
    Rule::field("date", "object last update date"),
    Rule::field("aptp", "object type"),
    Rule::field("region_geo", "region"),
    Rule::field("area_geo", "area"),
    Rule::field("place_geo", "location place name"),
    Rule::field("telefon", "agent phone number"),
    Rule::field("metro", "metro").when(Condition::City),
];

const EXPORT_FLATS: &[Rule] = &[
    Rule::field("actual", "object actuality"),
    Rule::field("address", "object address"),
    Rule::field("nova", "whether object is a new building"),
    Rule::field("dom", "house number"),
    Rule::field("price", "price"),
    Rule::field("floor", "floor"),
    Rule::field("fl_ob", "total number of floors"),
    Rule::field("sq@pl_ob", "total flat space"),
    Rule::field("flats", "full number of rooms in flat"),
    Rule::field("rooms", "actual number of rooms in flat").when(Condition::SellRoom),
];

const EXPORT_RENT: &[Rule] = &[
    Rule::field("price", "price"),
    Rule::field("flats", "full number of rooms in flat"),
    Rule::field("rooms", "actual number of rooms in flat").when(Condition::Sell),
    Rule::field("sq@pl_ob", "total flat space"),
    Rule::field("floor", "floor"),
    Rule::field("fl_ob", "total number of floors"),
];

const EXPORT_COMMERCIAL: &[Rule] = &[
    Rule::field("actual", "object actuality"),
    Rule::field("optp", "operation type"),
    Rule::field("address", "object address"),
    Rule::field("floor", "floor"),
    Rule::any(&["sq@pl_min", "sq@pl_max"], "object space"),
    Rule::any(&["price", "price_sq"], "price"),
];

const EXPORT_COUNTRY: &[Rule] = &[
    Rule::field("actual", "object actuality"),
    Rule::field("address", "object address"),
    Rule::any(&["sq@pl", "sq@pl_s"], "object space"),
    Rule::field("optp", "operation type"),
];

const IMPORT_COMMON: &[Rule] = &[
    Rule::field("type@id", "deal type"),
    Rule::field("estate/type@id", "estate type"),
    Rule::field("estate/object@id", "object type"),
    Rule::field("estate/commerce/purpose@id", "commercial purpose")
        .when(Condition::Present("estate/commerce")),
];

/// The matrix: rules per direction, for every subtype (`None`) or one.
const MATRIX: &[(Direction, Option<Subtype>, &[Rule])] = &[
    (Direction::Export, None, EXPORT_COMMON),
    (Direction::Export, Some(Subtype::Flats), EXPORT_FLATS),
    (Direction::Export, Some(Subtype::Rent), EXPORT_RENT),
    (Direction::Export, Some(Subtype::Commercial), EXPORT_COMMERCIAL),
    (Direction::Export, Some(Subtype::Country), EXPORT_COUNTRY),
    (Direction::Import, None, IMPORT_COMMON),
];

/// Rules that apply to a listing of `subtype` converted in `direction`.
pub fn rules(direction: Direction, subtype: Subtype) -> impl Iterator<Item = &'static Rule> {
    MATRIX
        .iter()
        .filter(move |(d, s, _)| *d == direction && s.is_none_or(|s| s == subtype))
        .flat_map(|(_, _, rules)| rules.iter())
}

/// Rules violated by a converted listing.
///
/// # Examples
/// ```
/// use rex_converter::convert::winner::matrix::{check, Facts};
/// use rex_converter::convert::winner::routing::Subtype;
/// use rex_converter::tree::Element;
/// use rex_converter::types::Direction;
///
/// let order = Element::new("order")
///     .with_child(Element::new("type").with_attr("id", "2"))
///     .with_child(Element::new("estate").with_child(Element::new("type").with_attr("id", "1")));
/// let missing = check(Direction::Import, Subtype::Flats, &Facts::default(), &order);
/// assert_eq!(missing.len(), 1);
/// assert_eq!(missing[0].to_string(), "Missing object type (estate/object@id)");
/// ```
#[must_use]
pub fn check(direction: Direction, subtype: Subtype, facts: &Facts, listing: &Element) -> Vec<&'static Rule> {
    rules(direction, subtype)
        .filter(|rule| rule.applies(facts, listing) && !rule.satisfied(listing))
        .collect()
}
