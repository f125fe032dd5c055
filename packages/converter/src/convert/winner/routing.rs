//! Choosing the Winner output file for a REX order.

use std::fmt;

use crate::config::ExportConfig;
use crate::numbers::parse_int;
use crate::tree::Element;

/// Listing subtype; each one has its own Winner file and field rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtype {
    /// Flats and rooms for sale.
    Flats,
    /// Flats and rooms for rent.
    Rent,
    /// Country houses and plots.
    Country,
    /// Commercial property.
    Commercial,
}

impl Subtype {
    pub const ALL: [Subtype; 4] = [Self::Flats, Self::Rent, Self::Country, Self::Commercial];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flats => "flats",
            Self::Rent => "rent",
            Self::Country => "country",
            Self::Commercial => "commercial",
        }
    }

    /// The output file listings of this subtype go to.
    #[must_use]
    pub fn output(self) -> &'static OutputFile {
        match self {
            Self::Commercial => &OUTPUT_FILES[0],
            Self::Country => &OUTPUT_FILES[1],
            Self::Rent => &OUTPUT_FILES[2],
            Self::Flats => &OUTPUT_FILES[3],
        }
    }

    /// Subtype of the listings found under `root/element` in a Winner file.
    #[must_use]
    pub fn from_container(root: &str, element: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.output().root == root && s.output().element == element)
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One Winner output file: root tag, listing tag, file name and schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFile {
    pub root: &'static str,
    pub element: &'static str,
    pub file: &'static str,
    pub schema: &'static str,
}

impl OutputFile {
    /// Subtree pattern matching the listings of this file.
    #[must_use]
    pub fn pattern(&self) -> String {
        format!("//{}/{}", self.root, self.element)
    }
}

/// The four Winner files.
pub const OUTPUT_FILES: [OutputFile; 4] = [
    OutputFile {
        root: "commercials",
        element: "commercial",
        file: "commercial_spb.xml",
        schema: "commercial_spb.xsd",
    },
    OutputFile {
        root: "country_houses",
        element: "country_house",
        file: "country_house_spb.xml",
        schema: "country_house_spb.xsd",
    },
    OutputFile {
        root: "rent",
        element: "flat",
        file: "rent_spb.xml",
        schema: "rent_spb.xsd",
    },
    OutputFile {
        root: "flats",
        element: "flat",
        file: "flats_spb.xml",
        schema: "flats_spb.xsd",
    },
];

/// Where an order goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Out(Subtype),
    /// Located outside the exported regions; dropped without an error.
    OutsideRegion,
    /// In an exported region but matching none of the files.
    Unroutable,
}

/// Integer at `path`, with unparseable or missing values read as 0.
pub(crate) fn zint_at(order: &Element, path: &str) -> i64 {
    order.value_at(path).and_then(parse_int).unwrap_or(0)
}

/// Route a REX order to its Winner file.
///
/// Commercial estate wins over country estate, which wins over rent deals;
/// whatever remains must be a flat or a room.
///
/// # Examples
/// ```
/// use rex_converter::config::ExportConfig;
/// use rex_converter::convert::winner::routing::{route, Route, Subtype};
/// use rex_converter::tree::Element;
///
/// let order = Element::new("order")
///     .with_child(Element::new("type").with_attr("id", "3"))
///     .with_child(
///         Element::new("estate")
///             .with_child(Element::new("location").with_child(Element::new("region").with_attr("id", "7800000000000")))
///             .with_child(Element::new("object").with_attr("id", "1")),
///     );
/// assert_eq!(route(&order, &ExportConfig::default()), Route::Out(Subtype::Rent));
/// ```
#[must_use]
pub fn route(order: &Element, config: &ExportConfig) -> Route {
    if !config.covers(zint_at(order, "estate/location/region@id")) {
        return Route::OutsideRegion;
    }
    let estate_type = zint_at(order, "estate/type@id");
    let deal_type = zint_at(order, "type@id");
    let object_type = zint_at(order, "estate/object@id");

    if estate_type == 3 {
        Route::Out(Subtype::Commercial)
    } else if estate_type == 2 {
        Route::Out(Subtype::Country)
    } else if matches!(deal_type, 3 | 4) {
        Route::Out(Subtype::Rent)
    } else if matches!(object_type, 1 | 2) {
        Route::Out(Subtype::Flats)
    } else {
        Route::Unroutable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LENOBL_REGION_ID, SPB_REGION_ID};

    fn order(region: i64, deal: &str, estate: &str, object: &str) -> Element {
        Element::new("order")
            .with_child(Element::new("type").with_attr("id", deal))
            .with_child(
                Element::new("estate")
                    .with_child(
                        Element::new("location")
                            .with_child(Element::new("region").with_attr("id", region.to_string())),
                    )
                    .with_child(Element::new("type").with_attr("id", estate))
                    .with_child(Element::new("object").with_attr("id", object)),
            )
    }

    #[test]
    fn test_route_precedence() {
        let config = ExportConfig::default();
        assert_eq!(route(&order(SPB_REGION_ID, "2", "1", "1"), &config), Route::Out(Subtype::Flats));
        assert_eq!(route(&order(SPB_REGION_ID, "4", "1", "1"), &config), Route::Out(Subtype::Rent));
        assert_eq!(route(&order(LENOBL_REGION_ID, "4", "2", "5"), &config), Route::Out(Subtype::Country));
        assert_eq!(route(&order(SPB_REGION_ID, "4", "3", "7"), &config), Route::Out(Subtype::Commercial));
    }

    #[test]
    fn test_route_outside_region() {
        let config = ExportConfig::default();
        assert_eq!(route(&order(7_700_000_000_000, "2", "1", "1"), &config), Route::OutsideRegion);
        assert_eq!(route(&Element::new("order"), &config), Route::OutsideRegion);
    }

    #[test]
    fn test_route_unroutable() {
        let config = ExportConfig::default();
        assert_eq!(route(&order(SPB_REGION_ID, "2", "1", "5"), &config), Route::Unroutable);
    }

    #[test]
    fn test_output_table() {
        assert_eq!(Subtype::Rent.output().file, "rent_spb.xml");
        assert_eq!(Subtype::Flats.output().pattern(), "//flats/flat");
        assert_eq!(Subtype::from_container("rent", "flat"), Some(Subtype::Rent));
        assert_eq!(Subtype::from_container("commercials", "commercial"), Some(Subtype::Commercial));
        assert_eq!(Subtype::from_container("rent", "commercial"), None);
    }
}
