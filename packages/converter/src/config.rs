//! Configuration constants and validation functions for the converter.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ConvertError, Result};

/// KLADR-style region id of Saint-Petersburg.
pub const SPB_REGION_ID: i64 = 7_800_000_000_000;

/// KLADR-style region id of the Leningrad oblast.
pub const LENOBL_REGION_ID: i64 = 4_700_000_000_000;

/// Prefix prepended to 7-digit (city) phone numbers.
pub const CITY_PHONE_PREFIX: &str = "8812";

/// Prefix prepended to 10-digit (national) phone numbers.
pub const COUNTRY_PHONE_PREFIX: &str = "8";

/// Upper bound of the kitchen area accepted by the Winner schema.
pub const KITCHEN_AREA_LIMIT: i64 = 500;

/// Number of processed objects between progress log lines.
pub const PROGRESS_INTERVAL: usize = 100;

/// Objects compared when neither a summary nor a verbose report is requested.
pub const DEFAULT_OBJECT_LIMIT: usize = 5;

/// Values longer than this are wrapped onto their own lines in diff reports.
pub const MAX_INLINE_DIFF_LEN: usize = 60;

/// Subtree pattern of the orders in a REX document.
pub const ORDER_PATTERN: &str = "//orders/order";

/// Date format used by the Winner `date` field.
pub const WINNER_DATE_FORMAT: &str = "%d-%m-%Y";

/// Namespace of the `xsi:` attributes on output roots.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Fixed XML declaration written in front of every output document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Format name pattern: lowercase identifier.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static FORMAT_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("valid regex"));

/// Region and formatting settings applied while exporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Regions whose listings are exported; everything else is dropped.
    pub regions: Vec<i64>,
    /// Region treated as "the city": district instead of area, metro required.
    pub city_region: i64,
    /// Prefix for 7-digit phone numbers.
    pub city_phone_prefix: String,
    /// Prefix for 10-digit phone numbers.
    pub country_phone_prefix: String,
    /// Ceiling applied to the kitchen area.
    pub kitchen_area_limit: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            regions: vec![SPB_REGION_ID, LENOBL_REGION_ID],
            city_region: SPB_REGION_ID,
            city_phone_prefix: CITY_PHONE_PREFIX.to_string(),
            country_phone_prefix: COUNTRY_PHONE_PREFIX.to_string(),
            kitchen_area_limit: KITCHEN_AREA_LIMIT,
        }
    }
}

impl ExportConfig {
    /// Whether listings located in `region` are exported at all.
    #[must_use]
    pub fn covers(&self, region: i64) -> bool {
        self.regions.contains(&region)
    }

    /// Whether `region` is the city region.
    #[must_use]
    pub fn is_city(&self, region: i64) -> bool {
        region == self.city_region
    }
}

/// Validate a converter format name.
///
/// # Examples
/// ```
/// use rex_converter::config::validate_format_name;
///
/// assert!(validate_format_name("winner").is_ok());
/// assert!(validate_format_name("../winner").is_err());
/// ```
pub fn validate_format_name(name: &str) -> Result<()> {
    if FORMAT_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(ConvertError::InvalidFormatName(name.to_string()))
    }
}
