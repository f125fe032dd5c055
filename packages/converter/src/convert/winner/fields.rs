//! Field-level transformations shared by export and import.

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::{ExportConfig, WINNER_DATE_FORMAT};
use crate::numbers::{format_number, parse_float, parse_int};

/// Integer value; missing or unparseable input reads as 0.
#[must_use]
pub fn zint(value: Option<&str>) -> i64 {
    value.and_then(parse_int).unwrap_or(0)
}

/// Float value; missing or unparseable input is absent.
#[must_use]
pub fn fl(value: Option<&str>) -> Option<f64> {
    value.and_then(parse_float).filter(|v| v.is_finite())
}

/// Like [`fl`], but zero is absent too.
#[must_use]
pub fn fl0(value: Option<&str>) -> Option<f64> {
    fl(value).filter(|v| *v != 0.0)
}

/// [`fl`] rendered back to text.
#[must_use]
pub fn fl_text(value: Option<&str>) -> Option<String> {
    fl(value).map(format_number)
}

/// [`fl0`] rendered back to text.
#[must_use]
pub fn fl0_text(value: Option<&str>) -> Option<String> {
    fl0(value).map(format_number)
}

/// Normalise a phone number to 11 digits where the length allows it.
///
/// Non-digits are dropped. Seven digits get the city prefix, ten digits the
/// country prefix; other lengths are returned as digits only.
///
/// # Examples
/// ```
/// use rex_converter::config::ExportConfig;
/// use rex_converter::convert::winner::fields::phone;
///
/// let config = ExportConfig::default();
/// assert_eq!(phone("123-45-67", &config).as_deref(), Some("88121234567"));
/// assert_eq!(phone("(921) 123-45-67", &config).as_deref(), Some("89211234567"));
/// assert_eq!(phone("+7 921 123 45 67", &config).as_deref(), Some("79211234567"));
/// ```
#[must_use]
pub fn phone(value: &str, config: &ExportConfig) -> Option<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        0 => None,
        7 => Some(format!("{}{digits}", config.city_phone_prefix)),
        10 => Some(format!("{}{digits}", config.country_phone_prefix)),
        _ => Some(digits),
    }
}

/// Whether a flag value is set: the text `true`, in any case.
#[must_use]
pub fn is_true(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// `yes` for a set flag, `no` for an unset one, nothing for a missing one.
#[must_use]
pub fn yes_no(value: Option<&str>, yes: &str, no: &str) -> Option<String> {
    value.map(|v| if is_true(v) { yes } else { no }.to_string())
}

/// `"true"` when `value` equals `expected` (case-insensitive, spaces
/// collapsed), `"false"` otherwise, nothing when missing or blank.
#[must_use]
pub fn bool_is(value: Option<&str>, expected: &str) -> Option<String> {
    let value = value.filter(|v| !v.trim().is_empty())?;
    Some(same_word(value, expected).to_string())
}

/// The negation of [`bool_is`]: `"false"` when `value` equals `negative`.
#[must_use]
pub fn false_is(value: Option<&str>, negative: &str) -> Option<String> {
    let value = value.filter(|v| !v.trim().is_empty())?;
    Some((!same_word(value, negative)).to_string())
}

fn same_word(a: &str, b: &str) -> bool {
    strip_words(&a.to_lowercase(), &[]) == strip_words(&b.to_lowercase(), &[])
}

/// Remove whole words found in `words`, collapse whitespace and trim.
///
/// # Examples
/// ```
/// use rex_converter::convert::winner::fields::strip_words;
///
/// assert_eq!(strip_words("Невский  пр.", &["пр."]), "Невский");
/// assert_eq!(strip_words("Приморский р-н", &["р-н", "район"]), "Приморский");
/// ```
#[must_use]
pub fn strip_words(value: &str, words: &[&str]) -> String {
    value
        .split_whitespace()
        .filter(|token| !words.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Street-type words removed before looking up a metro station.
pub const METRO_NOISE: &[&str] = &[
    "проспект", "пр", "пр.", "площадь", "пл", "пл.", "улица", "ул", "ул.",
];

/// District-type words removed before looking up a city district.
pub const DISTRICT_NOISE: &[&str] = &["р-н", "район", "р"];

/// Trimmed, non-empty text.
#[must_use]
pub fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Date in the Winner `DD-MM-YYYY` form.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(WINNER_DATE_FORMAT).to_string()
}

/// Unix timestamp of a Winner or ISO date at midnight UTC.
///
/// # Examples
/// ```
/// use rex_converter::convert::winner::fields::date_to_timestamp;
///
/// assert_eq!(date_to_timestamp("01-01-2014"), Some(1_388_534_400));
/// assert_eq!(date_to_timestamp("2014-01-01"), Some(1_388_534_400));
/// assert_eq!(date_to_timestamp("вчера"), None);
/// ```
#[must_use]
pub fn date_to_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, WINNER_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
    {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_policy() {
        assert_eq!(zint(Some("5")), 5);
        assert_eq!(zint(Some("пятый")), 0);
        assert_eq!(zint(None), 0);
        assert_eq!(fl(Some("45.5")), Some(45.5));
        assert_eq!(fl(Some("0")), Some(0.0));
        assert_eq!(fl(Some("abc")), None);
        assert_eq!(fl0(Some("0")), None);
        assert_eq!(fl0(Some("9")), Some(9.0));
        assert_eq!(fl_text(Some("45.0")).as_deref(), Some("45"));
        assert_eq!(fl0_text(Some("0.0")), None);
    }

    #[test]
    fn test_phone_lengths() {
        let config = ExportConfig::default();
        assert_eq!(phone("1234567", &config).as_deref(), Some("88121234567"));
        assert_eq!(phone("9211234567", &config).as_deref(), Some("89211234567"));
        assert_eq!(phone("12345", &config).as_deref(), Some("12345"));
        assert_eq!(phone("нет", &config), None);
    }

    #[test]
    fn test_phone_uses_configured_prefixes() {
        let config = ExportConfig {
            city_phone_prefix: "8495".to_string(),
            ..ExportConfig::default()
        };
        assert_eq!(phone("1234567", &config).as_deref(), Some("84951234567"));
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(yes_no(Some("true"), "+", "-").as_deref(), Some("+"));
        assert_eq!(yes_no(Some("TRUE"), "+", "-").as_deref(), Some("+"));
        assert_eq!(yes_no(Some("false"), "+", "-").as_deref(), Some("-"));
        assert_eq!(yes_no(Some("1"), "+", "-").as_deref(), Some("-"));
        assert_eq!(yes_no(None, "+", "-"), None);
    }

    #[test]
    fn test_bool_is_and_false_is() {
        assert_eq!(bool_is(Some("Лифт"), "лифт").as_deref(), Some("true"));
        assert_eq!(bool_is(Some("без лифта"), "лифт").as_deref(), Some("false"));
        assert_eq!(bool_is(Some("  "), "лифт"), None);
        assert_eq!(bool_is(None, "+"), None);
        assert_eq!(false_is(Some("нет"), "нет").as_deref(), Some("false"));
        assert_eq!(false_is(Some("есть"), "нет").as_deref(), Some("true"));
        assert_eq!(false_is(None, "нет"), None);
    }

    #[test]
    fn test_strip_words_keeps_partial_matches() {
        assert_eq!(strip_words("пл. Восстания", METRO_NOISE), "Восстания");
        assert_eq!(strip_words("Площадь Ленина", METRO_NOISE), "Площадь Ленина");
        assert_eq!(strip_words("Прибрежная", METRO_NOISE), "Прибрежная");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(format_date(date), "19-10-2026");
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(trimmed(Some("  a ")).as_deref(), Some("a"));
        assert_eq!(trimmed(Some("   ")), None);
        assert_eq!(trimmed(None), None);
    }
}
