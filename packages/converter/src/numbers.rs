//! Lenient numeric parsing of listing fields.
//!
//! Partner feeds put numbers in free text (`"45.5 м2"`, `" 12"`, `"3-й"`).
//! These helpers read the longest numeric prefix after leading whitespace and
//! ignore whatever follows.

/// Parse the integer prefix of `value`.
///
/// Returns `None` when no digit follows the optional sign.
///
/// # Examples
/// ```
/// use rex_converter::numbers::parse_int;
///
/// assert_eq!(parse_int(" 12 этаж"), Some(12));
/// assert_eq!(parse_int("-3"), Some(-3));
/// assert_eq!(parse_int("этаж"), None);
/// ```
#[must_use]
pub fn parse_int(value: &str) -> Option<i64> {
    let v = value.trim_start();
    let (negative, digits) = match v.as_bytes().first() {
        Some(b'-') => (true, &v[1..]),
        Some(b'+') => (false, &v[1..]),
        _ => (false, v),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse the decimal prefix of `value`.
///
/// A comma is accepted as the decimal separator.
///
/// # Examples
/// ```
/// use rex_converter::numbers::parse_float;
///
/// assert_eq!(parse_float("45.5 м2"), Some(45.5));
/// assert_eq!(parse_float("12,25"), Some(12.25));
/// assert_eq!(parse_float(""), None);
/// ```
#[must_use]
pub fn parse_float(value: &str) -> Option<f64> {
    let v = value.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_point = false;
    for (i, c) in v.char_indices() {
        match c {
            '-' | '+' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' | ',' if !seen_point => seen_point = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    v[..end]
        .trim_end_matches(['.', ','])
        .replace(',', ".")
        .parse::<f64>()
        .ok()
}

/// Format a number without a trailing `.0` for whole values.
///
/// # Examples
/// ```
/// use rex_converter::numbers::format_number;
///
/// assert_eq!(format_number(45.0), "45");
/// assert_eq!(format_number(45.5), "45.5");
/// ```
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int("7800000000000"), Some(7_800_000_000_000));
        assert_eq!(parse_int("12abc"), Some(12));
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("+5"), Some(5));
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float("10"), Some(10.0));
        assert_eq!(parse_float("  7.25кв"), Some(7.25));
        assert_eq!(parse_float("3."), Some(3.0));
        assert_eq!(parse_float("-1.5"), Some(-1.5));
        assert_eq!(parse_float("1.2.3"), Some(1.2));
        assert_eq!(parse_float("."), None);
        assert_eq!(parse_float("кв"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(12.75), "12.75");
    }
}
