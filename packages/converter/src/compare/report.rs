//! Text rendering of a comparison.

use std::fmt::Write;

use textwrap::{fill, Options};

use super::diff::{DiffEntry, DiffKind};
use super::{CompareOptions, Comparison, ObjectDiff, PathStats};
use crate::config::MAX_INLINE_DIFF_LEN;
use crate::report::MISSING_DIMENSION;
use crate::tree::{Element, Value};

/// One-line identification of an order: id, deal, estate and object type,
/// then the address string.
///
/// # Examples
/// ```
/// use rex_converter::compare::signature;
/// use rex_converter::tree::Element;
///
/// let order = Element::new("order").with_child(Element::new("type").with_text("продажа"));
/// assert_eq!(signature(7, &order), "       7 (     продажа,            -,                 - | -)");
/// ```
#[must_use]
pub fn signature(id: i64, order: &Element) -> String {
    let label = |path: &str| {
        order
            .value_at(path)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(MISSING_DIMENSION)
    };
    format!(
        "{id:>8} ({:>12}, {:>12}, {:>17} | {})",
        label("type"),
        label("estate/type"),
        label("estate/object"),
        label("estate/location/string"),
    )
}

fn wrap(value: &str) -> String {
    fill(value, Options::new(MAX_INLINE_DIFF_LEN).initial_indent("\t").subsequent_indent("\t"))
}

fn show(value: Option<&Value>) -> String {
    let text = value.map(Value::render).unwrap_or_default();
    if text.chars().count() > MAX_INLINE_DIFF_LEN {
        format!("\n{}", wrap(&text))
    } else {
        text
    }
}

/// One diff line; with `values` the old and new values follow the path.
#[must_use]
pub fn diff_line(entry: &DiffEntry, values: bool) -> String {
    let mut line = format!("{:>9} property {:<40}", entry.kind.label(), entry.path_string());
    if !values {
        return line;
    }
    match entry.kind {
        DiffKind::Deleted => {
            let _ = write!(line, " | {}", show(entry.left.as_ref()));
        }
        DiffKind::Added => {
            let _ = write!(line, " | {}", show(entry.right.as_ref()));
        }
        DiffKind::Edited => {
            let left = show(entry.left.as_ref());
            let right = show(entry.right.as_ref());
            if left.starts_with('\n') || right.starts_with('\n') {
                let _ = write!(line, " | {left}\n\t  --{right}");
            } else {
                let _ = write!(line, " | {} -- {}", left.trim(), right.trim());
            }
        }
    }
    line
}

/// Report block of one compared order: signature, then important and
/// medium differences, additions first.
#[must_use]
pub fn object_block(object: &ObjectDiff, values: bool) -> String {
    let mut out = format!("\n{}", object.signature);
    for (marker, entries) in [("[!] ", &object.important), ("    ", &object.medium)] {
        for kind in [DiffKind::Added, DiffKind::Deleted, DiffKind::Edited] {
            for entry in entries.iter().filter(|e| e.kind == kind) {
                let _ = write!(out, "\n  {marker}{}", diff_line(entry, values));
            }
        }
    }
    out
}

/// Per-path summary lines, most frequent first.
#[must_use]
pub fn summary_lines(stats: &PathStats, compared: usize) -> Vec<String> {
    let total = compared.max(1) as f64;
    stats
        .sorted()
        .into_iter()
        .map(|(path, c)| {
            format!(
                "{path:>50}: {:5.1}% {:4}/{compared} ({:4} changed, {:4} new, {:4} deleted)",
                c.total as f64 / total * 100.0,
                c.total,
                c.edited,
                c.added,
                c.deleted,
            )
        })
        .collect()
}

/// Full report for the chosen modes.
///
/// Summary mode prints only the per-path statistics and verbose mode only
/// the per-object sections with values. Without either, both are printed
/// for the limited object set, without values.
#[must_use]
pub fn render(comparison: &Comparison, options: &CompareOptions) -> String {
    let limited = options.object_limit().is_some();
    let mut lines: Vec<String> = Vec::new();

    if limited || options.summary {
        lines.extend(summary_lines(&comparison.stats, comparison.objects.len()));
    }
    if limited || options.verbose {
        if !comparison.only_in_original.is_empty() {
            lines.push("Only in original".to_string());
            lines.extend(comparison.only_in_original.iter().map(|s| format!("oo: {s}")));
            lines.push(String::new());
        }
        if !comparison.only_in_conversion.is_empty() {
            lines.push("Only in conversion results".to_string());
            lines.extend(comparison.only_in_conversion.iter().map(|s| format!("or: {s}")));
            lines.push(String::new());
        }
        lines.extend(
            comparison
                .objects
                .iter()
                .map(|o| object_block(o, options.verbose)),
        );
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::PathSegment;

    fn edit(left: &str, right: &str) -> DiffEntry {
        DiffEntry {
            kind: DiffKind::Edited,
            path: vec![PathSegment::Key("price".to_string()), PathSegment::Index(0)],
            left: Some(Value::Text(left.to_string())),
            right: Some(Value::Text(right.to_string())),
        }
    }

    #[test]
    fn test_diff_line_without_values() {
        let line = diff_line(&edit("10", "12"), false);
        assert_eq!(line, format!("  changed property {:<40}", "price.0"));
    }

    #[test]
    fn test_diff_line_inline_values() {
        let line = diff_line(&edit("10", "12"), true);
        assert!(line.ends_with(" | 10 -- 12"));
    }

    #[test]
    fn test_diff_line_wraps_long_values() {
        let long = "слово ".repeat(20);
        let line = diff_line(&edit(&long, "12"), true);
        assert!(line.contains(" | \n\t"));
        assert!(line.contains("\n\t  --12"));
        assert!(line.lines().all(|l| l.chars().count() <= 110));
    }

    #[test]
    fn test_signature_uses_address() {
        let order = Element::new("order")
            .with_child(Element::new("type").with_attr("id", "2").with_text("продажа"))
            .with_child(
                Element::new("estate")
                    .with_child(Element::new("location").with_child(Element::new("string").with_text("Невский, 85")))
                    .with_child(Element::new("type").with_attr("id", "1").with_text("жилая"))
                    .with_child(Element::new("object").with_attr("id", "1").with_text("квартира")),
            );
        assert_eq!(
            signature(12, &order),
            "      12 (     продажа,        жилая,          квартира | Невский, 85)"
        );
    }
}
