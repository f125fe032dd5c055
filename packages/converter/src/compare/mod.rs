//! Double-conversion comparator.
//!
//! Orders are read into maps keyed by their external id, run through a
//! converter's export and import, and the two maps are diffed object by
//! object. Differences are sorted into importance tiers; everything but
//! the unimportant tier feeds per-path statistics.

pub mod diff;
pub mod importance;
pub mod report;

pub use diff::{diff, join_path, DiffEntry, DiffKind};
pub use importance::{parse_exclude_list, ImportanceRules, PathRule, Tier};
pub use report::{render, signature};

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::config::{DEFAULT_OBJECT_LIMIT, ORDER_PATTERN};
use crate::convert::{Converter, Task};
use crate::error::Result;
use crate::numbers::parse_int;
use crate::registry::{stream_documents, StreamItem, SubtreePattern};
use crate::tree::{normalize, Element, Value};
use crate::types::Document;

/// Orders keyed by external id.
pub type OrderMap = BTreeMap<i64, Element>;

/// Report modes and the object limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    /// Print per-path statistics.
    pub summary: bool,
    /// Print every compared object with values.
    pub verbose: bool,
    /// Objects read per side when neither mode is set.
    pub limit: usize,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            summary: false,
            verbose: false,
            limit: DEFAULT_OBJECT_LIMIT,
        }
    }
}

impl CompareOptions {
    /// The limit in effect: none when a full mode is requested.
    #[must_use]
    pub fn object_limit(&self) -> Option<usize> {
        (!self.summary && !self.verbose && self.limit > 0).then_some(self.limit)
    }
}

/// Comparator settings.
#[derive(Debug, Clone, Default)]
pub struct ComparatorConfig {
    pub rules: ImportanceRules,
    pub options: CompareOptions,
}

/// Per-path counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCounter {
    pub total: usize,
    pub added: usize,
    pub deleted: usize,
    pub edited: usize,
}

/// Counters of important and medium differences by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathStats {
    paths: IndexMap<String, PathCounter>,
}

impl PathStats {
    pub fn record(&mut self, path: String, kind: DiffKind) {
        let counter = self.paths.entry(path).or_default();
        counter.total += 1;
        match kind {
            DiffKind::Added => counter.added += 1,
            DiffKind::Deleted => counter.deleted += 1,
            DiffKind::Edited => counter.edited += 1,
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&PathCounter> {
        self.paths.get(path)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths by descending total; ties keep first-seen order.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, PathCounter)> {
        let mut all: Vec<(&str, PathCounter)> = self.paths.iter().map(|(p, c)| (p.as_str(), *c)).collect();
        all.sort_by(|a, b| b.1.total.cmp(&a.1.total));
        all
    }
}

/// Differences of one order present on both sides, by tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDiff {
    pub id: i64,
    pub signature: String,
    pub important: Vec<DiffEntry>,
    pub medium: Vec<DiffEntry>,
    pub unimportant: Vec<DiffEntry>,
}

/// Outcome of comparing two order maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// Signatures of orders lost by the conversion.
    pub only_in_original: Vec<String>,
    /// Signatures of orders the conversion made up.
    pub only_in_conversion: Vec<String>,
    /// Orders present on both sides, by id.
    pub objects: Vec<ObjectDiff>,
    pub stats: PathStats,
}

/// External id of an order: `@id`, else `meta/extid`. Zero is no id.
#[must_use]
pub fn order_id(order: &Element) -> Option<i64> {
    order
        .coalesce(&["@id", "meta/extid"])
        .and_then(parse_int)
        .filter(|id| *id != 0)
}

/// Read the orders of REX documents into a map.
///
/// With a limit, only the first `limit` orders are looked at, with or
/// without an id. Later orders replace earlier ones with the same id.
///
/// # Errors
/// Only an invalid built-in pattern.
pub fn collect_orders(documents: &[Document], limit: Option<usize>) -> Result<OrderMap> {
    let patterns = [SubtreePattern::parse(ORDER_PATTERN)?];
    let mut orders = OrderMap::new();
    let mut seen = 0usize;

    for item in stream_documents(documents, &patterns) {
        match item {
            StreamItem::Issue(issue) => tracing::warn!(%issue, "Error parsing XML"),
            StreamItem::Match { tree, .. } => {
                seen += 1;
                if limit.is_some_and(|l| seen > l) {
                    continue;
                }
                match order_id(&tree) {
                    Some(id) => {
                        orders.insert(id, tree);
                    }
                    None => tracing::debug!(position = seen, "Order without id"),
                }
            }
        }
    }
    Ok(orders)
}

fn normalized(order: &Element) -> Value {
    normalize(&Value::from_element(order)).unwrap_or_else(|| Value::Object(IndexMap::new()))
}

/// Compares order maps under one set of importance rules.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    config: ComparatorConfig,
}

impl Comparator {
    #[must_use]
    pub fn new(config: ComparatorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Diff one pair of orders into tiers, counting important and medium
    /// differences in `stats`.
    #[must_use]
    pub fn compare_orders(&self, id: i64, left: &Element, right: &Element, stats: &mut PathStats) -> ObjectDiff {
        let mut object = ObjectDiff {
            id,
            signature: signature(id, left),
            important: Vec::new(),
            medium: Vec::new(),
            unimportant: Vec::new(),
        };
        for entry in diff(&normalized(left), &normalized(right)) {
            let path = entry.path_string();
            let tier = self.config.rules.classify(&path);
            if tier != Tier::Unimportant {
                stats.record(path, entry.kind);
            }
            match tier {
                Tier::Important => object.important.push(entry),
                Tier::Medium => object.medium.push(entry),
                Tier::Unimportant => object.unimportant.push(entry),
            }
        }
        object
    }

    /// Compare the original orders with their double conversion.
    ///
    /// # Examples
    /// ```
    /// use rex_converter::compare::{Comparator, OrderMap};
    /// use rex_converter::tree::Element;
    ///
    /// let mut original = OrderMap::new();
    /// original.insert(5, Element::new("order").with_attr("id", "5"));
    /// original.insert(6, Element::new("order").with_attr("id", "6"));
    /// let mut converted = OrderMap::new();
    /// converted.insert(6, Element::new("order").with_attr("id", "6"));
    ///
    /// let comparison = Comparator::default().compare(&original, &converted);
    /// assert_eq!(comparison.only_in_original.len(), 1);
    /// assert_eq!(comparison.objects.len(), 1);
    /// assert_eq!(comparison.objects[0].id, 6);
    /// ```
    #[must_use]
    pub fn compare(&self, original: &OrderMap, converted: &OrderMap) -> Comparison {
        let mut comparison = Comparison::default();
        for (id, left) in original {
            match converted.get(id) {
                Some(right) => {
                    let object = self.compare_orders(*id, left, right, &mut comparison.stats);
                    comparison.objects.push(object);
                }
                None => comparison.only_in_original.push(signature(*id, left)),
            }
        }
        comparison.only_in_conversion = converted
            .iter()
            .filter(|(id, _)| !original.contains_key(id))
            .map(|(id, order)| signature(*id, order))
            .collect();
        comparison
    }

    /// Render a comparison in the configured modes.
    #[must_use]
    pub fn render(&self, comparison: &Comparison) -> String {
        render(comparison, &self.config.options)
    }
}

/// Export `input` with `converter`, import the result back and read both
/// sides into order maps.
///
/// # Errors
/// Whatever the converter's export or import returns.
pub fn double_convert(
    converter: &dyn Converter,
    task: &mut Task,
    input: &[Document],
    limit: Option<usize>,
) -> Result<(OrderMap, OrderMap)> {
    let original = collect_orders(input, limit)?;
    tracing::info!(orders = original.len(), "Exporting orders");
    let exported = converter.export(task, input)?;
    tracing::info!(documents = exported.len(), "Importing exported objects");
    let imported = converter.import(task, &exported)?;
    let converted = collect_orders(std::slice::from_ref(&imported), limit)?;
    tracing::info!(orders = converted.len(), "Double conversion done");
    Ok((original, converted))
}
