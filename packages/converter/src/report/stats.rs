//! Per-category conversion counters.
//!
//! Every processed order is counted once, as a success or a failure, under
//! three dimensions: operation (`type`), estate type (`estate/type`) and
//! object type (`estate/object`). Each dimension value also keeps counters
//! crossed with the other two dimensions.

use std::fmt::{self, Write as _};

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;

use crate::tree::Element;
use crate::xml::parse_element;

/// Label used when an order lacks a dimension.
pub const MISSING_DIMENSION: &str = "-";

const NAME_WIDTH: usize = 30;
const TOP_LEVEL_WIDTH: usize = 17;
const NESTED_WIDTH: usize = 30;

/// An order handed to the statistics collector.
#[derive(Debug, Clone, Copy)]
pub enum OrderSource<'a> {
    /// An already parsed `<order>` tree.
    Tree(&'a Element),
    /// A serialised `<order>`.
    Xml(&'a str),
}

impl<'a> From<&'a Element> for OrderSource<'a> {
    fn from(order: &'a Element) -> Self {
        Self::Tree(order)
    }
}

impl<'a> From<&'a str> for OrderSource<'a> {
    fn from(xml: &'a str) -> Self {
        Self::Xml(xml)
    }
}

impl<'a> From<&'a String> for OrderSource<'a> {
    fn from(xml: &'a String) -> Self {
        Self::Xml(xml)
    }
}

/// Success and failure counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counter {
    pub total: u64,
    pub ok: u64,
    pub fail: u64,
}

impl Counter {
    fn add(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.ok += 1;
        } else {
            self.fail += 1;
        }
    }
}

/// Counters for one value of a dimension, crossed with the other two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    #[serde(flatten)]
    pub counter: Counter,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub by_op: IndexMap<String, Counter>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub by_etype: IndexMap<String, Counter>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub by_otype: IndexMap<String, Counter>,
}

/// Photo counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhotoCounter {
    /// Attachments seen over all orders.
    pub total: u64,
    /// Orders without attachments.
    pub zero: u64,
    /// Orders with at least one attachment.
    pub exist: u64,
}

/// Discriminant dimensions of one order.
struct Dimensions {
    op: String,
    etype: String,
    otype: String,
    photos: u64,
}

impl Dimensions {
    fn of(order: &Element) -> Self {
        let label = |path: &str| {
            order
                .value_at(path)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(MISSING_DIMENSION)
                .to_string()
        };
        let photos = order
            .find("meta/attachments")
            .map_or(0, |a| a.children_named("attachment").count() as u64);
        Self {
            op: label("type"),
            etype: label("estate/type"),
            otype: label("estate/object"),
            photos,
        }
    }
}

/// Accumulates conversion counters for one run.
#[derive(Debug, Clone, Serialize)]
pub struct StatCollector {
    task: String,
    namespace: String,
    started: DateTime<Local>,
    #[serde(flatten)]
    totals: Counter,
    by_op: IndexMap<String, Bucket>,
    by_etype: IndexMap<String, Bucket>,
    by_otype: IndexMap<String, Bucket>,
    photos: PhotoCounter,
}

impl StatCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new(task: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            namespace: namespace.into(),
            started: Local::now(),
            totals: Counter::default(),
            by_op: IndexMap::new(),
            by_etype: IndexMap::new(),
            by_otype: IndexMap::new(),
            photos: PhotoCounter::default(),
        }
    }

    /// Count a successfully converted order.
    pub fn ok<'a>(&mut self, order: impl Into<OrderSource<'a>>) {
        self.record(order.into(), true);
    }

    /// Count an order that failed conversion.
    pub fn fail<'a>(&mut self, order: impl Into<OrderSource<'a>>) {
        self.record(order.into(), false);
    }

    /// Overall counters.
    #[must_use]
    pub fn totals(&self) -> Counter {
        self.totals
    }

    #[must_use]
    pub fn photos(&self) -> PhotoCounter {
        self.photos
    }

    /// Counters per operation.
    #[must_use]
    pub fn by_op(&self) -> &IndexMap<String, Bucket> {
        &self.by_op
    }

    /// Counters per estate type.
    #[must_use]
    pub fn by_etype(&self) -> &IndexMap<String, Bucket> {
        &self.by_etype
    }

    /// Counters per object type.
    #[must_use]
    pub fn by_otype(&self) -> &IndexMap<String, Bucket> {
        &self.by_otype
    }

    fn record(&mut self, order: OrderSource<'_>, success: bool) {
        match order {
            OrderSource::Tree(element) => self.add(element, success),
            OrderSource::Xml(xml) => match parse_element(xml) {
                Ok(element) if element.name == "order" => self.add(&element, success),
                Ok(element) => {
                    tracing::warn!(root = %element.name, "Statistics: expected an <order> element");
                }
                Err(e) => tracing::warn!(error = %e, "Statistics: XML parsing error"),
            },
        }
    }

    fn add(&mut self, order: &Element, success: bool) {
        let dims = Dimensions::of(order);
        self.totals.add(success);

        let op = self.by_op.entry(dims.op.clone()).or_default();
        op.counter.add(success);
        op.by_etype.entry(dims.etype.clone()).or_default().add(success);
        op.by_otype.entry(dims.otype.clone()).or_default().add(success);

        let etype = self.by_etype.entry(dims.etype.clone()).or_default();
        etype.counter.add(success);
        etype.by_op.entry(dims.op.clone()).or_default().add(success);
        etype.by_otype.entry(dims.otype.clone()).or_default().add(success);

        let otype = self.by_otype.entry(dims.otype).or_default();
        otype.counter.add(success);
        otype.by_etype.entry(dims.etype).or_default().add(success);
        otype.by_op.entry(dims.op).or_default().add(success);

        self.photos.total += dims.photos;
        if dims.photos == 0 {
            self.photos.zero += 1;
        } else {
            self.photos.exist += 1;
        }
    }
}

fn leaf(out: &mut String, indent: &str, name: &str, counter: &Counter, width: usize) {
    let width = width.max(name.chars().count());
    let pad = NAME_WIDTH.saturating_sub(width);
    let _ = writeln!(
        out,
        "{indent}{name:>width$}:{:>pad$} {:8} = {:8} ok + {:8} errors",
        "", counter.total, counter.ok, counter.fail
    );
}

fn section(out: &mut String, title: &str, buckets: &IndexMap<String, Bucket>, order: [Cross; 2]) {
    out.push_str(title);
    out.push_str(":\n================================\n");
    for (name, bucket) in buckets {
        leaf(out, "  ", name, &bucket.counter, TOP_LEVEL_WIDTH);
        for cross in order {
            for (sub, counter) in cross.of(bucket) {
                leaf(out, "  ", sub, counter, NESTED_WIDTH);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Cross {
    Op,
    Etype,
    Otype,
}

impl Cross {
    fn of(self, bucket: &Bucket) -> &IndexMap<String, Counter> {
        match self {
            Cross::Op => &bucket.by_op,
            Cross::Etype => &bucket.by_etype,
            Cross::Otype => &bucket.by_otype,
        }
    }
}

impl fmt::Display for StatCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = (Local::now() - self.started).num_milliseconds() as f64 / 1000.0;
        let mut out = String::new();
        let _ = writeln!(out, "\nStatistics for {}: {}", self.task, self.namespace);
        let _ = writeln!(
            out,
            "  Conversion started at {} and took {elapsed} s",
            self.started.format("%Y-%m-%d %H:%M:%S")
        );
        leaf(&mut out, "", "Totals", &self.totals, 8);
        let _ = writeln!(
            out,
            "    of them {} have photos, {} do not. {} photos processed.\n",
            self.photos.exist, self.photos.zero, self.photos.total
        );
        section(&mut out, "By operation", &self.by_op, [Cross::Etype, Cross::Otype]);
        out.push('\n');
        section(&mut out, "By estate type", &self.by_etype, [Cross::Op, Cross::Otype]);
        out.push('\n');
        section(&mut out, "By object type", &self.by_otype, [Cross::Etype, Cross::Op]);
        f.write_str(&out)
    }
}
