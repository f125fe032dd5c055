//! Leveled error collection.

use std::fmt;
use std::panic::Location;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Severity of a recorded problem.
///
/// Lower numeric values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// The object is excluded from output; the batch continues.
    Fatal = 10,
    /// Recoverable anomaly; the object is still emitted.
    Warn = 20,
    /// Diagnostic only.
    Info = 30,
}

impl Level {
    /// All levels, most severe first.
    pub const ALL: [Level; 3] = [Level::Fatal, Level::Warn, Level::Info];

    /// Lowercase name used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Fatal => "fatal",
            Level::Warn => "warn",
            Level::Info => "info",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Identifier of the object that caused the problem, if known.
    pub id: Option<String>,
    pub level: Level,
    pub message: String,
    /// Module that recorded the problem.
    pub namespace: String,
    /// Application or run the problem belongs to.
    pub task: String,
    pub timestamp: DateTime<Utc>,
    /// Source location of the call that recorded the problem.
    pub stack: String,
}

/// Counts of recorded problems per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorStat {
    pub total: usize,
    pub fatal: usize,
    pub warn: usize,
    pub info: usize,
}

/// Accumulates [`ErrorRecord`]s in insertion order.
///
/// Records are never deduplicated. Merging collectors keeps the combined
/// list ordered by timestamp, with ties in their original order.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorCollector {
    task: String,
    namespace: String,
    records: Vec<ErrorRecord>,
}

impl ErrorCollector {
    /// Create an empty collector for `task`, recording as `namespace`.
    #[must_use]
    pub fn new(task: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            namespace: namespace.into(),
            records: Vec::new(),
        }
    }

    /// Record a problem.
    #[track_caller]
    pub fn register(&mut self, id: Option<&str>, level: Level, message: impl Into<String>) {
        let location = Location::caller();
        self.records.push(ErrorRecord {
            id: id.map(str::to_string),
            level,
            message: message.into(),
            namespace: self.namespace.clone(),
            task: self.task.clone(),
            timestamp: Utc::now(),
            stack: location.to_string(),
        });
    }

    /// Record a diagnostic message.
    #[track_caller]
    pub fn info(&mut self, id: Option<&str>, message: impl Into<String>) {
        self.register(id, Level::Info, message);
    }

    /// Record a recoverable anomaly.
    #[track_caller]
    pub fn warn(&mut self, id: Option<&str>, message: impl Into<String>) {
        self.register(id, Level::Warn, message);
    }

    /// Record a problem that excludes the object from output.
    #[track_caller]
    pub fn fatal(&mut self, id: Option<&str>, message: impl Into<String>) {
        self.register(id, Level::Fatal, message);
    }

    /// Recorded problems in order.
    #[must_use]
    pub fn list(&self) -> &[ErrorRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append the records of `other` and re-sort by timestamp.
    pub fn merge(&mut self, other: &ErrorCollector) -> &mut Self {
        self.extend(other.records.iter().cloned());
        self
    }

    /// Append records and re-sort by timestamp.
    pub fn extend(&mut self, records: impl IntoIterator<Item = ErrorRecord>) {
        self.records.extend(records);
        self.records.sort_by_key(|r| r.timestamp);
    }

    /// Count records per level.
    #[must_use]
    pub fn stat(&self) -> ErrorStat {
        let mut stat = ErrorStat {
            total: self.records.len(),
            ..ErrorStat::default()
        };
        for record in &self.records {
            match record.level {
                Level::Fatal => stat.fatal += 1,
                Level::Warn => stat.warn += 1,
                Level::Info => stat.info += 1,
            }
        }
        stat
    }

    /// Render records one per line, keeping only those at least as severe as
    /// `max_level` when it is given.
    #[must_use]
    pub fn render(&self, max_level: Option<Level>) -> String {
        self.records
            .iter()
            .filter(|r| max_level.is_none_or(|max| r.level <= max))
            .map(|r| {
                format!(
                    "  {}.{:>7}: {:>5}  {:>10}  {}\n",
                    r.task,
                    r.namespace,
                    r.level,
                    r.id.as_deref().unwrap_or(""),
                    r.message
                )
            })
            .collect()
    }
}

impl fmt::Display for ErrorCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}
