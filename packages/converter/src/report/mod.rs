//! Run-level observability: leveled errors and conversion statistics.
//!
//! Both collectors are created once per run and only ever grow.

mod errors;
mod stats;

pub use errors::{ErrorCollector, ErrorRecord, ErrorStat, Level};
pub use stats::{Bucket, Counter, OrderSource, PhotoCounter, StatCollector, MISSING_DIMENSION};

use serde::Serialize;

/// Snapshot of both collectors, written by `--stats`.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub errors: ErrorStat,
    pub records: &'a [ErrorRecord],
    pub statistics: &'a StatCollector,
}

impl<'a> RunReport<'a> {
    #[must_use]
    pub fn new(errors: &'a ErrorCollector, statistics: &'a StatCollector) -> Self {
        Self {
            errors: errors.stat(),
            records: errors.list(),
            statistics,
        }
    }

    /// Serialise the snapshot as YAML.
    ///
    /// # Errors
    /// Returns an error if serialisation fails.
    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Element;

    #[test]
    fn test_run_report_yaml() {
        let mut errors = ErrorCollector::new("rex-cli", "winner");
        errors.fatal(Some("9"), "Missing price (price)");
        let mut stats = StatCollector::new("rex-cli", "winner");
        stats.fail(&Element::new("order").with_child(Element::new("type").with_text("продажа")));

        let yaml = RunReport::new(&errors, &stats).to_yaml().unwrap();
        assert!(yaml.contains("fatal: 1"));
        assert!(yaml.contains("message: Missing price (price)"));
        assert!(yaml.contains("продажа"));
    }
}
