//! Converters between REX and partner formats.
//!
//! A [`Converter`] runs over a [`Task`]: the run configuration plus the error
//! and statistics collectors it fills. Converters are looked up by format
//! name with [`converter_for`].

pub mod winner;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::{validate_format_name, ExportConfig};
use crate::dictionary::DictionarySet;
use crate::error::{ConvertError, Result};
use crate::registry::ParseIssue;
use crate::report::{ErrorCollector, StatCollector};
use crate::schema;
use crate::types::{Direction, Document};

/// Settings of one conversion run.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Dictionary file used by the converter.
    pub dictionary: PathBuf,
    /// Candidate XSD files for validation.
    pub schemas: Vec<PathBuf>,
    /// Date stamped on exported listings.
    pub today: NaiveDate,
    pub export: ExportConfig,
}

impl TaskConfig {
    #[must_use]
    pub fn new(dictionary: impl Into<PathBuf>) -> Self {
        Self {
            dictionary: dictionary.into(),
            schemas: Vec::new(),
            today: chrono::Local::now().date_naive(),
            export: ExportConfig::default(),
        }
    }

    #[must_use]
    pub fn with_schemas(mut self, schemas: Vec<PathBuf>) -> Self {
        self.schemas = schemas;
        self
    }

    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    #[must_use]
    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }
}

/// One conversion run: configuration plus the collectors it fills.
#[derive(Debug)]
pub struct Task {
    pub format: String,
    pub direction: Direction,
    pub config: TaskConfig,
    pub errors: ErrorCollector,
    pub stats: StatCollector,
    dictionary: Option<Arc<DictionarySet>>,
}

impl Task {
    #[must_use]
    pub fn new(format: impl Into<String>, direction: Direction, config: TaskConfig) -> Self {
        let format = format.into();
        Self {
            errors: ErrorCollector::new(direction.as_str(), &format),
            stats: StatCollector::new(direction.as_str(), &format),
            format,
            direction,
            config,
            dictionary: None,
        }
    }

    /// Use an already loaded dictionary set instead of reading the file.
    #[must_use]
    pub fn with_dictionary(mut self, dictionary: DictionarySet) -> Self {
        self.dictionary = Some(Arc::new(dictionary));
        self
    }

    /// The run's dictionary set, loaded on first use.
    ///
    /// # Errors
    /// `DictionaryRead` or `MalformedDictionary` if the file is unusable.
    pub fn dictionary(&mut self) -> Result<Arc<DictionarySet>> {
        if let Some(dictionary) = &self.dictionary {
            return Ok(Arc::clone(dictionary));
        }
        let dictionary = Arc::new(DictionarySet::load(&self.config.dictionary)?);
        self.dictionary = Some(Arc::clone(&dictionary));
        Ok(dictionary)
    }

    /// Record a malformed-XML notification as a warning.
    pub fn parse_issue(&mut self, issue: &ParseIssue) {
        self.errors.warn(None, format!("XML parser error: {issue}"));
    }
}

/// A bidirectional converter between REX and one partner format.
pub trait Converter {
    /// Format name the converter is registered under.
    fn name(&self) -> &'static str;

    /// Convert REX documents into partner documents, one per output file.
    ///
    /// # Errors
    /// Only run-level failures such as an unusable dictionary.
    fn export(&self, task: &mut Task, input: &[Document]) -> Result<Vec<Document>>;

    /// Convert partner documents into a single REX document.
    ///
    /// # Errors
    /// Only run-level failures such as an unusable dictionary.
    fn import(&self, task: &mut Task, input: &[Document]) -> Result<Document>;

    /// Validate a document against the task's candidate schemas.
    ///
    /// Violations are recorded in the task's error collector.
    fn validate(&self, task: &mut Task, document: &Document) -> bool {
        schema::validate_document(document, &task.config.schemas, &mut task.errors)
    }
}

/// Names of all available converters.
pub const FORMATS: &[&str] = &["winner"];

/// Look up the converter for a format name.
///
/// # Errors
/// `InvalidFormatName` or `UnknownFormat`.
///
/// # Examples
/// ```
/// use rex_converter::convert::converter_for;
///
/// assert_eq!(converter_for("winner").unwrap().name(), "winner");
/// assert!(converter_for("avito").is_err());
/// ```
pub fn converter_for(format: &str) -> Result<Box<dyn Converter>> {
    validate_format_name(format)?;
    match format {
        "winner" => Ok(Box::new(winner::Winner)),
        other => Err(ConvertError::UnknownFormat(other.to_string())),
    }
}
