//! Error types for the converter.
//!
//! Only run-level failures are represented here: an unreadable input or
//! dictionary file, an unknown format, a malformed pattern. Problems with
//! individual listings are recorded in the [`ErrorCollector`] instead and
//! never abort a batch.
//!
//! [`ErrorCollector`]: crate::report::ErrorCollector

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the converter library.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Dictionary file could not be read.
    #[error("Couldn't read dictionary file {}: {source}", .path.display())]
    DictionaryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dictionary file violates the section/line grammar.
    #[error("Malformed dictionary file {}{}", .path.display(), .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    MalformedDictionary { path: PathBuf, line: Option<usize> },

    /// No converter is registered under the given format name.
    #[error("No converter for format '{0}'")]
    UnknownFormat(String),

    /// Format name does not look like a format name.
    #[error("Invalid format name: '{0}'. Expected lowercase letters, digits, '-' or '_'")]
    InvalidFormatName(String),

    /// Subtree or path pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Streaming XML parsing failed.
    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Static XML tree parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlTree(#[from] roxmltree::Error),

    /// XSD schema is not usable.
    #[error("Schema {name}: {reason}")]
    Schema { name: String, reason: String },

    /// Input documents failed schema validation and the run was not forced.
    #[error("Validation failed for {0} document(s); use --force to convert anyway")]
    ValidationFailed(usize),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),
}

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvertError::UnknownFormat("avito".to_string());
        assert_eq!(err.to_string(), "No converter for format 'avito'");
    }

    #[test]
    fn test_malformed_dictionary_with_line() {
        let err = ConvertError::MalformedDictionary {
            path: PathBuf::from("dic.txt"),
            line: Some(3),
        };
        assert_eq!(err.to_string(), "Malformed dictionary file dic.txt at line 3");
    }

    #[test]
    fn test_malformed_dictionary_without_line() {
        let err = ConvertError::MalformedDictionary {
            path: PathBuf::from("dic.txt"),
            line: None,
        };
        assert_eq!(err.to_string(), "Malformed dictionary file dic.txt");
    }
}
