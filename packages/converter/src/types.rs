//! Core data types shared by converters.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// A named XML document: an input file or a conversion output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// File name, or `-` for standard input.
    pub name: String,
    /// Complete XML text.
    pub contents: String,
}

impl Document {
    /// Create a document.
    #[must_use]
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a document from disk, named after the file.
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, contents })
    }
}

/// Conversion direction relative to the REX hub format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// REX to partner format.
    Export,
    /// Partner format to REX.
    Import,
}

impl Direction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
