//! Types produced by the streaming parser.

use std::fmt;

use crate::tree::Element;

/// Kind of malformation found while streaming a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// The tokenizer rejected the input; parsing of the document stops.
    Syntax(String),
    /// An end tag closed an element other than the innermost open one.
    /// Elements left open in between are discarded.
    MismatchedEnd { expected: String, found: String },
    /// An end tag with no matching open element; it is ignored.
    UnexpectedEnd(String),
    /// An element was still open when the input ended.
    Unclosed(String),
}

/// A malformation reported through the parser's error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    /// Name of the document, when parsing a named document.
    pub document: Option<String>,
    /// Byte offset into the document.
    pub position: usize,
    pub kind: IssueKind,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(doc) = &self.document {
            write!(f, "{doc}: ")?;
        }
        match &self.kind {
            IssueKind::Syntax(msg) => write!(f, "{msg}")?,
            IssueKind::MismatchedEnd { expected, found } => {
                write!(f, "expected </{expected}>, found </{found}>")?;
            }
            IssueKind::UnexpectedEnd(name) => write!(f, "unexpected </{name}>")?,
            IssueKind::Unclosed(name) => write!(f, "element <{name}> is not closed")?,
        }
        write!(f, " at offset {}", self.position)
    }
}

/// One item of a [`MatchStream`](super::MatchStream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// A complete subtree selected by the pattern at index `pattern`.
    Match { pattern: usize, tree: Element },
    /// A malformation; the stream continues where it can.
    Issue(ParseIssue),
}

/// Counts of what one parse delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Subtrees handed to handlers.
    pub matches: usize,
    /// Issues reported to error handlers.
    pub issues: usize,
}

impl ParseSummary {
    pub(crate) fn absorb(&mut self, other: ParseSummary) {
        self.matches += other.matches;
        self.issues += other.issues;
    }
}
