//! Streaming XML event parser.
//!
//! Subtree handlers are registered for XPath-like patterns. The parser
//! reads the document once, builds a listing tree for every complete
//! subtree that matches a pattern and hands it to the pattern's handlers
//! before reading on. Malformed XML is reported through error handlers and
//! never aborts a batch.
//!
//! Two ways to consume matches:
//! - [`MatchStream`]: a pull iterator of [`StreamItem`]s
//! - [`EventParser`] / [`DocumentList`]: callbacks on top of the stream

mod core;
mod engine;
mod handler;
mod list;
mod pattern;
mod stream;
mod types;

pub use core::HandlerRegistry;
pub use engine::EventParser;
pub use handler::{EndHandler, ErrorHandler, SubtreeHandler};
pub use list::{stream_documents, DocumentList};
pub use pattern::SubtreePattern;
pub use stream::MatchStream;
pub use types::{IssueKind, ParseIssue, ParseSummary, StreamItem};
