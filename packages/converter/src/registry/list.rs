//! Sequential parsing of several documents.

use std::path::PathBuf;

use super::core::HandlerRegistry;
use super::engine::drive;
use super::handler::{EndHandler, ErrorHandler, SubtreeHandler};
use super::pattern::SubtreePattern;
use super::stream::MatchStream;
use super::types::{ParseIssue, ParseSummary, StreamItem};
use crate::error::Result;
use crate::report::ErrorCollector;
use crate::schema;
use crate::types::Document;

/// Parses a batch of documents one after another with shared handlers.
///
/// Document N+1 is not touched before document N is exhausted. End handlers
/// run once, after the last document.
pub struct DocumentList<'h> {
    documents: Vec<Document>,
    registry: HandlerRegistry<'h>,
    on_error: Vec<ErrorHandler<'h>>,
    on_end: Vec<EndHandler<'h>>,
}

impl<'h> DocumentList<'h> {
    #[must_use]
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            registry: HandlerRegistry::new(),
            on_error: Vec::new(),
            on_end: Vec::new(),
        }
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Register a handler for subtrees matching `pattern` in every document.
    ///
    /// # Errors
    /// `InvalidPattern` if the pattern does not compile.
    pub fn on(&mut self, pattern: &str, handler: impl SubtreeHandler + 'h) -> Result<&mut Self> {
        self.registry.register(pattern, handler)?;
        Ok(self)
    }

    /// Unregister a pattern and its handlers.
    pub fn off(&mut self, pattern: &str) -> &mut Self {
        self.registry.remove(pattern);
        self
    }

    /// Register a handler for malformed-XML notifications from any document.
    pub fn on_error(&mut self, handler: impl FnMut(&ParseIssue) + 'h) -> &mut Self {
        self.on_error.push(Box::new(handler));
        self
    }

    /// Register a handler to run once after the last document.
    pub fn on_end(&mut self, handler: impl FnOnce() + 'h) -> &mut Self {
        self.on_end.push(Box::new(handler));
        self
    }

    /// Parse all documents in order, then run the end handlers.
    pub fn parse(mut self) -> ParseSummary {
        let patterns = self.registry.patterns();
        let mut summary = ParseSummary::default();
        for document in &self.documents {
            let stream = MatchStream::new(&document.contents, patterns.clone())
                .with_document(document.name.clone());
            summary.absorb(drive(stream, &mut self.registry, &mut self.on_error));
        }
        for handler in self.on_end {
            handler();
        }
        summary
    }

    /// Validate every document; `true` only if each is accepted by one of
    /// the schemas.
    pub fn validate(&self, schemas: &[PathBuf], errors: &mut ErrorCollector) -> bool {
        self.documents
            .iter()
            .fold(true, |all, doc| schema::validate_document(doc, schemas, errors) && all)
    }
}

/// Pull-based matching over several documents in order.
///
/// Pattern indices refer to `patterns`.
pub fn stream_documents<'x>(
    documents: &'x [Document],
    patterns: &'x [SubtreePattern],
) -> impl Iterator<Item = StreamItem> + 'x {
    documents.iter().flat_map(move |doc| {
        MatchStream::new(&doc.contents, patterns.to_vec()).with_document(doc.name.clone())
    })
}
