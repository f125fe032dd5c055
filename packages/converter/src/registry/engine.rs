//! Callback-driven parsing of one document.

use std::path::PathBuf;

use super::core::HandlerRegistry;
use super::handler::{EndHandler, ErrorHandler, SubtreeHandler};
use super::stream::MatchStream;
use super::types::{ParseIssue, ParseSummary, StreamItem};
use crate::error::Result;
use crate::report::ErrorCollector;
use crate::schema;
use crate::types::Document;

/// Feed every item of `stream` to the registry or the error handlers.
pub(crate) fn drive(
    stream: MatchStream<'_>,
    registry: &mut HandlerRegistry<'_>,
    on_error: &mut [ErrorHandler<'_>],
) -> ParseSummary {
    let mut summary = ParseSummary::default();
    for item in stream {
        match item {
            StreamItem::Match { pattern, tree } => {
                summary.matches += 1;
                registry.dispatch(pattern, &tree);
            }
            StreamItem::Issue(issue) => {
                summary.issues += 1;
                for handler in on_error.iter_mut() {
                    handler(&issue);
                }
            }
        }
    }
    summary
}

/// Event parser over one buffered document.
///
/// Handlers are registered per pattern and run synchronously, in
/// registration order, as soon as a matching subtree is complete. End
/// handlers run once, after the whole document.
///
/// # Examples
/// ```
/// use std::cell::RefCell;
/// use rex_converter::registry::EventParser;
/// use rex_converter::tree::Element;
///
/// let ids = RefCell::new(Vec::new());
/// let mut parser = EventParser::from_str(r#"<orders><order id="1"/><order id="2"/></orders>"#);
/// parser
///     .on("//orders/order", |order: &Element| {
///         ids.borrow_mut().push(order.attr("id").unwrap_or_default().to_string());
///     })
///     .unwrap();
/// parser.parse();
/// assert_eq!(*ids.borrow(), ["1", "2"]);
/// ```
pub struct EventParser<'h> {
    document: Document,
    registry: HandlerRegistry<'h>,
    on_error: Vec<ErrorHandler<'h>>,
    on_end: Vec<EndHandler<'h>>,
}

impl<'h> EventParser<'h> {
    /// Create a parser for a document.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            registry: HandlerRegistry::new(),
            on_error: Vec::new(),
            on_end: Vec::new(),
        }
    }

    /// Create a parser for an unnamed in-memory document.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(xml: &str) -> Self {
        Self::new(Document::new("-", xml))
    }

    /// The document being parsed.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Register a handler for subtrees matching `pattern`.
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

    /// Register a handler for malformed-XML notifications.
    pub fn on_error(&mut self, handler: impl FnMut(&ParseIssue) + 'h) -> &mut Self {
        self.on_error.push(Box::new(handler));
        self
    }

    /// Register a handler to run after the document has been parsed.
    pub fn on_end(&mut self, handler: impl FnOnce() + 'h) -> &mut Self {
        self.on_end.push(Box::new(handler));
        self
    }

    /// Pull-based view of the registered patterns over the document.
    ///
    /// Handlers are not invoked; the caller consumes the items.
    #[must_use]
    pub fn stream(&self) -> MatchStream<'_> {
        MatchStream::new(&self.document.contents, self.registry.patterns())
            .with_document(self.document.name.clone())
    }

    /// Parse the document, running handlers, then the end handlers.
    pub fn parse(mut self) -> ParseSummary {
        let stream = MatchStream::new(&self.document.contents, self.registry.patterns())
            .with_document(self.document.name.clone());
        let summary = drive(stream, &mut self.registry, &mut self.on_error);
        tracing::debug!(
            document = %self.document.name,
            matches = summary.matches,
            issues = summary.issues,
            "Parsed document"
        );
        for handler in self.on_end {
            handler();
        }
        summary
    }

    /// Validate the document against candidate schemas.
    ///
    /// Returns `true` as soon as one schema accepts the document. Otherwise
    /// the violations found by the last schema are recorded as fatal errors.
    pub fn validate(&self, schemas: &[PathBuf], errors: &mut ErrorCollector) -> bool {
        schema::validate_document(&self.document, schemas, errors)
    }
}
