//! Pull-based matching over a quick-xml event stream.

use std::borrow::Cow;
use std::collections::VecDeque;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::pattern::SubtreePattern;
use super::types::{IssueKind, ParseIssue, StreamItem};
use crate::tree::Element;
use crate::xml::reader::{append_text, reader_for, start_element};

/// An open element.
struct Frame {
    name: String,
    /// The subtree under construction, when this element or an ancestor is
    /// selected by a pattern.
    element: Option<Element>,
    /// Indices of the patterns selecting this element.
    matched: Vec<usize>,
}

/// Lazy, finite sequence of matched subtrees of one document.
///
/// Subtrees are yielded as soon as their end tag is read. When matches nest,
/// the inner subtree comes first and is still part of the outer one.
/// Malformations are yielded as [`StreamItem::Issue`]; after a tokenizer
/// error the stream ends.
pub struct MatchStream<'x> {
    reader: Reader<&'x [u8]>,
    patterns: Vec<SubtreePattern>,
    document: Option<String>,
    stack: Vec<Frame>,
    path: Vec<String>,
    pending: VecDeque<StreamItem>,
    done: bool,
}

impl<'x> MatchStream<'x> {
    /// Stream `xml`, selecting subtrees with `patterns`.
    ///
    /// Pattern indices in yielded matches refer to this list.
    #[must_use]
    pub fn new(xml: &'x str, patterns: Vec<SubtreePattern>) -> Self {
        let mut reader = reader_for(xml);
        reader.check_end_names(false);
        Self {
            reader,
            patterns,
            document: None,
            stack: Vec::new(),
            path: Vec::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Tag issues with a document name.
    #[must_use]
    pub fn with_document(mut self, name: impl Into<String>) -> Self {
        self.document = Some(name.into());
        self
    }

    fn issue(&mut self, kind: IssueKind) {
        let issue = ParseIssue {
            document: self.document.clone(),
            position: self.reader.buffer_position(),
            kind,
        };
        tracing::warn!(%issue, "Malformed XML");
        self.pending.push_back(StreamItem::Issue(issue));
    }

    fn open(&mut self, start: &BytesStart<'_>) {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        self.path.push(name.clone());

        let matched: Vec<usize> = self
            .patterns
            .iter()
            .enumerate()
            .filter(|(_, p)| p.matches(self.path.as_slice()))
            .map(|(i, _)| i)
            .collect();
        let capturing = !matched.is_empty() || self.stack.last().is_some_and(|f| f.element.is_some());

        let element = if capturing {
            match start_element(start) {
                Ok(element) => Some(element),
                Err(e) => {
                    self.issue(IssueKind::Syntax(e.to_string()));
                    Some(Element::new(name.clone()))
                }
            }
        } else {
            None
        };

        self.stack.push(Frame {
            name,
            element,
            matched,
        });
    }

    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        self.path.pop();

        let Some(element) = frame.element else {
            return;
        };
        for &pattern in &frame.matched {
            self.pending.push_back(StreamItem::Match {
                pattern,
                tree: element.clone(),
            });
        }
        if let Some(parent) = self.stack.last_mut().and_then(|f| f.element.as_mut()) {
            parent.push(element);
        }
    }

    fn end_tag(&mut self, name: &str) {
        match self.stack.iter().rposition(|f| f.name == name) {
            Some(index) => {
                if index + 1 != self.stack.len() {
                    let expected = self.stack.last().map(|f| f.name.clone()).unwrap_or_default();
                    self.issue(IssueKind::MismatchedEnd {
                        expected,
                        found: name.to_string(),
                    });
                    // Elements left open inside are dropped, not delivered.
                    while self.stack.len() > index + 1 {
                        self.stack.pop();
                        self.path.pop();
                    }
                }
                self.close();
            }
            None => self.issue(IssueKind::UnexpectedEnd(name.to_string())),
        }
    }

    fn text(&mut self, text: quick_xml::Result<Cow<'_, str>>) {
        let Some(element) = self.stack.last_mut().and_then(|f| f.element.as_mut()) else {
            return;
        };
        match text {
            Ok(text) => append_text(element, text),
            Err(e) => self.issue(IssueKind::Syntax(e.to_string())),
        }
    }

    /// Read events until at least one item is pending or the input ends.
    fn advance(&mut self) {
        while self.pending.is_empty() && !self.done {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => self.open(&e),
                Ok(Event::Empty(e)) => {
                    self.open(&e);
                    self.close();
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.end_tag(&name);
                }
                Ok(Event::Text(e)) => {
                    let capturing = self.stack.last().is_some_and(|f| f.element.is_some());
                    if capturing {
                        self.text(e.unescape());
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    self.text(Ok(Cow::Owned(text)));
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    while let Some(frame) = self.stack.pop() {
                        self.issue(IssueKind::Unclosed(frame.name));
                    }
                    self.path.clear();
                }
                Ok(_) => {}
                Err(e) => {
                    self.issue(IssueKind::Syntax(e.to_string()));
                    self.done = true;
                }
            }
        }
    }
}

impl Iterator for MatchStream<'_> {
    type Item = StreamItem;

    fn next(&mut self) -> Option<StreamItem> {
        self.advance();
        self.pending.pop_front()
    }
}
