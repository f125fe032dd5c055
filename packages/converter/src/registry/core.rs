//! Registry mapping subtree patterns to handlers.

use super::handler::SubtreeHandler;
use super::pattern::SubtreePattern;
use crate::error::Result;
use crate::tree::Element;

struct Entry<'h> {
    pattern: SubtreePattern,
    handlers: Vec<Box<dyn SubtreeHandler + 'h>>,
}

/// Ordered list of patterns, each with its handlers in registration order.
#[derive(Default)]
pub struct HandlerRegistry<'h> {
    entries: Vec<Entry<'h>>,
}

impl<'h> HandlerRegistry<'h> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a handler for a pattern.
    ///
    /// Handlers added for a pattern that is already registered run after the
    /// existing ones.
    ///
    /// # Errors
    /// `InvalidPattern` if the pattern does not compile.
    pub fn register(&mut self, pattern: &str, handler: impl SubtreeHandler + 'h) -> Result<()> {
        let handler: Box<dyn SubtreeHandler + 'h> = Box::new(handler);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.pattern.as_str() == pattern) {
            entry.handlers.push(handler);
            return Ok(());
        }
        self.entries.push(Entry {
            pattern: SubtreePattern::parse(pattern)?,
            handlers: vec![handler],
        });
        Ok(())
    }

    /// Remove a pattern and all its handlers.
    ///
    /// Returns whether the pattern was registered.
    pub fn remove(&mut self, pattern: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.pattern.as_str() != pattern);
        self.entries.len() != before
    }

    /// Check if a pattern is registered.
    #[must_use]
    pub fn has_pattern(&self, pattern: &str) -> bool {
        self.entries.iter().any(|e| e.pattern.as_str() == pattern)
    }

    /// Registered patterns, in registration order.
    #[must_use]
    pub fn patterns(&self) -> Vec<SubtreePattern> {
        self.entries.iter().map(|e| e.pattern.clone()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the handlers of the pattern at `index` on `tree`.
    pub(crate) fn dispatch(&mut self, index: usize, tree: &Element) {
        if let Some(entry) = self.entries.get_mut(index) {
            for handler in &mut entry.handlers {
                handler.handle(tree);
            }
        }
    }
}
