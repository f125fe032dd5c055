//! Handler traits for the event parser.

use super::types::ParseIssue;
use crate::tree::Element;

/// Receives complete subtrees selected by a pattern.
///
/// Implemented for every `FnMut(&Element)` closure.
pub trait SubtreeHandler {
    /// Process one matched subtree.
    fn handle(&mut self, tree: &Element);
}

impl<F> SubtreeHandler for F
where
    F: FnMut(&Element),
{
    fn handle(&mut self, tree: &Element) {
        self(tree);
    }
}

/// Receives malformed-XML notifications.
pub type ErrorHandler<'h> = Box<dyn FnMut(&ParseIssue) + 'h>;

/// Runs once after all input has been parsed.
pub type EndHandler<'h> = Box<dyn FnOnce() + 'h>;
