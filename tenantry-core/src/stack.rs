//! Connection Stack
//!
//! The ordered sequence of connection identifiers owned by one unit of work.

use serde::{Deserialize, Serialize};

/// Stack of connection identifiers. The top entry is the current tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStack {
    entries: Vec<String>,
}

impl ConnectionStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a connection identifier.
    pub fn push(&mut self, connection: impl Into<String>) {
        self.entries.push(connection.into());
    }

    /// Pop the top identifier. `None` when already empty.
    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop()
    }

    /// Top identifier, if any.
    pub fn peek(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Drop every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Shrink back to `depth` entries. No-op when already shallower.
    pub fn truncate(&mut self, depth: usize) {
        self.entries.truncate(depth);
    }

    /// Number of entries.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tenant is active.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ConnectionStack {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nesting() {
        let mut stack = ConnectionStack::new();
        stack.push("a");
        stack.push("b");
        assert_eq!(stack.peek(), Some("b"));

        assert_eq!(stack.pop().as_deref(), Some("b"));
        assert_eq!(stack.peek(), Some("a"));

        assert_eq!(stack.pop().as_deref(), Some("a"));
        assert_eq!(stack.peek(), None);
    }

    #[test]
    fn test_pop_empty_is_noop() {
        let mut stack = ConnectionStack::new();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.depth(), 0);

        stack.push("tenant_db");
        assert_eq!(stack.peek(), Some("tenant_db"));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut stack: ConnectionStack = ["a", "b", "c"].into_iter().collect();
        stack.reset();
        assert!(stack.is_empty());
        stack.reset();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_truncate() {
        let mut stack: ConnectionStack = ["a", "b", "c"].into_iter().collect();
        stack.truncate(1);
        assert_eq!(stack.iter().collect::<Vec<_>>(), vec!["a"]);
        stack.truncate(5);
        assert_eq!(stack.depth(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Start(String),
        End,
        Reset,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => "[a-z_]{1,8}".prop_map(Op::Start),
            3 => Just(Op::End),
            1 => Just(Op::Reset),
        ]
    }

    proptest! {
        #[test]
        fn prop_current_is_latest_unmatched_start(ops in prop::collection::vec(op(), 0..64)) {
            let mut stack = ConnectionStack::new();
            let mut open: Vec<String> = Vec::new();

            for op in ops {
                match op {
                    Op::Start(id) => {
                        stack.push(id.clone());
                        open.push(id);
                    }
                    Op::End => {
                        stack.pop();
                        open.pop();
                    }
                    Op::Reset => {
                        stack.reset();
                        open.clear();
                        prop_assert_eq!(stack.peek(), None);
                    }
                }
                prop_assert_eq!(stack.peek(), open.last().map(String::as_str));
                prop_assert_eq!(stack.depth(), open.len());
            }
        }
    }
}
