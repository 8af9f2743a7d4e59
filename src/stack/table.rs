//! Name-keyed LIFO stacks of handler references.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::HandlerRef;

/// One thread's override stacks for one tier.
///
/// A name is present only while its stack is non-empty. Removal methods hand
/// the released references back to the caller instead of dropping them, so
/// destructors never run while the owning lock is held.
#[derive(Debug, Default)]
pub(crate) struct StackTable {
    // Top of stack is the last element.
    stacks: HashMap<String, Vec<HandlerRef>>,
}

impl StackTable {
    pub fn push(&mut self, name: &str, handler: HandlerRef) {
        self.stacks.entry(name.to_string()).or_default().push(handler);
    }

    pub fn pop(&mut self, name: &str) -> Option<HandlerRef> {
        let stack = self.stacks.get_mut(name)?;
        let top = stack.pop();
        if stack.is_empty() {
            self.stacks.remove(name);
        }
        top
    }

    /// Remove the topmost entry for `name` that is `handler` itself.
    ///
    /// Returns the removed reference and whether it was the top of its stack.
    pub fn remove_entry(&mut self, name: &str, handler: &HandlerRef) -> Option<(HandlerRef, bool)> {
        let stack = self.stacks.get_mut(name)?;
        let index = stack.iter().rposition(|h| Arc::ptr_eq(h, handler))?;
        let was_top = index + 1 == stack.len();
        let removed = stack.remove(index);
        if stack.is_empty() {
            self.stacks.remove(name);
        }
        Some((removed, was_top))
    }

    pub fn top(&self, name: &str) -> Option<HandlerRef> {
        self.stacks.get(name).and_then(|stack| stack.last().cloned())
    }

    pub fn depth(&self, name: &str) -> usize {
        self.stacks.get(name).map_or(0, Vec::len)
    }

    /// Top-of-stack reference for every overridden name.
    pub fn tops(&self) -> Vec<(String, HandlerRef)> {
        self.stacks
            .iter()
            .filter_map(|(name, stack)| stack.last().map(|top| (name.clone(), top.clone())))
            .collect()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Empty the table, returning every reference it held.
    pub fn drain(&mut self) -> Vec<HandlerRef> {
        self.stacks.drain().flat_map(|(_, stack)| stack).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CallbackHandler;

    fn handler() -> HandlerRef {
        CallbackHandler::new(|_, _| {}).into_ref()
    }

    #[test]
    fn test_push_pop_is_lifo_and_removes_empty_names() {
        let mut table = StackTable::default();
        let a = handler();
        let b = handler();

        table.push("auth", a.clone());
        table.push("auth", b.clone());
        assert_eq!(table.depth("auth"), 2);
        assert!(Arc::ptr_eq(&table.top("auth").unwrap(), &b));

        assert!(Arc::ptr_eq(&table.pop("auth").unwrap(), &b));
        assert!(Arc::ptr_eq(&table.top("auth").unwrap(), &a));

        assert!(table.pop("auth").is_some());
        assert!(table.is_empty());
        assert!(table.pop("auth").is_none());
    }

    #[test]
    fn test_remove_entry_finds_buried_handler() {
        let mut table = StackTable::default();
        let a = handler();
        let b = handler();
        table.push("q", a.clone());
        table.push("q", b.clone());

        let (removed, was_top) = table.remove_entry("q", &a).unwrap();
        assert!(Arc::ptr_eq(&removed, &a));
        assert!(!was_top);
        assert_eq!(table.depth("q"), 1);
        assert!(table.remove_entry("q", &a).is_none());
    }

    #[test]
    fn test_drain_returns_every_reference() {
        let mut table = StackTable::default();
        table.push("a", handler());
        table.push("a", handler());
        table.push("b", handler());
        assert_eq!(table.tops().len(), 2);
        assert_eq!(table.drain().len(), 3);
        assert!(table.is_empty());
    }
}
