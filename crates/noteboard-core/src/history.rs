//! Bounded undo/redo history.

use std::collections::VecDeque;

/// Default number of snapshots kept on each stack.
pub const DEFAULT_CAPACITY: usize = 50;

/// Two bounded stacks of snapshots.
///
/// The history never looks inside a snapshot. Callers pass the current
/// state in and get the state to restore back, so the same type works for
/// any snapshot shape.
#[derive(Debug, Clone)]
pub struct History<S> {
    capacity: usize,
    past: VecDeque<S>,
    future: VecDeque<S>,
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<S> History<S> {
    /// Create an empty history. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            past: VecDeque::new(),
            future: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push the pre-mutation state onto `past` and clear `future`
    /// (call before making changes).
    pub fn commit(&mut self, current: S) {
        Self::push_bounded(&mut self.past, current, self.capacity, "undo");
        self.future.clear();
    }

    /// Step back. Returns the state to restore, or `None` if there is
    /// nothing to undo, in which case `current` is dropped untouched.
    pub fn undo(&mut self, current: S) -> Option<S> {
        let previous = self.past.pop_back()?;
        Self::push_bounded(&mut self.future, current, self.capacity, "redo");
        Some(previous)
    }

    /// Step forward. Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self, current: S) -> Option<S> {
        let next = self.future.pop_back()?;
        Self::push_bounded(&mut self.past, current, self.capacity, "undo");
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of entries on the undo stack.
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of entries on the redo stack.
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Most recent undo entry.
    pub fn peek_past(&self) -> Option<&S> {
        self.past.back()
    }

    /// Most recent redo entry.
    pub fn peek_future(&self) -> Option<&S> {
        self.future.back()
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    fn push_bounded(stack: &mut VecDeque<S>, state: S, capacity: usize, name: &str) {
        stack.push_back(state);
        while stack.len() > capacity {
            stack.pop_front();
            log::debug!("Evicted oldest {name} entry (capacity {capacity})");
        }
    }
}
