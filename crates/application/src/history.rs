//! Bounded, linear undo/redo over whole annotation sets.

use std::sync::Arc;

use lectern_core::Annotation;

pub const MAX_HISTORY: usize = 50;

/// An immutable annotation set. Shared between the history and the live tab.
pub type Snapshot = Arc<[Annotation]>;

pub fn empty_snapshot() -> Snapshot {
    Arc::from(Vec::new())
}

#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: Vec<Snapshot>,
    index: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::seeded(empty_snapshot())
    }
}

impl History {
    pub fn seeded(initial: Snapshot) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    /// Rebuilds a history from stored parts. An empty list is seeded with the
    /// empty set and an out-of-range index is clamped to the last entry.
    pub fn from_parts(mut entries: Vec<Snapshot>, index: usize) -> Self {
        if entries.is_empty() {
            entries.push(empty_snapshot());
        }
        if entries.len() > MAX_HISTORY {
            let excess = entries.len() - MAX_HISTORY;
            entries.drain(..excess);
            let index = index.saturating_sub(excess);
            return Self::from_parts(entries, index);
        }
        let index = index.min(entries.len() - 1);
        Self { entries, index }
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> &Snapshot {
        &self.entries[self.index]
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Drops any redo entries, appends `set`, and trims the oldest entries
    /// beyond `MAX_HISTORY`.
    pub fn record(&mut self, set: impl Into<Snapshot>) -> Snapshot {
        let set = set.into();
        self.entries.truncate(self.index + 1);
        self.entries.push(Arc::clone(&set));
        if self.entries.len() > MAX_HISTORY {
            let excess = self.entries.len() - MAX_HISTORY;
            self.entries.drain(..excess);
        }
        self.index = self.entries.len() - 1;
        set
    }

    pub fn undo(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(Arc::clone(&self.entries[self.index]))
    }

    pub fn redo(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(Arc::clone(&self.entries[self.index]))
    }
}
