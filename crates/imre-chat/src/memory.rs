//! Bounded conversation memory.

use std::collections::VecDeque;

use imre_core::MemoryEntry;

/// Ring buffer of the most recent memory entries. Oldest entries are
/// evicted first once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    entries: VecDeque<MemoryEntry>,
    capacity: usize,
}

impl MemoryBuffer {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted one if the buffer was full.
    pub fn push(&mut self, entry: MemoryEntry) -> Option<MemoryEntry> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Entries oldest first.
    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Up to `limit` most recent entries carrying `tag`, oldest first.
    pub fn recent_tagged(&self, tag: &str, limit: usize) -> Vec<MemoryEntry> {
        let mut found: Vec<MemoryEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.tags.contains(tag))
            .take(limit)
            .cloned()
            .collect();
        found.reverse();
        found
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
