//! Bounded selection history.

use game_model::Entity;
use std::collections::VecDeque;

/// Maximum number of entries kept in the selection history.
pub const HISTORY_LIMIT: usize = 5;

/// Previously selected entities, oldest first. Pushing onto a full history
/// evicts the oldest entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionHistory {
    entries: VecDeque<Entity>,
}

impl SelectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the most recent entry. Returns the evicted entry, if any.
    pub fn push(&mut self, entity: Entity) -> Option<Entity> {
        self.entries.push_back(entity);
        if self.entries.len() > HISTORY_LIMIT {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Remove and return the most recent entry.
    pub fn pop(&mut self) -> Option<Entity> {
        self.entries.pop_back()
    }

    pub fn latest(&self) -> Option<&Entity> {
        self.entries.back()
    }

    /// Entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
