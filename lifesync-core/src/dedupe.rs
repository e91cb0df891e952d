//! Per-feed occurrence batch keyed by id.

use std::collections::HashMap;

use crate::event::Occurrence;

/// Occurrences from one sync pass of one feed, at most one per id.
///
/// Later inserts replace earlier ones with the same id.
#[derive(Debug, Default, Clone)]
pub struct OccurrenceBatch {
    by_id: HashMap<String, Occurrence>,
    collisions: usize,
}

impl OccurrenceBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, occurrence: Occurrence) {
        if let Some(previous) = self.by_id.insert(occurrence.id.clone(), occurrence) {
            tracing::debug!(id = %previous.id, "Replaced occurrence with colliding id");
            self.collisions += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// How many inserts replaced an existing id.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn get(&self, id: &str) -> Option<&Occurrence> {
        self.by_id.get(id)
    }

    pub fn into_occurrences(self) -> Vec<Occurrence> {
        self.by_id.into_values().collect()
    }
}

impl FromIterator<Occurrence> for OccurrenceBatch {
    fn from_iter<I: IntoIterator<Item = Occurrence>>(iter: I) -> Self {
        let mut batch = OccurrenceBatch::new();
        for occurrence in iter {
            batch.insert(occurrence);
        }
        batch
    }
}

impl Extend<Occurrence> for OccurrenceBatch {
    fn extend<I: IntoIterator<Item = Occurrence>>(&mut self, iter: I) {
        for occurrence in iter {
            self.insert(occurrence);
        }
    }
}
