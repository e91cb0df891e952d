//! Two-level exclusion list: whole series or single occurrences.
//!
//! Ignoring is a read-time projection. Stored occurrences are never touched.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Occurrence;
use crate::identity::base_id;

/// Every occurrence of a series is hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesIgnore {
    pub base_id: String,
    pub subject: String,
    pub reason: Option<String>,
    pub ignored_at: DateTime<Utc>,
}

/// One dated occurrence is hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceIgnore {
    pub occurrence_id: String,
    pub subject: String,
    pub original_start: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub ignored_at: DateTime<Utc>,
}

/// Ignored ids, as read from the store for one request.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    pub base_ids: HashSet<String>,
    pub occurrence_ids: HashSet<String>,
}

impl IgnoreList {
    pub fn new(
        base_ids: impl IntoIterator<Item = String>,
        occurrence_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        IgnoreList {
            base_ids: base_ids.into_iter().collect(),
            occurrence_ids: occurrence_ids.into_iter().collect(),
        }
    }

    /// Either check alone is enough to hide an occurrence.
    ///
    /// The series id is recovered from the occurrence id, so a record whose
    /// stored `base_id` disagrees with its id is judged by its id.
    pub fn is_ignored(&self, occurrence: &Occurrence) -> bool {
        self.occurrence_ids.contains(&occurrence.id)
            || self.base_ids.contains(base_id(&occurrence.id))
    }

    /// Occurrences that survive the list, in their original order.
    pub fn apply(&self, occurrences: Vec<Occurrence>) -> Vec<Occurrence> {
        if self.base_ids.is_empty() && self.occurrence_ids.is_empty() {
            return occurrences;
        }

        occurrences
            .into_iter()
            .filter(|o| !self.is_ignored(o))
            .collect()
    }
}
