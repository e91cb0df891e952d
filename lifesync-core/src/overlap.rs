//! Work/personal conflict detection.

use std::collections::HashSet;

use chrono::Duration;

use crate::event::{Category, Occurrence};

/// Ids of occurrences that intersect at least one occurrence of the other
/// category. Same-category intersections are not conflicts.
///
/// Expects unmasked records: the placeholder check below reads subjects.
pub fn find_overlaps(occurrences: &[Occurrence]) -> HashSet<String> {
    let (personal, work): (Vec<&Occurrence>, Vec<&Occurrence>) = occurrences
        .iter()
        .partition(|o| o.category == Category::Personal);

    let personal: Vec<&Occurrence> = personal
        .into_iter()
        .filter(|p| !is_free_background(p))
        .collect();

    let mut overlapping = HashSet::new();

    for p in &personal {
        for w in &work {
            if p.overlaps(w) {
                overlapping.insert(p.id.clone());
                overlapping.insert(w.id.clone());
            }
        }
    }

    overlapping
}

/// Day-long "Free" blocks in personal calendars mark availability, not plans.
fn is_free_background(occurrence: &Occurrence) -> bool {
    let is_free = occurrence.subject == "Free" || occurrence.subject == "[Free]";
    is_free && (occurrence.is_all_day || occurrence.duration() >= Duration::hours(24))
}
