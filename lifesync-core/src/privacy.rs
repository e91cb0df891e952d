//! Hiding personal event details behind a reveal flag.

use crate::constants::PRIVATE_PLACEHOLDER;
use crate::event::{Category, Occurrence};

/// Replace a personal occurrence's details with the placeholder unless
/// `revealed`. Work occurrences pass through unchanged.
///
/// Must run after overlap detection: it only ever hides text, but conflict
/// computation works on the unmasked records.
pub fn mask(mut occurrence: Occurrence, revealed: bool) -> Occurrence {
    if revealed || occurrence.category != Category::Personal {
        return occurrence;
    }

    occurrence.subject = PRIVATE_PLACEHOLDER.to_string();
    occurrence.location = None;
    occurrence.body_preview = None;
    occurrence.attendees.clear();
    occurrence
}

pub fn mask_all(occurrences: Vec<Occurrence>, revealed: bool) -> Vec<Occurrence> {
    occurrences.into_iter().map(|o| mask(o, revealed)).collect()
}
