//! Stable occurrence identity.
//!
//! Expanded occurrences are keyed `"{uid}_{YYYYMMDDTHHMMSS}"` (UTC start),
//! single events by their bare UID. The suffix shape is fixed so the series
//! id can be recovered from an occurrence id alone.
//!
//! A UID that itself ends in `_` plus a 15-character timestamp is
//! indistinguishable from an expanded id; recovery strips it anyway.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;

use crate::event::{EventDefinition, Occurrence};
use crate::ics::body_preview;
use crate::recurrence::OccurrenceSpan;

static TIMESTAMP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}T\d{6}$").expect("static pattern"));

/// UTC instant as `YYYYMMDDTHHMMSS`.
pub fn compact_timestamp(start: DateTime<Utc>) -> String {
    start.format("%Y%m%dT%H%M%S").to_string()
}

/// Occurrence id for a series UID and start instant.
pub fn occurrence_id(uid: &str, start: DateTime<Utc>, expanded: bool) -> String {
    if expanded {
        format!("{}_{}", uid, compact_timestamp(start))
    } else {
        uid.to_string()
    }
}

/// Series id an occurrence id belongs to.
pub fn base_id(id: &str) -> &str {
    match id.rsplit_once('_') {
        Some((base, suffix)) if TIMESTAMP_SUFFIX.is_match(suffix) => base,
        _ => id,
    }
}

/// Build the stored record for one expanded span of a definition.
pub fn assign(def: &EventDefinition, span: &OccurrenceSpan, synced_at: DateTime<Utc>) -> Occurrence {
    let (organizer_name, organizer_email) = match &def.organizer {
        Some(o) => (o.name.clone(), Some(o.email.clone()).filter(|e| !e.is_empty())),
        None => (None, None),
    };

    Occurrence {
        id: occurrence_id(&def.uid, span.start, span.expanded),
        base_id: def.uid.clone(),
        subject: def.subject.clone(),
        start: span.start,
        end: span.end,
        location: def.location.clone(),
        organizer_name,
        organizer_email,
        attendees: def.attendees.clone(),
        body_preview: def.description.as_deref().map(body_preview),
        is_all_day: def.is_all_day,
        category: def.category,
        last_updated: synced_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expanded_id_carries_compact_utc_timestamp() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 5, 7).unwrap();
        assert_eq!(occurrence_id("abc@host", start, true), "abc@host_20250310T090507");
        assert_eq!(occurrence_id("abc@host", start, false), "abc@host");
    }

    #[test]
    fn base_id_strips_timestamp_suffix() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let uid = "040000008200E00074C5B7101A82E008_series";
        let id = occurrence_id(uid, start, true);

        assert_eq!(base_id(&id), uid);
    }

    #[test]
    fn base_id_is_noop_for_single_events() {
        assert_eq!(base_id("plain-uid"), "plain-uid");
        assert_eq!(base_id("under_score_uid"), "under_score_uid");
        assert_eq!(base_id("almost_20250310T0900"), "almost_20250310T0900");
    }

    #[test]
    fn uid_shaped_like_an_expanded_id_is_ambiguous() {
        // Known limitation: such a UID is read as an occurrence of "meeting".
        assert_eq!(base_id("meeting_20250310T090000"), "meeting");
    }
}
