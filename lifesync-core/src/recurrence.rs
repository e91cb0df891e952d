//! Bounded expansion of event definitions into dated occurrences.
//!
//! Recurring definitions are evaluated with the rrule crate, consuming at
//! most [`MAX_RECURRENCE_ITERATIONS`] candidates. Candidates are expected to
//! arrive in non-decreasing order, which is what allows the walk to stop at
//! the first candidate past the window. A regression in that order is
//! detected and turns the early exit off for the rest of the walk.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rrule::RRuleSet;

use crate::constants::{DEFAULT_EVENT_MINUTES, MAX_RECURRENCE_ITERATIONS, WORK_PLACEHOLDER_PHRASES};
use crate::date_range::SyncWindow;
use crate::error::{SyncError, SyncResult};
use crate::event::{Category, EventDefinition, EventTime, Recurrence};

/// Start and end of one occurrence produced by expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Whether this came out of a recurrence rule (and so gets a suffixed id).
    pub expanded: bool,
}

/// Expand one definition into the occurrences that start inside `window`.
///
/// Never fails: a rule that cannot be evaluated degrades to a single
/// occurrence at the nominal start.
pub fn expand(def: &EventDefinition, window: &SyncWindow) -> Vec<OccurrenceSpan> {
    let length = occurrence_length(def);

    let spans: Vec<OccurrenceSpan> = match &def.recurrence {
        None => single_occurrence(def, window, length).into_iter().collect(),
        Some(recurrence) => match rule_set(&def.uid, &def.start_time, recurrence) {
            Ok(rule_set) => {
                let candidates = rule_set.into_iter().map(|dt| dt.with_timezone(&Utc));
                select_candidates(candidates, window)
                    .into_iter()
                    .map(|start| OccurrenceSpan {
                        start,
                        end: start + length,
                        expanded: true,
                    })
                    .collect()
            }
            Err(e) => {
                tracing::warn!(uid = %def.uid, error = %e, "Falling back to a single occurrence");
                single_occurrence(def, window, length).into_iter().collect()
            }
        },
    };

    if def.category != Category::Work {
        return spans;
    }

    spans
        .into_iter()
        .filter(|span| {
            let placeholder = is_work_placeholder(&def.subject, span);
            if placeholder {
                tracing::debug!(uid = %def.uid, subject = %def.subject, "Dropping availability placeholder");
            }
            !placeholder
        })
        .collect()
}

/// Walk candidate starts under the iteration cap and keep those in `window`.
pub fn select_candidates(
    candidates: impl IntoIterator<Item = DateTime<Utc>>,
    window: &SyncWindow,
) -> Vec<DateTime<Utc>> {
    let mut selected = Vec::new();
    let mut previous: Option<DateTime<Utc>> = None;
    let mut monotonic = true;

    for candidate in candidates.into_iter().take(MAX_RECURRENCE_ITERATIONS) {
        if let Some(prev) = previous {
            if candidate < prev && monotonic {
                tracing::warn!(%candidate, %prev, "Recurrence candidates went backwards, scanning to the cap");
                monotonic = false;
            }
        }
        previous = Some(candidate);

        if candidate > window.end {
            if monotonic {
                break;
            }
            continue;
        }
        if candidate < window.start {
            tracing::trace!(%candidate, "Candidate before window");
            continue;
        }

        selected.push(candidate);
    }

    selected
}

/// Explicit DURATION, else DTEND - DTSTART, else the default length.
fn occurrence_length(def: &EventDefinition) -> Duration {
    if let Some(duration) = def.duration {
        return duration;
    }

    match def.end() {
        Some(end) if end >= def.start() => end - def.start(),
        _ => Duration::minutes(DEFAULT_EVENT_MINUTES),
    }
}

fn single_occurrence(
    def: &EventDefinition,
    window: &SyncWindow,
    length: Duration,
) -> Option<OccurrenceSpan> {
    let start = def.start();
    window.contains(start).then(|| OccurrenceSpan {
        start,
        end: start + length,
        expanded: false,
    })
}

/// All-day (or longer) availability blocks published by work calendars.
fn is_work_placeholder(subject: &str, span: &OccurrenceSpan) -> bool {
    let subject = subject.to_lowercase();
    let is_placeholder = WORK_PLACEHOLDER_PHRASES
        .iter()
        .any(|phrase| subject.contains(&phrase.to_lowercase()));

    is_placeholder && span.end - span.start >= Duration::hours(24)
}

fn rule_set(uid: &str, start: &EventTime, recurrence: &Recurrence) -> SyncResult<RRuleSet> {
    build_rrule_string(start, recurrence)
        .parse::<RRuleSet>()
        .map_err(|e| SyncError::Expansion {
            uid: uid.to_string(),
            reason: e.to_string(),
        })
}

/// Build an iCalendar-format rule set string for the rrule crate parser.
fn build_rrule_string(start: &EventTime, recurrence: &Recurrence) -> String {
    let mut lines = vec![format!("DTSTART{}", rrule_time_value(start))];

    lines.push(format!("RRULE:{}", normalize_until(&recurrence.rrule, start)));

    for exdate in &recurrence.exdates {
        lines.push(format!("EXDATE{}", rrule_time_value(exdate)));
    }

    lines.join("\n")
}

/// Rewrite an `UNTIL` part to a UTC instant, the only form the rrule crate
/// accepts next to the DTSTART written by [`rrule_time_value`].
///
/// A date bound covers its whole day. A floating bound is read in the
/// DTSTART's zone, or as UTC when DTSTART has none. Values that do not parse
/// are passed through and fail rule parsing as before.
fn normalize_until(rrule: &str, start: &EventTime) -> String {
    rrule
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                match until_as_utc(value, start) {
                    Some(until) => format!("{}={}", key, until.format("%Y%m%dT%H%M%SZ")),
                    None => part.to_string(),
                }
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn until_as_utc(value: &str, start: &EventTime) -> Option<DateTime<Utc>> {
    if let Some(utc) = value.strip_suffix(['Z', 'z']) {
        return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(|dt| dt.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return date.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc());
    }

    let datetime = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    let bound = match start {
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime,
            tzid: tzid.clone(),
        },
        _ => EventTime::DateTimeFloating(datetime),
    };
    Some(bound.to_utc())
}

/// Parameter and value part of a DTSTART/EXDATE line.
///
/// The rrule crate needs a datetime, so all-day dates become midnight UTC.
/// Zones chrono-tz does not know (e.g. Windows zone names) are written as
/// the equivalent UTC instant.
fn rrule_time_value(time: &EventTime) -> String {
    match time {
        EventTime::Date(d) => format!(":{}T000000Z", d.format("%Y%m%d")),
        EventTime::DateTimeUtc(dt) => format!(":{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::DateTimeFloating(dt) => format!(":{}Z", dt.format("%Y%m%dT%H%M%S")),
        EventTime::DateTimeZoned { datetime, tzid } => {
            if tzid.parse::<chrono_tz::Tz>().is_ok() {
                format!(";TZID={}:{}", tzid, datetime.format("%Y%m%dT%H%M%S"))
            } else {
                format!(":{}", time.to_utc().format("%Y%m%dT%H%M%SZ"))
            }
        }
    }
}
