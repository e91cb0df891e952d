//! Feed parsing using the icalendar crate's parser.

use chrono::Duration;
use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::constants::{BODY_PREVIEW_CHARS, STATUS_WORDS};
use crate::error::{SyncError, SyncResult};
use crate::event::{Category, EventDefinition, EventTime, Organizer, Recurrence};

/// Raw text of one feed, unfolded and ready to be walked.
pub struct FeedDocument {
    unfolded: String,
    category: Category,
}

impl FeedDocument {
    pub fn new(raw: &str, category: Category) -> Self {
        FeedDocument {
            unfolded: unfold(raw),
            category,
        }
    }

    /// Lazily yield one result per VEVENT in the feed.
    ///
    /// Fails only when the document as a whole is not iCalendar. A VEVENT
    /// that cannot be turned into a definition yields an `Err` item and the
    /// walk continues with the next one.
    pub fn definitions(
        &self,
    ) -> SyncResult<impl Iterator<Item = SyncResult<EventDefinition>> + '_> {
        let text = self.unfolded.trim_start_matches('\u{feff}').trim_start();
        if !text.starts_with("BEGIN:VCALENDAR") {
            return Err(SyncError::Parse("missing BEGIN:VCALENDAR".into()));
        }

        let calendar = read_calendar(text).map_err(|e| SyncError::Parse(e.to_string()))?;
        let category = self.category;

        Ok(calendar
            .components
            .into_iter()
            .filter(|c| c.name == "VEVENT")
            .map(move |vevent| parse_vevent(&vevent, category)))
    }
}

/// Convert one VEVENT component into an event definition.
fn parse_vevent(vevent: &Component, category: Category) -> SyncResult<EventDefinition> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .filter(|uid| !uid.trim().is_empty())
        .ok_or_else(|| component_error("(missing)", "no UID"))?;

    let start_time = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| component_error(&uid, "no DTSTART"))
        .and_then(|p| {
            DatePerhapsTime::try_from(p)
                .map(to_event_time)
                .map_err(|_| component_error(&uid, "unreadable DTSTART"))
        })?;

    let end_time = match vevent.find_prop("DTEND") {
        Some(p) => Some(
            DatePerhapsTime::try_from(p)
                .map(to_event_time)
                .map_err(|_| component_error(&uid, "unreadable DTEND"))?,
        ),
        None => None,
    };

    let duration = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_duration(p.val.as_ref()));

    let description = vevent
        .find_prop("DESCRIPTION")
        .map(|p| unescape_text(p.val.as_ref()))
        .filter(|d| !d.trim().is_empty());

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_else(|| "(No title)".to_string());

    let subject = match category {
        Category::Work => availability_subject(summary, description.as_deref()),
        Category::Personal => summary,
    };

    let location = vevent
        .find_prop("LOCATION")
        .map(|p| unescape_text(p.val.as_ref()))
        .filter(|l| !l.trim().is_empty());

    let is_all_day =
        start_time.is_date() || end_time.as_ref().is_some_and(EventTime::is_date);

    // Recurrence (RRULE, EXDATE)
    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());
    let exdates: Vec<EventTime> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();
    let recurrence = rrule.map(|rrule| Recurrence { rrule, exdates });

    let organizer = vevent.find_prop("ORGANIZER").map(parse_organizer);
    let attendees: Vec<String> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "ATTENDEE")
        .map(|p| strip_mailto(p.val.as_ref()).to_string())
        .filter(|email| !email.is_empty())
        .collect();

    Ok(EventDefinition {
        category,
        uid,
        subject,
        start_time,
        end_time,
        duration,
        recurrence,
        is_all_day,
        location,
        organizer,
        attendees,
        description,
    })
}

fn component_error(uid: &str, reason: &str) -> SyncError {
    SyncError::Component {
        uid: uid.to_string(),
        reason: reason.to_string(),
    }
}

/// Outlook publishes availability ("Free", "Busy", ...) in place of a title
/// for calendars shared at free/busy detail. Prefer the description when it
/// carries a real title, otherwise bracket the status word.
fn availability_subject(summary: String, description: Option<&str>) -> String {
    if !STATUS_WORDS.contains(&summary.as_str()) {
        return summary;
    }

    match description.map(str::trim) {
        Some(desc) if !desc.is_empty() && !STATUS_WORDS.contains(&desc) => desc.to_string(),
        _ => format!("[{}]", summary),
    }
}

/// DESCRIPTION truncated for storage.
pub fn body_preview(description: &str) -> String {
    if description.chars().count() > BODY_PREVIEW_CHARS {
        let truncated: String = description.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    } else {
        description.to_string()
    }
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

/// Parse an EXDATE property into a list of EventTime values.
///
/// Handles TZID and VALUE=DATE parameters, UTC and floating values, and
/// comma-separated lists.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if is_date {
                chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date)
            } else if let Some(ref tz) = tzid {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeZoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else if let Some(utc) = s.strip_suffix('Z') {
                chrono::NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            } else {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::DateTimeFloating)
            }
        })
        .collect()
}

fn parse_organizer(prop: &Property) -> Organizer {
    let name = prop
        .params
        .iter()
        .find(|p| p.key == "CN")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    Organizer {
        name,
        email: strip_mailto(prop.val.as_ref()).to_string(),
    }
}

fn strip_mailto(value: &str) -> &str {
    value
        .strip_prefix("mailto:")
        .or_else(|| value.strip_prefix("MAILTO:"))
        .unwrap_or(value)
}

/// Parse a DURATION value (PT45M, P1D, P1W). Negative durations are ignored.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().trim_start_matches('+');
    if value.starts_with('-') {
        return None;
    }

    let duration = iso8601::duration(value).ok()?;
    let std_duration: std::time::Duration = duration.into();
    Duration::from_std(std_duration).ok()
}

/// Undo RFC 5545 TEXT escaping.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn definitions(ics: &str, category: Category) -> Vec<SyncResult<EventDefinition>> {
        let doc = FeedDocument::new(ics, category);
        doc.definitions().expect("Should parse feed").collect()
    }

    #[test]
    fn test_parse_single_event() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:single-1
SUMMARY:Dentist
DTSTART:20250310T170000Z
DTEND:20250310T180000Z
LOCATION:Main St\, Suite 4
ORGANIZER;CN=Dr. Smile:mailto:smile@example.com
ATTENDEE:mailto:me@example.com
ATTENDEE:mailto:you@example.com
END:VEVENT
END:VCALENDAR"#;

        let defs = definitions(ics, Category::Personal);
        assert_eq!(defs.len(), 1);

        let def = defs.into_iter().next().unwrap().expect("Should parse event");
        assert_eq!(def.uid, "single-1");
        assert_eq!(def.subject, "Dentist");
        assert_eq!(def.start(), Utc.with_ymd_and_hms(2025, 3, 10, 17, 0, 0).unwrap());
        assert_eq!(def.end(), Some(Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap()));
        assert_eq!(def.location.as_deref(), Some("Main St, Suite 4"));
        assert!(!def.is_all_day);
        assert!(def.recurrence.is_none());

        let organizer = def.organizer.expect("Should have organizer");
        assert_eq!(organizer.name.as_deref(), Some("Dr. Smile"));
        assert_eq!(organizer.email, "smile@example.com");
        assert_eq!(def.attendees, vec!["me@example.com", "you@example.com"]);
    }

    #[test]
    fn test_malformed_component_does_not_abort_feed() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
SUMMARY:No uid here
DTSTART:20250310T170000Z
END:VEVENT
BEGIN:VEVENT
UID:no-start
SUMMARY:No start
END:VEVENT
BEGIN:VEVENT
UID:good
SUMMARY:Good one
DTSTART:20250311T170000Z
DTEND:20250311T180000Z
END:VEVENT
END:VCALENDAR"#;

        let defs = definitions(ics, Category::Personal);
        assert_eq!(defs.len(), 3);
        assert!(matches!(defs[0], Err(SyncError::Component { .. })));
        assert!(matches!(defs[1], Err(SyncError::Component { ref uid, .. }) if uid == "no-start"));
        assert_eq!(defs[2].as_ref().unwrap().uid, "good");
    }

    #[test]
    fn test_unparseable_document_is_feed_level_error() {
        let doc = FeedDocument::new("<html><body>Not found</body></html>", Category::Work);
        let err = doc.definitions().err().expect("Should fail");
        assert!(err.is_feed_level());
    }

    #[test]
    fn test_status_word_subject_uses_description() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:busy-1
SUMMARY:Busy
DESCRIPTION:Quarterly planning
DTSTART:20250310T170000Z
DTEND:20250310T180000Z
END:VEVENT
BEGIN:VEVENT
UID:free-1
SUMMARY:Free
DTSTART;VALUE=DATE:20250310
DTEND;VALUE=DATE:20250311
END:VEVENT
END:VCALENDAR"#;

        let defs: Vec<_> = definitions(ics, Category::Work)
            .into_iter()
            .map(|d| d.unwrap())
            .collect();

        assert_eq!(defs[0].subject, "Quarterly planning");
        assert_eq!(defs[1].subject, "[Free]");
        assert!(defs[1].is_all_day);
    }

    #[test]
    fn test_status_words_left_alone_for_personal_feeds() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:free-1
SUMMARY:Free
DTSTART:20250310T170000Z
DTEND:20250310T180000Z
END:VEVENT
END:VCALENDAR"#;

        let def = definitions(ics, Category::Personal).remove(0).unwrap();
        assert_eq!(def.subject, "Free");
    }

    #[test]
    fn test_parse_recurrence_with_zoned_exdates_and_duration() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:weekly-1
SUMMARY:Standup
DTSTART;TZID=America/New_York:20240101T100000
DURATION:PT15M
RRULE:FREQ=WEEKLY;BYDAY=MO
EXDATE;TZID=America/New_York:20240108T100000,20240115T100000
END:VEVENT
END:VCALENDAR"#;

        let def = definitions(ics, Category::Work).remove(0).unwrap();
        assert_eq!(def.duration, Some(Duration::minutes(15)));
        assert!(def.end_time.is_none());

        let recurrence = def.recurrence.expect("Should have recurrence");
        assert_eq!(recurrence.rrule, "FREQ=WEEKLY;BYDAY=MO");
        assert_eq!(recurrence.exdates.len(), 2);
        for exdate in &recurrence.exdates {
            match exdate {
                EventTime::DateTimeZoned { tzid, .. } => assert_eq!(tzid, "America/New_York"),
                other => panic!("Expected DateTimeZoned, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_body_preview_truncates() {
        let long = "x".repeat(BODY_PREVIEW_CHARS + 20);
        let preview = body_preview(&long);
        assert_eq!(preview.chars().count(), BODY_PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));

        assert_eq!(body_preview("short"), "short");
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text(r"a\, b\; c\nd\\e"), "a, b; c\nd\\e");
    }
}
