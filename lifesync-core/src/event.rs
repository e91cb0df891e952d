//! Event types shared by the sync and read paths.
//!
//! An [`EventDefinition`] is what a feed says (possibly recurring). An
//! [`Occurrence`] is one concrete dated instance of it, which is what gets
//! stored, filtered, compared and laid out.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the work/personal split a feed belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DTSTART/DTEND/EXDATE value as written in the feed.
///
/// Kept in its original form so recurrence rules can be evaluated in the
/// event's own timezone (a weekly 9:00 meeting stays at 9:00 across DST).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Absolute instant for this value.
    ///
    /// Dates map to midnight UTC and floating times are read as UTC. Zoned
    /// times with an unknown TZID also fall back to UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
            EventTime::DateTimeUtc(dt) => *dt,
            EventTime::DateTimeFloating(dt) => dt.and_utc(),
            EventTime::DateTimeZoned { datetime, tzid } => match tzid.parse::<chrono_tz::Tz>() {
                Ok(tz) => tz
                    .from_local_datetime(datetime)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| datetime.and_utc()),
                Err(_) => {
                    tracing::warn!(tzid = %tzid, "Unknown timezone, reading time as UTC");
                    datetime.and_utc()
                }
            },
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} {}", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// RRULE plus the EXDATEs that punch holes in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub rrule: String,
    pub exdates: Vec<EventTime>,
}

/// Organizer of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    pub name: Option<String>,
    pub email: String,
}

/// A parsed, not yet expanded calendar entry.
#[derive(Debug, Clone)]
pub struct EventDefinition {
    pub category: Category,
    pub uid: String,
    pub subject: String,
    /// DTSTART as written in the feed.
    pub start_time: EventTime,
    pub end_time: Option<EventTime>,
    pub duration: Option<Duration>,
    pub recurrence: Option<Recurrence>,
    pub is_all_day: bool,
    pub location: Option<String>,
    pub organizer: Option<Organizer>,
    pub attendees: Vec<String>,
    pub description: Option<String>,
}

impl EventDefinition {
    /// Nominal start instant.
    pub fn start(&self) -> DateTime<Utc> {
        self.start_time.to_utc()
    }

    /// Nominal end instant, if DTEND was present.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end_time.as_ref().map(EventTime::to_utc)
    }
}

/// One concrete dated instance of an event, keyed by a stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    pub base_id: String,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub organizer_name: Option<String>,
    pub organizer_email: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub body_preview: Option<String>,
    pub is_all_day: bool,
    pub category: Category,
    pub last_updated: DateTime<Utc>,
}

impl Occurrence {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open interval intersection: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Occurrence) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.subject)
    }
}
