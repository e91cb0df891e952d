//! Shared constants.

/// Hard cap on recurrence candidates consumed per event definition.
pub const MAX_RECURRENCE_ITERATIONS: usize = 500;

/// Default sync window, in days before and after today.
pub const DEFAULT_DAYS_BACK: i64 = 0;
pub const DEFAULT_DAYS_FORWARD: i64 = 30;

/// Default wall-clock budget for fetching one feed.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Occurrence length used when a definition has neither DURATION nor DTEND.
pub const DEFAULT_EVENT_MINUTES: i64 = 60;

/// Subject shown for personal events while details are hidden.
pub const PRIVATE_PLACEHOLDER: &str = "Personal Event";

/// Availability words Outlook publishes instead of a real title.
pub const STATUS_WORDS: [&str; 5] = ["Free", "Busy", "Tentative", "Out of Office", "Working Elsewhere"];

/// Bracketed availability placeholders dropped from work feeds when they span a day or more.
pub const WORK_PLACEHOLDER_PHRASES: [&str; 5] = [
    "[Free]",
    "[Busy]",
    "[Tentative]",
    "[Out of Office]",
    "[Working Elsewhere]",
];

/// Body previews longer than this are truncated.
pub const BODY_PREVIEW_CHARS: usize = 500;
