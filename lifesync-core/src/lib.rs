//! Core of lifesync: calendar feed sync and work/personal conflict analysis.
//!
//! The write path turns feed text into stored occurrences:
//! - `ics` parses a feed into event definitions
//! - `recurrence` expands each definition inside a `SyncWindow`
//! - `identity` gives every occurrence a stable id
//! - `dedupe` collapses a feed's occurrences by id
//! - `sync` drives all of the above per feed and writes to a `Store`
//!
//! The read path (`view`) filters ignored events, finds conflicts, masks
//! personal details and lays out each day.

pub mod config;
pub mod constants;
pub mod date_range;
pub mod dedupe;
pub mod error;
pub mod event;
pub mod feed;
pub mod ics;
pub mod identity;
pub mod ignore;
pub mod layout;
pub mod overlap;
pub mod privacy;
pub mod recurrence;
pub mod store;
pub mod sync;
pub mod view;

pub use config::Settings;
pub use date_range::SyncWindow;
pub use error::{SyncError, SyncResult};
pub use event::{Category, EventDefinition, EventTime, Occurrence, Organizer, Recurrence};
pub use feed::{FeedSource, HttpFeedSource};
pub use ignore::{IgnoreList, OccurrenceIgnore, SeriesIgnore};
pub use store::{LocalStore, Store, StoreStats, SyncMetadata};
pub use sync::{FeedReport, FeedConfig, SyncReport, SyncStatus, Syncer};
pub use view::CalendarView;
