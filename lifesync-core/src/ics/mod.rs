//! ICS feed parsing.
//!
//! Turns the raw text of one feed into event definitions according to RFC 5545.

mod parse;

pub use parse::{FeedDocument, body_preview};
