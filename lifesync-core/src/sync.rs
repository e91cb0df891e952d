//! One sync pass over every configured feed.
//!
//! Feeds are fetched, parsed, expanded and deduplicated concurrently, one
//! task per feed. Batches are then written to the store one feed at a time,
//! and the per-category sync metadata is stamped last.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;

use crate::date_range::SyncWindow;
use crate::dedupe::OccurrenceBatch;
use crate::error::{SyncError, SyncResult};
use crate::event::Category;
use crate::feed::FeedSource;
use crate::ics::FeedDocument;
use crate::identity;
use crate::recurrence;
use crate::store::Store;

/// One configured feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub label: String,
    pub location: String,
    pub category: Category,
}

impl FeedConfig {
    pub fn new(label: impl Into<String>, location: impl Into<String>, category: Category) -> Self {
        FeedConfig {
            label: label.into(),
            location: location.into(),
            category,
        }
    }
}

/// Outcome of one feed in a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedReport {
    pub label: String,
    pub category: Category,
    /// Occurrences written to the store.
    pub occurrences: usize,
    /// VEVENTs that could not be read and were skipped.
    pub skipped: usize,
    /// Ids produced more than once within the feed.
    pub collisions: usize,
    pub error: Option<String>,
}

impl FeedReport {
    fn new(feed: &FeedConfig) -> Self {
        FeedReport {
            label: feed.label.clone(),
            category: feed.category,
            occurrences: 0,
            skipped: 0,
            collisions: 0,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Every feed synced and every write landed.
    Succeeded,
    /// At least one feed or write failed, but not all feeds.
    Partial,
    /// Every feed failed.
    Failed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncStatus::Succeeded => write!(f, "succeeded"),
            SyncStatus::Partial => write!(f, "partially succeeded"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub window: SyncWindow,
    pub synced_at: DateTime<Utc>,
    /// One entry per configured feed, in configuration order.
    pub feeds: Vec<FeedReport>,
    /// Failures writing sync metadata, which belong to no single feed.
    pub metadata_errors: Vec<String>,
}

impl SyncReport {
    pub fn status(&self) -> SyncStatus {
        if self.feeds.iter().all(|f| !f.is_ok()) {
            SyncStatus::Failed
        } else if self.feeds.iter().any(|f| !f.is_ok()) || !self.metadata_errors.is_empty() {
            SyncStatus::Partial
        } else {
            SyncStatus::Succeeded
        }
    }

    pub fn total_occurrences(&self) -> usize {
        self.feeds.iter().map(|f| f.occurrences).sum()
    }
}

/// What a feed task hands back before anything is written.
struct FeedOutcome {
    report: FeedReport,
    batch: Option<OccurrenceBatch>,
}

pub struct Syncer<F> {
    source: Arc<F>,
    feeds: Vec<FeedConfig>,
}

impl<F: FeedSource + 'static> Syncer<F> {
    pub fn new(source: F, feeds: Vec<FeedConfig>) -> Self {
        Syncer {
            source: Arc::new(source),
            feeds,
        }
    }

    pub fn feeds(&self) -> &[FeedConfig] {
        &self.feeds
    }

    /// Run one pass and write the results to `store`.
    ///
    /// Only a missing feed list is an error. Feed and store failures are
    /// itemized in the report instead.
    pub async fn run<S: Store>(&self, store: &S, window: SyncWindow) -> SyncResult<SyncReport> {
        if self.feeds.is_empty() {
            return Err(SyncError::Config(
                "No feeds configured. Set a work feed or at least one personal feed.".into(),
            ));
        }

        let synced_at = Utc::now();
        tracing::info!(
            feeds = self.feeds.len(),
            start = %window.start,
            end = %window.end,
            "Starting sync pass"
        );

        let mut outcomes = self.fetch_all(window, synced_at).await;

        for outcome in &mut outcomes {
            let Some(batch) = outcome.batch.take() else {
                continue;
            };

            match store.upsert_occurrences(batch).await {
                Ok(written) => {
                    outcome.report.occurrences = written;
                    tracing::info!(
                        feed = %outcome.report.label,
                        occurrences = written,
                        skipped = outcome.report.skipped,
                        "Feed synced"
                    );
                }
                Err(e) => {
                    tracing::error!(feed = %outcome.report.label, error = %e, "Failed to store feed");
                    outcome.report.error = Some(e.to_string());
                }
            }
        }

        let categories: BTreeSet<Category> = self.feeds.iter().map(|f| f.category).collect();
        let mut metadata_errors = Vec::new();
        for category in categories {
            if let Err(e) = store.set_sync_metadata(category, synced_at).await {
                tracing::warn!(%category, error = %e, "Failed to record sync time");
                metadata_errors.push(format!("{}: {}", category, e));
            }
        }

        let report = SyncReport {
            window,
            synced_at,
            feeds: outcomes.into_iter().map(|o| o.report).collect(),
            metadata_errors,
        };

        tracing::info!(
            status = %report.status(),
            occurrences = report.total_occurrences(),
            "Sync pass finished"
        );

        Ok(report)
    }

    /// Fan out one task per feed; results come back in configuration order.
    async fn fetch_all(&self, window: SyncWindow, synced_at: DateTime<Utc>) -> Vec<FeedOutcome> {
        let mut join_set: JoinSet<(usize, FeedOutcome)> = JoinSet::new();

        for (index, feed) in self.feeds.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let feed = feed.clone();
            join_set.spawn(async move {
                let outcome = sync_feed(source.as_ref(), &feed, window, synced_at).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<FeedOutcome>> = self.feeds.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::error!(error = %e, "Feed task did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(&self.feeds)
            .map(|(slot, feed)| {
                slot.unwrap_or_else(|| {
                    let mut report = FeedReport::new(feed);
                    report.error = Some("Feed task did not complete".into());
                    FeedOutcome { report, batch: None }
                })
            })
            .collect()
    }
}

/// Fetch, parse, expand and deduplicate one feed. Nothing is written here.
async fn sync_feed<F: FeedSource>(
    source: &F,
    feed: &FeedConfig,
    window: SyncWindow,
    synced_at: DateTime<Utc>,
) -> FeedOutcome {
    let mut report = FeedReport::new(feed);

    let raw = match source.fetch(&feed.location).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(feed = %feed.label, error = %e, "Failed to fetch feed");
            report.error = Some(e.to_string());
            return FeedOutcome { report, batch: None };
        }
    };

    match build_batch(&raw, feed.category, &window, synced_at) {
        Ok((batch, skipped)) => {
            report.skipped = skipped;
            report.collisions = batch.collisions();
            FeedOutcome {
                report,
                batch: Some(batch),
            }
        }
        Err(e) => {
            tracing::error!(feed = %feed.label, error = %e, "Failed to parse feed");
            report.error = Some(e.to_string());
            FeedOutcome { report, batch: None }
        }
    }
}

/// Turn raw feed text into a deduplicated batch. Returns the batch and the
/// number of skipped components; fails only if the document is unreadable.
pub fn build_batch(
    raw: &str,
    category: Category,
    window: &SyncWindow,
    synced_at: DateTime<Utc>,
) -> SyncResult<(OccurrenceBatch, usize)> {
    let document = FeedDocument::new(raw, category);
    let mut batch = OccurrenceBatch::new();
    let mut skipped = 0;

    for definition in document.definitions()? {
        let definition = match definition {
            Ok(definition) => definition,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping event");
                skipped += 1;
                continue;
            }
        };

        batch.extend(
            recurrence::expand(&definition, window)
                .iter()
                .map(|span| identity::assign(&definition, span, synced_at)),
        );
    }

    Ok((batch, skipped))
}
