//! Persistent store boundary and a local JSON-file implementation.
//!
//! The core never assumes atomicity across calls; each call succeeds or
//! fails on its own.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::date_range::SyncWindow;
use crate::dedupe::OccurrenceBatch;
use crate::error::{SyncError, SyncResult};
use crate::event::{Category, Occurrence};
use crate::ignore::{IgnoreList, OccurrenceIgnore, SeriesIgnore};

/// Last successful sync instant for one feed category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    pub category: Category,
    pub last_synced: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub ignored_series: usize,
    pub ignored_occurrences: usize,
    pub sync_metadata: Vec<SyncMetadata>,
}

pub trait Store: Send + Sync {
    /// Insert or replace every occurrence in the batch, keyed by id.
    /// Returns the number written.
    fn upsert_occurrences(&self, batch: OccurrenceBatch) -> impl Future<Output = SyncResult<usize>> + Send;

    /// Occurrences starting inside `window`, ordered by start.
    fn list_occurrences(&self, window: &SyncWindow) -> impl Future<Output = SyncResult<Vec<Occurrence>>> + Send;

    fn get_occurrence(&self, id: &str) -> impl Future<Output = SyncResult<Option<Occurrence>>> + Send;

    /// Any stored occurrence of the series, earliest first.
    fn find_series(&self, base_id: &str) -> impl Future<Output = SyncResult<Option<Occurrence>>> + Send;

    fn list_ignored_base_ids(&self) -> impl Future<Output = SyncResult<Vec<String>>> + Send;

    fn list_ignored_occurrence_ids(&self) -> impl Future<Output = SyncResult<Vec<String>>> + Send;

    fn list_ignored_series(&self) -> impl Future<Output = SyncResult<Vec<SeriesIgnore>>> + Send;

    fn list_ignored_occurrences(&self) -> impl Future<Output = SyncResult<Vec<OccurrenceIgnore>>> + Send;

    fn add_ignored_base_id(&self, entry: SeriesIgnore) -> impl Future<Output = SyncResult<()>> + Send;

    /// Returns whether an entry was removed.
    fn remove_ignored_base_id(&self, base_id: &str) -> impl Future<Output = SyncResult<bool>> + Send;

    fn add_ignored_occurrence_id(&self, entry: OccurrenceIgnore) -> impl Future<Output = SyncResult<()>> + Send;

    /// Returns whether an entry was removed.
    fn remove_ignored_occurrence_id(&self, occurrence_id: &str) -> impl Future<Output = SyncResult<bool>> + Send;

    fn set_sync_metadata(&self, category: Category, at: DateTime<Utc>) -> impl Future<Output = SyncResult<()>> + Send;

    fn sync_metadata(&self) -> impl Future<Output = SyncResult<Vec<SyncMetadata>>> + Send;

    fn stats(&self) -> impl Future<Output = SyncResult<StoreStats>> + Send;

    /// Both ignore levels in one read.
    fn ignore_list(&self) -> impl Future<Output = SyncResult<IgnoreList>> + Send {
        async {
            let base_ids = self.list_ignored_base_ids().await?;
            let occurrence_ids = self.list_ignored_occurrence_ids().await?;
            Ok(IgnoreList::new(base_ids, occurrence_ids))
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    occurrences: HashMap<String, Occurrence>,
    #[serde(default)]
    ignored_series: BTreeMap<String, SeriesIgnore>,
    #[serde(default)]
    ignored_occurrences: BTreeMap<String, OccurrenceIgnore>,
    #[serde(default)]
    sync_metadata: Vec<SyncMetadata>,
}

/// Store kept in memory and, when opened on a path, written back to a
/// pretty-printed JSON file after every mutation.
pub struct LocalStore {
    path: Option<PathBuf>,
    snapshot: Mutex<Snapshot>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        LocalStore {
            path: None,
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();

        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                SyncError::Store(format!("Failed to read {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), "Opened local store");

        Ok(LocalStore {
            path: Some(path),
            snapshot: Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply `change` to a copy of the snapshot and keep it only once it is
    /// on disk. `change` returns whether anything changed; nothing is
    /// written otherwise.
    async fn commit(&self, change: impl FnOnce(&mut Snapshot) -> bool) -> SyncResult<bool> {
        let mut current = self.snapshot.lock().await;

        let mut next = current.clone();
        if !change(&mut next) {
            return Ok(false);
        }

        self.persist(&next).await?;
        *current = next;
        Ok(true)
    }

    async fn persist(&self, snapshot: &Snapshot) -> SyncResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, content).await?;
        tokio::fs::rename(&temp, path).await?;
        Ok(())
    }
}

impl Store for LocalStore {
    async fn upsert_occurrences(&self, batch: OccurrenceBatch) -> SyncResult<usize> {
        let written = batch.len();

        self.commit(|snapshot| {
            for occurrence in batch.into_occurrences() {
                snapshot.occurrences.insert(occurrence.id.clone(), occurrence);
            }
            true
        })
        .await?;

        Ok(written)
    }

    async fn list_occurrences(&self, window: &SyncWindow) -> SyncResult<Vec<Occurrence>> {
        let snapshot = self.snapshot.lock().await;

        let mut occurrences: Vec<Occurrence> = snapshot
            .occurrences
            .values()
            .filter(|o| window.contains(o.start))
            .cloned()
            .collect();
        occurrences.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        Ok(occurrences)
    }

    async fn get_occurrence(&self, id: &str) -> SyncResult<Option<Occurrence>> {
        Ok(self.snapshot.lock().await.occurrences.get(id).cloned())
    }

    async fn find_series(&self, base_id: &str) -> SyncResult<Option<Occurrence>> {
        let snapshot = self.snapshot.lock().await;
        Ok(snapshot
            .occurrences
            .values()
            .filter(|o| o.base_id == base_id)
            .min_by_key(|o| o.start)
            .cloned())
    }

    async fn list_ignored_base_ids(&self) -> SyncResult<Vec<String>> {
        Ok(self.snapshot.lock().await.ignored_series.keys().cloned().collect())
    }

    async fn list_ignored_occurrence_ids(&self) -> SyncResult<Vec<String>> {
        Ok(self.snapshot.lock().await.ignored_occurrences.keys().cloned().collect())
    }

    async fn list_ignored_series(&self) -> SyncResult<Vec<SeriesIgnore>> {
        Ok(self.snapshot.lock().await.ignored_series.values().cloned().collect())
    }

    async fn list_ignored_occurrences(&self) -> SyncResult<Vec<OccurrenceIgnore>> {
        Ok(self.snapshot.lock().await.ignored_occurrences.values().cloned().collect())
    }

    async fn add_ignored_base_id(&self, entry: SeriesIgnore) -> SyncResult<()> {
        self.commit(|snapshot| {
            snapshot.ignored_series.insert(entry.base_id.clone(), entry);
            true
        })
        .await?;
        Ok(())
    }

    async fn remove_ignored_base_id(&self, base_id: &str) -> SyncResult<bool> {
        self.commit(|snapshot| snapshot.ignored_series.remove(base_id).is_some())
            .await
    }

    async fn add_ignored_occurrence_id(&self, entry: OccurrenceIgnore) -> SyncResult<()> {
        self.commit(|snapshot| {
            snapshot
                .ignored_occurrences
                .insert(entry.occurrence_id.clone(), entry);
            true
        })
        .await?;
        Ok(())
    }

    async fn remove_ignored_occurrence_id(&self, occurrence_id: &str) -> SyncResult<bool> {
        self.commit(|snapshot| snapshot.ignored_occurrences.remove(occurrence_id).is_some())
            .await
    }

    async fn set_sync_metadata(&self, category: Category, at: DateTime<Utc>) -> SyncResult<()> {
        self.commit(|snapshot| {
            match snapshot.sync_metadata.iter_mut().find(|m| m.category == category) {
                Some(existing) => existing.last_synced = at,
                None => snapshot.sync_metadata.push(SyncMetadata {
                    category,
                    last_synced: at,
                }),
            }
            true
        })
        .await?;
        Ok(())
    }

    async fn sync_metadata(&self) -> SyncResult<Vec<SyncMetadata>> {
        Ok(self.snapshot.lock().await.sync_metadata.clone())
    }

    async fn stats(&self) -> SyncResult<StoreStats> {
        let snapshot = self.snapshot.lock().await;

        let mut by_category = BTreeMap::new();
        for occurrence in snapshot.occurrences.values() {
            *by_category.entry(occurrence.category).or_insert(0) += 1;
        }

        Ok(StoreStats {
            total: snapshot.occurrences.len(),
            by_category,
            ignored_series: snapshot.ignored_series.len(),
            ignored_occurrences: snapshot.ignored_occurrences.len(),
            sync_metadata: snapshot.sync_metadata.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn occurrence(id: &str, category: Category, day: u32) -> Occurrence {
        let start = Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap();
        Occurrence {
            id: id.to_string(),
            base_id: crate::identity::base_id(id).to_string(),
            subject: format!("{} subject", id),
            start,
            end: start + Duration::hours(1),
            location: None,
            organizer_name: None,
            organizer_email: None,
            attendees: vec![],
            body_preview: None,
            is_all_day: false,
            category,
            last_updated: start,
        }
    }

    fn march(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = LocalStore::in_memory();

        store
            .upsert_occurrences(vec![occurrence("a", Category::Work, 10)].into_iter().collect())
            .await
            .unwrap();

        let mut updated = occurrence("a", Category::Work, 10);
        updated.subject = "renamed".to_string();
        store
            .upsert_occurrences(vec![updated].into_iter().collect())
            .await
            .unwrap();

        let stored = store.get_occurrence("a").await.unwrap().unwrap();
        assert_eq!(stored.subject, "renamed");
        assert_eq!(store.stats().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn list_is_windowed_and_ordered() {
        let store = LocalStore::in_memory();
        let batch: OccurrenceBatch = vec![
            occurrence("late", Category::Work, 20),
            occurrence("early", Category::Personal, 11),
            occurrence("outside", Category::Work, 25),
        ]
        .into_iter()
        .collect();
        store.upsert_occurrences(batch).await.unwrap();

        let window = SyncWindow::new(march(10), march(21));
        let ids: Vec<_> = store
            .list_occurrences(&window)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();

        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn ignore_entries_round_trip_through_the_list() {
        let store = LocalStore::in_memory();
        let now = march(10);

        store
            .add_ignored_base_id(SeriesIgnore {
                base_id: "standup".to_string(),
                subject: "Standup".to_string(),
                reason: None,
                ignored_at: now,
            })
            .await
            .unwrap();
        store
            .add_ignored_occurrence_id(OccurrenceIgnore {
                occurrence_id: "review_20250312T090000".to_string(),
                subject: "Review".to_string(),
                original_start: None,
                reason: Some("holiday".to_string()),
                ignored_at: now,
            })
            .await
            .unwrap();

        let list = store.ignore_list().await.unwrap();
        assert!(list.base_ids.contains("standup"));
        assert!(list.occurrence_ids.contains("review_20250312T090000"));

        assert!(store.remove_ignored_base_id("standup").await.unwrap());
        assert!(!store.remove_ignored_base_id("standup").await.unwrap());
        assert!(store.list_ignored_base_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sync_metadata_is_kept_per_category() {
        let store = LocalStore::in_memory();

        store.set_sync_metadata(Category::Work, march(10)).await.unwrap();
        store.set_sync_metadata(Category::Work, march(11)).await.unwrap();
        store.set_sync_metadata(Category::Personal, march(11)).await.unwrap();

        let metadata = store.sync_metadata().await.unwrap();
        assert_eq!(metadata.len(), 2);
        assert!(metadata
            .iter()
            .any(|m| m.category == Category::Work && m.last_synced == march(11)));
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = LocalStore::open(&path).await.unwrap();
            let batch: OccurrenceBatch = vec![
                occurrence("weekly_20250310T090000", Category::Work, 10),
                occurrence("dentist", Category::Personal, 12),
            ]
            .into_iter()
            .collect();
            store.upsert_occurrences(batch).await.unwrap();
            store.set_sync_metadata(Category::Work, march(10)).await.unwrap();
        }

        assert!(path.exists());
        assert!(!path.with_file_name("store.json.tmp").exists());

        let reopened = LocalStore::open(&path).await.unwrap();
        let stats = reopened.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category.get(&Category::Personal), Some(&1));
        assert_eq!(stats.sync_metadata.len(), 1);

        let series = reopened.find_series("weekly").await.unwrap().unwrap();
        assert_eq!(series.id, "weekly_20250310T090000");
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_and_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = LocalStore::open(&path).await.unwrap();

        // A directory where the temp file goes makes the write fail.
        let temp = path.with_file_name("store.json.tmp");
        std::fs::create_dir(&temp).unwrap();

        let failed: OccurrenceBatch = vec![occurrence("lost", Category::Work, 10)].into_iter().collect();
        assert!(store.upsert_occurrences(failed).await.is_err());
        assert!(store.get_occurrence("lost").await.unwrap().is_none());

        std::fs::remove_dir(&temp).unwrap();
        let kept: OccurrenceBatch = vec![occurrence("kept", Category::Work, 11)].into_iter().collect();
        store.upsert_occurrences(kept).await.unwrap();

        let reopened = LocalStore::open(&path).await.unwrap();
        assert!(reopened.get_occurrence("lost").await.unwrap().is_none());
        assert!(reopened.get_occurrence("kept").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(LocalStore::open(&path).await, Err(SyncError::Store(_))));
    }
}
