//! Where raw iCalendar text comes from.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::timeout;

use crate::constants::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::error::{SyncError, SyncResult};

/// Returns the raw text behind a feed location, or a feed-level error.
pub trait FeedSource: Send + Sync {
    fn fetch(&self, location: &str) -> impl Future<Output = SyncResult<String>> + Send;
}

/// A parsed feed location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    Remote(String),
    Local(PathBuf),
}

impl FeedLocation {
    /// `webcal://` becomes `https://`; `file://` URLs and bare paths are read
    /// from disk, with `~` expanded.
    pub fn parse(location: &str) -> FeedLocation {
        let location = location.trim();

        for scheme in ["webcal://", "webcals://"] {
            if let Some(rest) = location.strip_prefix(scheme) {
                return FeedLocation::Remote(format!("https://{}", rest));
            }
        }

        if location.starts_with("http://") || location.starts_with("https://") {
            return FeedLocation::Remote(location.to_string());
        }

        let path = location.strip_prefix("file://").unwrap_or(location);
        FeedLocation::Local(PathBuf::from(shellexpand::tilde(path).as_ref()))
    }
}

/// Split a comma-separated list of locations, dropping empty entries.
pub fn split_locations(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Fetches remote feeds over HTTP(S) and local ones from disk, both bounded
/// by the same wall-clock budget.
#[derive(Clone)]
pub struct HttpFeedSource {
    http: reqwest::Client,
    fetch_timeout: Duration,
}

impl Default for HttpFeedSource {
    fn default() -> Self {
        HttpFeedSource::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }
}

impl HttpFeedSource {
    pub fn new(fetch_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("lifesync/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        HttpFeedSource { http, fetch_timeout }
    }

    async fn fetch_remote(&self, url: &str) -> SyncResult<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| SyncError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_location(&self, location: &str) -> SyncResult<String> {
        match FeedLocation::parse(location) {
            FeedLocation::Remote(url) => self.fetch_remote(&url).await,
            FeedLocation::Local(path) => {
                tracing::debug!(path = %path.display(), "Reading local feed");
                Ok(tokio::fs::read_to_string(&path).await?)
            }
        }
    }
}

impl FeedSource for HttpFeedSource {
    async fn fetch(&self, location: &str) -> SyncResult<String> {
        timeout(self.fetch_timeout, self.fetch_location(location))
            .await
            .map_err(|_| SyncError::Timeout(self.fetch_timeout))?
    }
}
