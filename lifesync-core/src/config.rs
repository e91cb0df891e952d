//! Settings for lifesync.
//!
//! Sources, lowest precedence first: built-in defaults,
//! `~/.config/lifesync/config.toml`, an explicit `--config` file, then
//! `LIFESYNC_*` environment variables. Values from `.env.local` are loaded
//! into the environment first, and the older `OUTLOOK_ICS_URL`,
//! `APPLE_CALENDAR_ICS_URL`, `APPLE_CALENDAR_ICS_PATH` and `DB_PATH`
//! variables fill in whatever is still unset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DAYS_BACK, DEFAULT_DAYS_FORWARD, DEFAULT_FETCH_TIMEOUT_SECS};
use crate::date_range::SyncWindow;
use crate::error::{SyncError, SyncResult};
use crate::event::Category;
use crate::feed::split_locations;
use crate::sync::FeedConfig;

const ENV_FILE: &str = ".env.local";
const DEFAULT_LOG_LEVEL: &str = "info";

fn default_days_back() -> u32 {
    DEFAULT_DAYS_BACK as u32
}

fn default_days_forward() -> u32 {
    DEFAULT_DAYS_FORWARD as u32
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Work calendar feed (URL or path).
    #[serde(default)]
    pub work_feed: Option<String>,

    /// Personal calendar feeds (URLs or paths). Entries may themselves be
    /// comma-separated lists.
    #[serde(default)]
    pub personal_feeds: Vec<String>,

    #[serde(default = "default_days_back")]
    pub days_back: u32,

    #[serde(default = "default_days_forward")]
    pub days_forward: u32,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// IANA zone used for display. Defaults to the system zone.
    #[serde(default)]
    pub display_timezone: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            work_feed: None,
            personal_feeds: Vec::new(),
            days_back: default_days_back(),
            days_forward: default_days_forward(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            store_path: None,
            display_timezone: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn config_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("lifesync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load settings from every source.
    pub fn load(explicit: Option<&Path>) -> SyncResult<Self> {
        if let Ok(path) = dotenvy::from_filename(ENV_FILE) {
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }

        let mut files = Vec::new();
        if let Ok(path) = Self::config_path() {
            files.push((path, false));
        }
        if let Some(path) = explicit {
            files.push((path.to_path_buf(), true));
        }

        let mut settings = Self::from_sources(files, true)?;
        settings.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn from_sources(files: Vec<(PathBuf, bool)>, with_env: bool) -> SyncResult<Self> {
        let mut builder = Config::builder();

        for (path, required) in files {
            builder = builder.add_source(File::from(path).required(required));
        }

        if with_env {
            builder = builder.add_source(
                Environment::with_prefix("LIFESYNC")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("personal_feeds")
                    .ignore_empty(true),
            );
        }

        builder
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Fill unset fields from the older variable names.
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.work_feed.is_none() {
            self.work_feed = lookup("OUTLOOK_ICS_URL").filter(|v| !v.trim().is_empty());
        }

        if self.personal_feeds.is_empty() {
            for key in ["APPLE_CALENDAR_ICS_URL", "APPLE_CALENDAR_ICS_PATH"] {
                if let Some(value) = lookup(key) {
                    self.personal_feeds.extend(split_locations(&value));
                }
            }
        }

        if self.store_path.is_none() {
            self.store_path = lookup("DB_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from);
        }
    }

    /// Every configured feed, work first.
    pub fn feeds(&self) -> Vec<FeedConfig> {
        let mut feeds = Vec::new();

        if let Some(location) = self.work_feed.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            feeds.push(FeedConfig::new("work", location, Category::Work));
        }

        let personal: Vec<String> = self
            .personal_feeds
            .iter()
            .flat_map(|entry| split_locations(entry))
            .collect();
        let numbered = personal.len() > 1;

        for (i, location) in personal.into_iter().enumerate() {
            let label = if numbered {
                format!("personal {}", i + 1)
            } else {
                "personal".to_string()
            };
            feeds.push(FeedConfig::new(label, location, Category::Personal));
        }

        feeds
    }

    pub fn window(&self, now: DateTime<Utc>) -> SyncWindow {
        SyncWindow::from_days(now, self.days_back as i64, self.days_forward as i64)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Store file, `~` expanded. Defaults to `<data dir>/lifesync/store.json`.
    pub fn store_path(&self) -> SyncResult<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(PathBuf::from(
                shellexpand::tilde(&path.to_string_lossy()).into_owned(),
            )),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| SyncError::Config("Could not determine data directory".into()))?
                .join("lifesync")
                .join("store.json")),
        }
    }

    /// Configured display zone, if any.
    pub fn display_tz(&self) -> SyncResult<Option<Tz>> {
        self.display_timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|_| SyncError::Config(format!("Unknown timezone '{}'", name)))
            })
            .transpose()
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> SyncResult<()> {
        let contents = format!(
            "\
# lifesync configuration

# Work calendar (published ICS link, webcal:// is fine):
# work_feed = \"https://outlook.office365.com/owa/calendar/.../calendar.ics\"

# Personal calendars, links or local .ics files:
# personal_feeds = [\"webcal://p01-caldav.icloud.com/published/2/...\", \"~/Calendars/home.ics\"]

# Sync window around today, in days:
# days_back = {}
# days_forward = {}

# Seconds to wait for each feed:
# fetch_timeout_secs = {}

# Where synced events are kept:
# store_path = \"~/.local/share/lifesync/store.json\"

# Zone used when showing events (defaults to the system zone):
# display_timezone = \"America/Los_Angeles\"

# log_level = \"{}\"
",
            DEFAULT_DAYS_BACK, DEFAULT_DAYS_FORWARD, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LOG_LEVEL
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| SyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
