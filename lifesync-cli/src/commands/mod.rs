pub mod config;
pub mod events;
pub mod ignore;
pub mod stats;
pub mod sync;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use lifesync_core::{LocalStore, Settings};

pub async fn open_store(settings: &Settings) -> Result<LocalStore> {
    let path = settings.store_path()?;
    LocalStore::open(&path)
        .await
        .with_context(|| format!("Failed to open store at {}", path.display()))
}

/// Display zone: explicit flag, then config, then the system zone, then UTC.
pub fn display_tz(settings: &Settings, flag: Option<&str>) -> Result<Tz> {
    if let Some(name) = flag {
        return name
            .parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown timezone '{}'", name));
    }

    if let Some(tz) = settings.display_tz()? {
        return Ok(tz);
    }

    Ok(iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC))
}
