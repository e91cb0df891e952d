use anyhow::Result;
use chrono::Utc;
use lifesync_core::identity::base_id;
use lifesync_core::{OccurrenceIgnore, SeriesIgnore, Settings, Store};
use owo_colors::OwoColorize;

use crate::render::render_instant;

pub async fn ignore_series(settings: Settings, series_id: String, reason: Option<String>) -> Result<()> {
    let store = super::open_store(&settings).await?;

    // Accept a full occurrence id and ignore its series.
    let series_id = base_id(&series_id).to_string();
    let subject = match store.find_series(&series_id).await? {
        Some(occurrence) => occurrence.subject,
        None => {
            println!(
                "{}",
                format!("No stored events for '{}' yet; ignoring it anyway", series_id).yellow()
            );
            String::new()
        }
    };

    store
        .add_ignored_base_id(SeriesIgnore {
            base_id: series_id.clone(),
            subject: subject.clone(),
            reason,
            ignored_at: Utc::now(),
        })
        .await?;

    println!("{} Ignoring series {} {}", "✓".green(), series_id.bold(), subject.dimmed());
    Ok(())
}

pub async fn ignore_occurrence(settings: Settings, id: String, reason: Option<String>) -> Result<()> {
    let store = super::open_store(&settings).await?;

    let stored = store.get_occurrence(&id).await?;
    if stored.is_none() {
        println!(
            "{}",
            format!("No stored event with id '{}' yet; ignoring it anyway", id).yellow()
        );
    }

    let subject = stored.as_ref().map(|o| o.subject.clone()).unwrap_or_default();
    store
        .add_ignored_occurrence_id(OccurrenceIgnore {
            occurrence_id: id.clone(),
            subject: subject.clone(),
            original_start: stored.map(|o| o.start),
            reason,
            ignored_at: Utc::now(),
        })
        .await?;

    println!("{} Ignoring occurrence {} {}", "✓".green(), id.bold(), subject.dimmed());
    Ok(())
}

pub async fn unignore_series(settings: Settings, series_id: &str) -> Result<()> {
    let store = super::open_store(&settings).await?;

    if !store.remove_ignored_base_id(series_id).await? {
        anyhow::bail!("Series '{}' is not ignored", series_id);
    }

    println!("{} Showing series {} again", "✓".green(), series_id.bold());
    Ok(())
}

pub async fn unignore_occurrence(settings: Settings, id: &str) -> Result<()> {
    let store = super::open_store(&settings).await?;

    if !store.remove_ignored_occurrence_id(id).await? {
        anyhow::bail!("Occurrence '{}' is not ignored", id);
    }

    println!("{} Showing occurrence {} again", "✓".green(), id.bold());
    Ok(())
}

pub async fn list(settings: Settings) -> Result<()> {
    let tz = super::display_tz(&settings, None)?;
    let store = super::open_store(&settings).await?;

    let series = store.list_ignored_series().await?;
    let occurrences = store.list_ignored_occurrences().await?;

    if series.is_empty() && occurrences.is_empty() {
        println!("{}", "Nothing is ignored".dimmed());
        return Ok(());
    }

    if !series.is_empty() {
        println!("{}", "Series".bold());
        for entry in &series {
            println!(
                "  {} {}{}",
                entry.base_id,
                entry.subject.dimmed(),
                render_reason(entry.reason.as_deref())
            );
        }
    }

    if !occurrences.is_empty() {
        if !series.is_empty() {
            println!();
        }
        println!("{}", "Occurrences".bold());
        for entry in &occurrences {
            let when = entry
                .original_start
                .map(|start| format!(" ({})", render_instant(start, tz)))
                .unwrap_or_default();
            println!(
                "  {} {}{}{}",
                entry.occurrence_id,
                entry.subject.dimmed(),
                when.dimmed(),
                render_reason(entry.reason.as_deref())
            );
        }
    }

    Ok(())
}

fn render_reason(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!(" {}", format!("- {}", reason).italic()),
        None => String::new(),
    }
}
