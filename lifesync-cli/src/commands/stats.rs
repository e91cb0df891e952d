use anyhow::Result;
use chrono::{Duration, Utc};
use lifesync_core::{Category, Settings, Store};
use owo_colors::OwoColorize;

use crate::render::{Render, render_instant};

pub async fn run(settings: Settings) -> Result<()> {
    let tz = super::display_tz(&settings, None)?;
    let store = super::open_store(&settings).await?;
    let stats = store.stats().await?;

    println!("{}", "Stored occurrences".bold());
    println!("  Total:     {}", stats.total);
    for category in [Category::Work, Category::Personal] {
        let count = stats.by_category.get(&category).copied().unwrap_or(0);
        println!("  {:<10} {}", format!("{}:", capitalize(category.as_str())), count);
    }

    println!();
    println!("{}", "Ignored".bold());
    println!("  Series:      {}", stats.ignored_series);
    println!("  Occurrences: {}", stats.ignored_occurrences);

    println!();
    println!("{}", "Last sync".bold());
    if stats.sync_metadata.is_empty() {
        println!("  {}", "Never synced. Run `lifesync sync`.".dimmed());
    }
    let now = Utc::now();
    for metadata in &stats.sync_metadata {
        println!(
            "  {} {} {}",
            metadata.category.render(),
            render_instant(metadata.last_synced, tz),
            format!("({})", render_age(now - metadata.last_synced)).dimmed()
        );
    }

    if let Some(path) = store.path() {
        println!();
        println!("{}", format!("Store: {}", path.display()).dimmed());
    }

    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Age rounded down to whole minutes, e.g. "2h 5m ago".
fn render_age(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }

    let rounded = std::time::Duration::from_secs(minutes as u64 * 60);
    format!("{} ago", humantime::format_duration(rounded))
}
