use anyhow::Result;
use chrono::Utc;
use lifesync_core::{HttpFeedSource, Settings, SyncStatus, SyncWindow, Syncer};
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(settings: Settings, days_back: Option<u32>, days_forward: Option<u32>) -> Result<()> {
    let feeds = settings.feeds();
    if feeds.is_empty() {
        anyhow::bail!(
            "No feeds configured.\n\n\
            Add them to your config file (see `lifesync config init`), or set:\n  \
            LIFESYNC_WORK_FEED=https://...\n  \
            LIFESYNC_PERSONAL_FEEDS=webcal://...,~/home.ics"
        );
    }

    let window = SyncWindow::from_days(
        Utc::now(),
        days_back.unwrap_or(settings.days_back) as i64,
        days_forward.unwrap_or(settings.days_forward) as i64,
    );

    let store = super::open_store(&settings).await?;
    let syncer = Syncer::new(HttpFeedSource::new(settings.fetch_timeout()), feeds);

    let spinner = tui::create_spinner(format!(
        "Syncing {} {}",
        syncer.feeds().len(),
        if syncer.feeds().len() == 1 { "feed" } else { "feeds" }
    ));
    let result = syncer.run(&store, window).await;
    spinner.finish_and_clear();

    let report = result?;

    println!(
        "{}",
        format!(
            "Window {} to {}",
            window.start.format("%Y-%m-%d"),
            window.end.format("%Y-%m-%d")
        )
        .dimmed()
    );
    println!("{}", report.render());

    if report.status() == SyncStatus::Failed {
        anyhow::bail!("Every feed failed to sync");
    }

    Ok(())
}
