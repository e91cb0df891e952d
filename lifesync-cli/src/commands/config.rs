use std::path::Path;

use anyhow::Result;
use lifesync_core::Settings;
use owo_colors::OwoColorize;

pub fn show(explicit: Option<&Path>) -> Result<()> {
    let config_path = Settings::config_path()?;
    let settings = Settings::load(explicit)?;

    println!("{}", "Paths".bold());
    println!("  Config:  {}", config_path.display());
    if let Some(path) = explicit {
        println!("  Extra:   {}", path.display());
    }
    println!("  Store:   {}", settings.store_path()?.display());

    println!();
    println!("{}", "Feeds".bold());
    let feeds = settings.feeds();
    if feeds.is_empty() {
        println!("  {}", "None configured".dimmed());
    }
    for feed in &feeds {
        println!("  {:<12} {}", feed.label, feed.location.dimmed());
    }

    println!();
    println!("{}", "Sync window".bold());
    println!("  {} days back, {} days forward", settings.days_back, settings.days_forward);

    if !config_path.exists() {
        println!();
        println!(
            "{}",
            "No config file yet. Create one with `lifesync config init`.".dimmed()
        );
    }

    Ok(())
}

pub fn init(force: bool) -> Result<()> {
    let config_path = Settings::config_path()?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}\nUse --force to overwrite it.",
            config_path.display()
        );
    }

    Settings::create_default_config(&config_path)?;
    println!("{} Wrote {}", "✓".green(), config_path.display());
    Ok(())
}
