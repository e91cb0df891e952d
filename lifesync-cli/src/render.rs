//! Terminal rendering for lifesync types.
//!
//! Extension traits that add colored output to lifesync-core types using
//! owo_colors.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use lifesync_core::layout::LayoutSlot;
use lifesync_core::{Category, FeedReport, Occurrence, SyncReport, SyncStatus};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Category {
    fn render(&self) -> String {
        let tag = format!("[{}]", self);
        match self {
            Category::Work => tag.blue().to_string(),
            Category::Personal => tag.magenta().to_string(),
        }
    }
}

impl Render for FeedReport {
    fn render(&self) -> String {
        match &self.error {
            None => {
                let mut line = format!(
                    "{} {} {} {}",
                    "✓".green(),
                    self.label.bold(),
                    self.category.render(),
                    format!("{} {}", self.occurrences, pluralize("occurrence", self.occurrences)).dimmed()
                );
                if self.skipped > 0 {
                    let skipped = format!("({} skipped)", self.skipped);
                    line.push_str(&format!(" {}", skipped.yellow()));
                }
                line
            }
            Some(error) => format!(
                "{} {} {}\n   {}",
                "✗".red(),
                self.label.bold(),
                self.category.render(),
                error.red()
            ),
        }
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines: Vec<String> = self.feeds.iter().map(Render::render).collect();

        for error in &self.metadata_errors {
            lines.push(format!("{} {}", "!".yellow(), error.yellow()));
        }

        let summary = format!(
            "Sync {}: {} {} stored",
            self.status(),
            self.total_occurrences(),
            pluralize("occurrence", self.total_occurrences())
        );
        lines.push(String::new());
        lines.push(match self.status() {
            SyncStatus::Succeeded => summary.green().to_string(),
            SyncStatus::Partial => summary.yellow().to_string(),
            SyncStatus::Failed => summary.red().to_string(),
        });

        lines.join("\n")
    }
}

/// One event line: time, subject, category and a conflict marker.
pub fn render_event(occurrence: &Occurrence, tz: Tz, overlapping: bool) -> String {
    let time = if occurrence.is_all_day {
        format!("{:>13}", "all-day")
    } else {
        format!(
            "{:>5} - {:>5}",
            occurrence.start.with_timezone(&tz).format("%H:%M"),
            occurrence.end.with_timezone(&tz).format("%H:%M")
        )
    };

    let subject = if overlapping {
        format!("{} {}", "⚠".red(), occurrence.subject.red())
    } else {
        occurrence.subject.clone()
    };

    let mut line = format!("  {} {} {}", time, subject, occurrence.category.render());
    if let Some(location) = &occurrence.location {
        line.push_str(&format!(" {}", format!("@ {}", location).dimmed()));
    }
    line
}

pub fn render_slot(slot: &LayoutSlot) -> String {
    format!(
        "    {} col {}/{}  top {:.1}%  height {:.1}%  left {:.1}%  width {:.1}%",
        slot.id.dimmed(),
        slot.column + 1,
        slot.total_columns,
        slot.top * 100.0,
        slot.height * 100.0,
        slot.left,
        slot.width
    )
}

/// Human label for a day ("Today", "Tomorrow", "Wed Mar 12").
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

pub fn render_instant(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string()
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
