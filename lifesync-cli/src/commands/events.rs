use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use lifesync_core::view::days_between;
use lifesync_core::{CalendarView, Occurrence, Settings, Store, SyncWindow};
use owo_colors::OwoColorize;

use crate::render::{day_label, render_event, render_slot};

/// Days shown when only a start day is given.
const DEFAULT_SPAN_DAYS: i64 = 7;

pub struct EventsOptions {
    pub from: Option<String>,
    pub to: Option<String>,
    pub reveal: bool,
    pub tz: Option<String>,
    pub layout: bool,
    pub json: bool,
}

pub async fn run(settings: Settings, options: EventsOptions) -> Result<()> {
    let tz = super::display_tz(&settings, options.tz.as_deref())?;
    let today = Utc::now().with_timezone(&tz).date_naive();

    let from = match options.from.as_deref() {
        Some(s) => parse_day(s)?,
        None => today,
    };
    let to = match options.to.as_deref() {
        Some(s) => parse_day(s)?,
        None => from + Duration::days(DEFAULT_SPAN_DAYS - 1),
    };
    if to < from {
        anyhow::bail!("--to {} is before --from {}", to, from);
    }

    // Widened so all-day occurrences, stored at midnight UTC, are always read.
    let after_last = to + Duration::days(1);
    let window = SyncWindow::new(
        local_midnight(tz, from).min(utc_midnight(from)),
        local_midnight(tz, after_last).max(utc_midnight(after_last)) - Duration::seconds(1),
    );

    let store = super::open_store(&settings).await?;
    let stored = store.list_occurrences(&window).await?;
    let ignores = store.ignore_list().await?;

    let view = CalendarView::build(stored, &ignores, options.reveal, tz, days_between(from, to));

    if options.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if view.events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    let mut first = true;
    for day in &view.days {
        let events: Vec<&Occurrence> = view.events_on(day.date, tz).collect();

        if events.is_empty() && day.slots.is_empty() {
            continue;
        }

        if !first {
            println!();
        }
        first = false;

        println!("{}", day_label(day.date, today).bold());
        for occurrence in &events {
            println!("{}", render_event(occurrence, tz, view.is_overlapping(&occurrence.id)));
        }

        if options.layout && !day.slots.is_empty() {
            println!("{}", "  layout".dimmed());
            for slot in &day.slots {
                println!("{}", render_slot(slot));
            }
        }
    }

    if !view.overlaps.is_empty() {
        let count = view.overlaps.len();
        println!(
            "\n{} {} in a work/personal conflict",
            "⚠".red(),
            if count == 1 {
                "1 event".to_string()
            } else {
                format!("{} events", count)
            }
        );
    }

    if !options.reveal && view.events.iter().any(|o| o.category == lifesync_core::Category::Personal) {
        println!("{}", "Personal details hidden. Use --reveal to show them.".dimmed());
    }

    Ok(())
}

/// YYYY-MM-DD, or something fuzzydate understands ("tomorrow", "next friday").
fn parse_day(s: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    fuzzydate::parse(s)
        .map(|dt| dt.date())
        .map_err(|_| anyhow::anyhow!("Could not parse date: \"{}\"", s))
}

fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| utc_midnight(date))
}

fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
