//! Side-by-side column layout for one day of events.
//!
//! Greedy interval colouring: events are visited by start time (longer ones
//! first on ties) and dropped into the first group they intersect, taking
//! the lowest column no intersecting member of that group uses. This is not
//! a minimum colouring, but it is deterministic for a given input.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::Occurrence;

const HOURS_PER_DAY: f64 = 24.0;

/// Smallest rendered height, as a fraction of the day.
const MIN_HEIGHT: f64 = 0.02;

/// One event's time range on a day, in fractional local hours.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySpan {
    pub id: String,
    pub start_hour: f64,
    pub end_hour: f64,
}

/// Geometry for one event on one day.
///
/// `top` and `height` are fractions of the day axis; `left` and `width` are
/// percentages of the day column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSlot {
    pub id: String,
    pub column: usize,
    pub total_columns: usize,
    pub top: f64,
    pub height: f64,
    pub left: f64,
    pub width: f64,
}

struct Placed {
    id: String,
    start: f64,
    end: f64,
    column: usize,
}

impl Placed {
    fn intersects(&self, other: &Placed) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Assign columns and geometry to one day's events.
pub fn layout_day(spans: Vec<DaySpan>) -> Vec<LayoutSlot> {
    let mut placed: Vec<Placed> = spans
        .into_iter()
        .map(|s| Placed {
            id: s.id,
            start: s.start_hour.clamp(0.0, HOURS_PER_DAY),
            end: s.end_hour.clamp(0.0, HOURS_PER_DAY),
            column: 0,
        })
        .collect();

    placed.sort_by(|a, b| a.start.total_cmp(&b.start).then(b.end.total_cmp(&a.end)));

    // Each group holds indexes into `placed`.
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for i in 0..placed.len() {
        let slot = &placed[i];
        let target = groups
            .iter()
            .position(|group| group.iter().any(|&j| placed[j].intersects(slot)));

        match target {
            Some(g) => {
                let used: BTreeSet<usize> = groups[g]
                    .iter()
                    .filter(|&&j| placed[j].intersects(slot))
                    .map(|&j| placed[j].column)
                    .collect();
                let column = (0..).find(|c| !used.contains(c)).unwrap_or(0);

                placed[i].column = column;
                groups[g].push(i);
            }
            None => groups.push(vec![i]),
        }
    }

    let mut total_columns = vec![1; placed.len()];
    for group in &groups {
        let total = group.iter().map(|&j| placed[j].column).max().unwrap_or(0) + 1;
        for &j in group {
            total_columns[j] = total;
        }
    }

    placed
        .into_iter()
        .zip(total_columns)
        .map(|(p, total)| {
            let width = 100.0 / total as f64;
            LayoutSlot {
                top: p.start / HOURS_PER_DAY,
                height: ((p.end - p.start) / HOURS_PER_DAY).max(MIN_HEIGHT),
                left: p.column as f64 * width,
                width,
                column: p.column,
                total_columns: total,
                id: p.id,
            }
        })
        .collect()
}

/// Project timed occurrences onto one local day in `tz`.
///
/// Parts before local midnight clamp to 0 and parts after the next midnight
/// to 24. All-day occurrences are left out of the timed grid.
pub fn day_spans(occurrences: &[Occurrence], day: NaiveDate, tz: Tz) -> Vec<DaySpan> {
    let day_start = day.and_time(NaiveTime::MIN);
    let day_end = day_start + Duration::days(1);

    occurrences
        .iter()
        .filter(|o| !o.is_all_day)
        .filter_map(|o| {
            let start = o.start.with_timezone(&tz).naive_local();
            let end = o.end.with_timezone(&tz).naive_local();

            let intersects = start < day_end && end > day_start;
            let instant_on_day = start == end && start >= day_start && start < day_end;
            if !intersects && !instant_on_day {
                return None;
            }

            Some(DaySpan {
                id: o.id.clone(),
                start_hour: hours_since(day_start, start.max(day_start)),
                end_hour: hours_since(day_start, end.min(day_end)),
            })
        })
        .collect()
}

/// Local days an occurrence's time range touches. An end exactly at
/// midnight does not touch the following day.
pub fn days_touched(occurrence: &Occurrence, tz: Tz) -> Vec<NaiveDate> {
    let start = occurrence.start.with_timezone(&tz).naive_local();
    let end = occurrence.end.with_timezone(&tz).naive_local();

    let first = start.date();
    let last = if end > start {
        (end - Duration::seconds(1)).date()
    } else {
        first
    };

    first.iter_days().take_while(|d| *d <= last).collect()
}

fn hours_since(origin: NaiveDateTime, at: NaiveDateTime) -> f64 {
    (at - origin).num_seconds() as f64 / 3600.0
}
