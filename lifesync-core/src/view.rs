//! Read path: what a consumer gets for a range of stored occurrences.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::event::Occurrence;
use crate::ignore::IgnoreList;
use crate::layout::{LayoutSlot, day_spans, days_touched, layout_day};
use crate::overlap::find_overlaps;
use crate::privacy::mask_all;

#[derive(Debug, Clone, Serialize)]
pub struct DayLayout {
    pub date: NaiveDate,
    pub slots: Vec<LayoutSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    /// Visible occurrences, masked as requested, ordered by start.
    pub events: Vec<Occurrence>,
    /// Ids in a work/personal conflict.
    pub overlaps: BTreeSet<String>,
    pub days: Vec<DayLayout>,
}

impl CalendarView {
    /// Ignore filtering, then conflict detection on the unmasked records,
    /// then masking, then layout of each requested local day.
    pub fn build(
        stored: Vec<Occurrence>,
        ignores: &IgnoreList,
        revealed: bool,
        tz: Tz,
        days: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        let visible = ignores.apply(stored);
        let overlaps: BTreeSet<String> = find_overlaps(&visible).into_iter().collect();

        let mut events = mask_all(visible, revealed);
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        let days = days
            .into_iter()
            .map(|date| DayLayout {
                date,
                slots: layout_day(day_spans(&events, date, tz)),
            })
            .collect();

        CalendarView {
            events,
            overlaps,
            days,
        }
    }

    pub fn is_overlapping(&self, id: &str) -> bool {
        self.overlaps.contains(id)
    }

    /// Events to list under a local day: every day a timed event touches,
    /// and the UTC dates of an all-day event.
    pub fn events_on(&self, date: NaiveDate, tz: Tz) -> impl Iterator<Item = &Occurrence> {
        self.events.iter().filter(move |o| {
            let zone = if o.is_all_day { Tz::UTC } else { tz };
            days_touched(o, zone).contains(&date)
        })
    }

    pub fn slot(&self, date: NaiveDate, id: &str) -> Option<&LayoutSlot> {
        self.days
            .iter()
            .find(|d| d.date == date)
            .and_then(|d| d.slots.iter().find(|s| s.id == id))
    }
}

/// Every date from `from` through `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days().take_while(|d| *d <= to).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PRIVATE_PLACEHOLDER;
    use crate::event::Category;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn occurrence(id: &str, subject: &str, category: Category, start: DateTime<Utc>, minutes: i64) -> Occurrence {
        Occurrence {
            id: id.to_string(),
            base_id: crate::identity::base_id(id).to_string(),
            subject: subject.to_string(),
            start,
            end: start + Duration::minutes(minutes),
            location: Some("Somewhere".to_string()),
            organizer_name: None,
            organizer_email: None,
            attendees: vec![],
            body_preview: None,
            is_all_day: false,
            category,
            last_updated: start,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn stored() -> Vec<Occurrence> {
        vec![
            occurrence("review", "Design review", Category::Work, at(10, 30), 60),
            occurrence("gym", "Free", Category::Personal, at(10, 0), 60),
            occurrence("standup_20250310T090000", "Standup", Category::Work, at(9, 0), 15),
        ]
    }

    #[test]
    fn masking_does_not_change_overlaps() {
        let hidden = CalendarView::build(stored(), &IgnoreList::default(), false, Tz::UTC, [day()]);
        let shown = CalendarView::build(stored(), &IgnoreList::default(), true, Tz::UTC, [day()]);

        assert_eq!(hidden.overlaps, shown.overlaps);
        assert!(hidden.is_overlapping("gym"));
        assert!(hidden.is_overlapping("review"));

        let gym = hidden.events.iter().find(|o| o.id == "gym").unwrap();
        assert_eq!(gym.subject, PRIVATE_PLACEHOLDER);
        assert_eq!(gym.location, None);
    }

    #[test]
    fn ignored_series_is_gone_from_every_output() {
        let ignores = IgnoreList::new(vec!["standup".to_string()], vec![]);
        let view = CalendarView::build(stored(), &ignores, true, Tz::UTC, [day()]);

        assert!(view.events.iter().all(|o| o.base_id != "standup"));
        assert!(view.slot(day(), "standup_20250310T090000").is_none());
        assert_eq!(view.days[0].slots.len(), 2);
    }

    #[test]
    fn events_are_sorted_and_laid_out() {
        let view = CalendarView::build(stored(), &IgnoreList::default(), true, Tz::UTC, [day()]);

        let ids: Vec<_> = view.events.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["standup_20250310T090000", "gym", "review"]);

        let gym = view.slot(day(), "gym").unwrap();
        let review = view.slot(day(), "review").unwrap();
        assert_eq!((gym.column, review.column), (0, 1));
        assert_eq!(gym.total_columns, 2);
        assert_eq!(view.slot(day(), "standup_20250310T090000").unwrap().total_columns, 1);
    }

    #[test]
    fn days_between_is_inclusive() {
        let days = days_between(day(), NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
        assert_eq!(days.len(), 3);
        assert!(days_between(day(), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()).is_empty());
    }

    #[test]
    fn events_on_lists_each_day_touched() {
        let next = day().succ_opt().unwrap();
        let overnight = occurrence("flight", "Flight", Category::Personal, at(22, 0), 5 * 60);
        let mut holiday = occurrence("holiday", "Holiday", Category::Personal, at(0, 0), 24 * 60);
        holiday.is_all_day = true;

        let tz: Tz = "America/New_York".parse().unwrap();
        let view = CalendarView::build(vec![overnight, holiday], &IgnoreList::default(), true, tz, [day(), next]);

        // 22:00 UTC is 18:00 in New York, so the flight stays on the 10th there.
        let on = |date| view.events_on(date, tz).map(|o| o.id.as_str()).collect::<Vec<_>>();
        assert_eq!(on(day()), vec!["holiday", "flight"]);
        assert!(on(next).is_empty());

        let on_utc = |date| view.events_on(date, Tz::UTC).map(|o| o.id.as_str()).collect::<Vec<_>>();
        assert_eq!(on_utc(day()), vec!["holiday", "flight"]);
        assert_eq!(on_utc(next), vec!["flight"]);
    }
}
