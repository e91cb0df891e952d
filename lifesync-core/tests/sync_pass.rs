use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use lifesync_core::view::days_between;
use lifesync_core::{
    CalendarView, Category, FeedSource, FeedConfig, HttpFeedSource, LocalStore, SeriesIgnore, Store, SyncError,
    SyncResult, SyncStatus, SyncWindow, Syncer,
};

const WORK_FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
PRODID:-//Microsoft Corporation//Outlook 16.0 MIMEDIR//EN\r
BEGIN:VEVENT\r
UID:weekly-sync\r
SUMMARY:Weekly sync\r
ORGANIZER;CN=Dana Lee:mailto:dana@example.com\r
ATTENDEE;CN=Sam:mailto:sam@example.com\r
DTSTART;TZID=America/New_York:20250310T100000\r
DTEND;TZID=America/New_York:20250310T103000\r
RRULE:FREQ=WEEKLY;COUNT=4\r
EXDATE;TZID=America/New_York:20250317T100000\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:ooo\r
SUMMARY:Free\r
DTSTART;VALUE=DATE:20250312\r
DTEND;VALUE=DATE:20250313\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:busy-block\r
SUMMARY:Busy\r
DESCRIPTION:Quarterly planning\r
DTSTART:20250311T150000Z\r
DTEND:20250311T160000Z\r
END:VEVENT\r
BEGIN:VEVENT\r
SUMMARY:Broken\r
DTSTART:20250311T170000Z\r
END:VEVENT\r
END:VCALENDAR\r
";

const PERSONAL_FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:dentist\r
SUMMARY:Dentist\r
LOCATION:Elm St\r
DTSTART:20250310T141500Z\r
DTEND:20250310T150000Z\r
END:VEVENT\r
END:VCALENDAR\r
";

struct MemoryFeeds(HashMap<&'static str, &'static str>);

impl FeedSource for MemoryFeeds {
    async fn fetch(&self, location: &str) -> SyncResult<String> {
        self.0
            .get(location)
            .map(|text| text.to_string())
            .ok_or_else(|| SyncError::Transport {
                url: location.to_string(),
                message: "connection refused".to_string(),
            })
    }
}

fn syncer() -> Syncer<MemoryFeeds> {
    let feeds = MemoryFeeds(
        [("mem://work", WORK_FEED), ("mem://home", PERSONAL_FEED)]
            .into_iter()
            .collect(),
    );

    Syncer::new(
        feeds,
        vec![
            FeedConfig::new("work", "mem://work", Category::Work),
            FeedConfig::new("personal", "mem://home", Category::Personal),
        ],
    )
}

fn window() -> SyncWindow {
    SyncWindow::from_days(Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap(), 0, 21)
}

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

#[tokio::test]
async fn full_pass_then_read_path() {
    let store = LocalStore::in_memory();
    let report = syncer().run(&store, window()).await.unwrap();

    assert_eq!(report.status(), SyncStatus::Succeeded);
    assert_eq!(report.feeds[0].skipped, 1);
    // Three weekly occurrences (one excluded) plus the busy block.
    assert_eq!(report.feeds[0].occurrences, 4);
    assert_eq!(report.feeds[1].occurrences, 1);

    let stored = store.list_occurrences(&window()).await.unwrap();
    let ids: Vec<&str> = stored.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "weekly-sync_20250310T140000",
            "dentist",
            "busy-block",
            "weekly-sync_20250324T140000",
            "weekly-sync_20250331T140000",
        ]
    );

    let busy = stored.iter().find(|o| o.id == "busy-block").unwrap();
    assert_eq!(busy.subject, "Quarterly planning");

    let weekly = &stored[0];
    assert_eq!(weekly.base_id, "weekly-sync");
    assert_eq!(weekly.organizer_name.as_deref(), Some("Dana Lee"));
    assert_eq!(weekly.attendees, vec!["sam@example.com"]);

    let ignores = store.ignore_list().await.unwrap();
    let view = CalendarView::build(stored, &ignores, false, Tz::UTC, days_between(march(10), march(11)));

    assert!(view.is_overlapping("dentist"));
    assert!(view.is_overlapping("weekly-sync_20250310T140000"));
    assert!(!view.is_overlapping("busy-block"));

    let dentist = view.events.iter().find(|o| o.id == "dentist").unwrap();
    assert_eq!(dentist.subject, "Personal Event");
    assert_eq!(dentist.location, None);

    let slot = view.slot(march(10), "dentist").unwrap();
    assert_eq!(slot.total_columns, 2);
}

#[tokio::test]
async fn resync_is_idempotent_and_ignores_survive() {
    let store = LocalStore::in_memory();
    let syncer = syncer();

    syncer.run(&store, window()).await.unwrap();
    let first = store.list_occurrences(&window()).await.unwrap();

    store
        .add_ignored_base_id(SeriesIgnore {
            base_id: "weekly-sync".to_string(),
            subject: "Weekly sync".to_string(),
            reason: Some("optional".to_string()),
            ignored_at: Utc::now(),
        })
        .await
        .unwrap();

    syncer.run(&store, window()).await.unwrap();
    let second = store.list_occurrences(&window()).await.unwrap();

    let first_ids: Vec<_> = first.iter().map(|o| &o.id).collect();
    let second_ids: Vec<_> = second.iter().map(|o| &o.id).collect();
    assert_eq!(first_ids, second_ids);

    let ignores = store.ignore_list().await.unwrap();
    let view = CalendarView::build(second, &ignores, true, Tz::UTC, Vec::<NaiveDate>::new());

    assert!(view.events.iter().all(|o| o.base_id != "weekly-sync"));
    // With the meeting hidden the dentist visit no longer conflicts.
    assert!(view.overlaps.is_empty());
    assert_eq!(view.events.len(), 2);
}

#[tokio::test]
async fn unreachable_feed_is_reported_not_fatal() {
    let store = LocalStore::in_memory();
    let syncer = Syncer::new(
        MemoryFeeds([("mem://home", PERSONAL_FEED)].into_iter().collect()),
        vec![
            FeedConfig::new("work", "mem://offline", Category::Work),
            FeedConfig::new("personal", "mem://home", Category::Personal),
        ],
    );

    let report = syncer.run(&store, window()).await.unwrap();

    assert_eq!(report.status(), SyncStatus::Partial);
    assert!(report.feeds[0].error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(store.stats().await.unwrap().total, 1);
}

#[tokio::test]
async fn timed_out_feed_does_not_fail_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    let work_path = dir.path().join("work.ics");
    std::fs::write(&work_path, WORK_FEED).unwrap();

    // Accepts the request and never responds.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let silent_url = format!("http://{}/home.ics", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let store = LocalStore::in_memory();
    let syncer = Syncer::new(
        HttpFeedSource::new(Duration::from_millis(300)),
        vec![
            FeedConfig::new("work", work_path.to_str().unwrap(), Category::Work),
            FeedConfig::new("personal", silent_url, Category::Personal),
        ],
    );

    let report = syncer.run(&store, window()).await.unwrap();

    assert_eq!(report.status(), SyncStatus::Partial);
    assert_eq!(report.feeds[0].occurrences, 4);
    assert!(report.feeds[1].error.as_deref().unwrap().contains("timed out"));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.by_category.get(&Category::Work).copied(), Some(4));
    assert_eq!(stats.by_category.get(&Category::Personal), None);
}
