use super::fixture;
use crate::common::{
    create_test_context, search_url, session_url, MockFetcher, MockRecordStore, PORTAL_BASE,
};
use chrono::NaiveDate;
use council_ingest::error::ScrapeError;
use council_ingest::ingest::{scrape_meeting, scrape_portal};
use council_ingest::types::{MeetingId, Period, Record, RunStatus, ScrapeSummary};

const FROM: &str = "01.01.2006";
const TO: &str = "31.12.2006";

fn portal_fetcher() -> MockFetcher {
    let mut fetcher = MockFetcher::new();
    fetcher.add_fixture(PORTAL_BASE, &fixture("home.html"));
    fetcher.add_fixture(&search_url(FROM, TO, 0), &fixture("search_page_0.html"));
    fetcher.add_fixture(&search_url(FROM, TO, 2), &fixture("search_page_2.html"));
    fetcher.add_fixture(&search_url(FROM, TO, 3), &fixture("search_page_3.html"));
    fetcher.add_fixture(&session_url("101"), &fixture("session_101.html"));
    fetcher.add_fixture(&session_url("102"), &fixture("session_102.html"));
    fetcher.add_fixture(&session_url("103"), &fixture("session_103.html"));
    fetcher.add_fixture(
        &format!("{PORTAL_BASE}anlagenliste.php?sid=101&toid=1"),
        &fixture("attachments_101_1.html"),
    );
    fetcher.add_fixture(
        &format!("{PORTAL_BASE}anlagenliste.php?sid=102&toid=1"),
        &fixture("attachments_unavailable.html"),
    );
    fetcher
}

#[tokio::test]
async fn test_scrape_portal_stores_every_record_kind() {
    let store = MockRecordStore::new();
    let context = create_test_context(portal_fetcher(), store.clone());

    let summary = scrape_portal(&context, &Period::Year { year: 2006 }, false)
        .await
        .expect("scrape failed");

    assert_eq!(
        summary,
        ScrapeSummary {
            status: RunStatus::Scraped,
            changed: true,
            meetings: 2,
            agenda_items: 3,
            attachments: 2,
            unavailable_attachments: 1,
            failed_meetings: 1,
        }
    );

    assert_eq!(
        store.tables(),
        vec![
            "updates",
            "sessions",
            "agenda",
            "agenda",
            "attachments",
            "attachments",
            "sessions",
            "agenda",
            "404attachments",
        ]
    );
    assert_eq!(*store.flushes.lock().unwrap(), 1);

    let records = store.records();
    let Record::Attachment(attachment) = &records[4] else {
        panic!("expected attachment, got {:?}", records[4]);
    };
    assert_eq!(attachment.agenda_item_key, "SV-2006/0123");

    let Record::AttachmentUnavailable(missing) = &records[8] else {
        panic!("expected unavailable marker, got {:?}", records[8]);
    };
    assert_eq!(missing.agenda_item_key, "2006/0456");
}

#[tokio::test]
async fn test_unchanged_portal_is_skipped() {
    let fetcher = portal_fetcher();
    let last_scrape = NaiveDate::from_ymd_opt(2015, 3, 14)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let store = MockRecordStore::with_last_scrape(last_scrape);
    let context = create_test_context(fetcher.clone(), store.clone());

    let summary = scrape_portal(&context, &Period::Year { year: 2006 }, false)
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Unchanged);
    assert!(!summary.changed);
    assert_eq!(summary.meetings, 0);
    assert!(store.records().is_empty());
    assert_eq!(*store.flushes.lock().unwrap(), 0);
    assert_eq!(fetcher.requested(), vec![PORTAL_BASE.to_string()]);
}

#[tokio::test]
async fn test_force_scrapes_unchanged_portal() {
    let last_scrape = NaiveDate::from_ymd_opt(2015, 3, 14)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let store = MockRecordStore::with_last_scrape(last_scrape);
    let context = create_test_context(portal_fetcher(), store.clone());

    let summary = scrape_portal(&context, &Period::Year { year: 2006 }, true)
        .await
        .unwrap();

    assert!(!summary.changed);
    assert_eq!(summary.meetings, 2);
    assert_eq!(store.tables()[0], "updates");
}

#[tokio::test]
async fn test_discovery_failure_aborts_run() {
    let mut fetcher = MockFetcher::new();
    fetcher.add_fixture(PORTAL_BASE, &fixture("home.html"));
    let store = MockRecordStore::new();
    let context = create_test_context(fetcher, store.clone());

    let err = scrape_portal(&context, &Period::Year { year: 2006 }, false)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Network(_)));
    assert_eq!(store.tables(), vec!["updates"]);
    assert_eq!(*store.flushes.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_records_before_a_failed_search_page_are_flushed() {
    let mut fetcher = portal_fetcher();
    fetcher.fixtures.remove(&search_url(FROM, TO, 2));
    let store = MockRecordStore::new();
    let context = create_test_context(fetcher, store.clone());

    let err = scrape_portal(&context, &Period::Year { year: 2006 }, false)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Network(_)));
    assert_eq!(*store.flushes.lock().unwrap(), 1);
    assert_eq!(
        store.tables(),
        vec![
            "updates",
            "sessions",
            "agenda",
            "agenda",
            "attachments",
            "attachments",
            "sessions",
            "agenda",
            "404attachments",
        ]
    );
}

#[tokio::test]
async fn test_scrape_meeting_collects_before_storing() {
    let store = MockRecordStore::new();
    let context = create_test_context(portal_fetcher(), store.clone());
    let id = MeetingId::new("101").unwrap();

    let records = scrape_meeting(&context, &id).await.unwrap();

    assert_eq!(records.meeting.title, "Sitzung der Stadtverordnetenversammlung");
    assert_eq!(records.agenda.len(), 2);
    assert_eq!(records.attachments.len(), 1);
    assert!(store.records().is_empty());
}
