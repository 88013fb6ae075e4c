use super::fixture;
use crate::common::{base, session_url, MockFetcher};
use chrono::NaiveDate;
use council_ingest::error::ScrapeError;
use council_ingest::sources::rubin::meeting::{extract_meeting, parse_meeting};
use council_ingest::types::MeetingId;

#[test]
fn test_parse_full_meeting_page() {
    let id = MeetingId::new("101").unwrap();
    let parsed = parse_meeting(&id, &fixture("session_101.html")).unwrap();
    let meeting = parsed.meeting;

    assert_eq!(meeting.id, id);
    assert_eq!(meeting.title, "Sitzung der Stadtverordnetenversammlung");
    assert_eq!(meeting.location.as_deref(), Some("Plenarsaal, Rathaus"));
    assert_eq!(meeting.body.as_deref(), Some("Stadtverordnetenversammlung"));

    let day = NaiveDate::from_ymd_opt(2006, 11, 29).unwrap();
    assert_eq!(meeting.start, day.and_hms_opt(15, 0, 0));
    assert_eq!(meeting.end, day.and_hms_opt(15, 45, 0));
    assert_eq!(meeting.duration_minutes, Some(45));
    assert!(parsed.diagnostics.is_empty());
}

#[test]
fn test_unparseable_schedule_keeps_other_fields() {
    let id = MeetingId::new("102").unwrap();
    let parsed = parse_meeting(&id, &fixture("session_102.html")).unwrap();
    let meeting = &parsed.meeting;

    assert_eq!(meeting.title, "Sitzung des Haupt- und Finanzausschusses");
    assert_eq!(meeting.body.as_deref(), Some("Haupt- und Finanzausschuss"));
    assert_eq!(meeting.location, None);
    assert_eq!(meeting.start, None);
    assert_eq!(meeting.end, None);
    assert_eq!(meeting.duration_minutes, None);

    assert_eq!(parsed.diagnostics.len(), 1);
    assert!(matches!(
        &parsed.diagnostics[0],
        ScrapeError::UnparseableDateTime { value } if value == "wird noch bekannt gegeben"
    ));
}

#[test]
fn test_missing_title_is_an_error() {
    let id = MeetingId::new("103").unwrap();
    let err = parse_meeting(&id, &fixture("session_103.html")).unwrap_err();
    assert!(matches!(
        err,
        ScrapeError::MissingRequiredElement { element: "b.Suchueberschrift", .. }
    ));
}

#[test]
fn test_missing_info_block_is_an_error() {
    let id = MeetingId::new("104").unwrap();
    let html = r#"<b class="Suchueberschrift">Sitzung</b><p>Keine Angaben</p>"#;
    let err = parse_meeting(&id, html).unwrap_err();
    assert!(matches!(err, ScrapeError::MissingRequiredElement { .. }));
}

#[tokio::test]
async fn test_extract_meeting_fetches_session_page() {
    let mut fetcher = MockFetcher::new();
    fetcher.add_fixture(&session_url("101"), &fixture("session_101.html"));
    let id = MeetingId::new("101").unwrap();

    let parsed = extract_meeting(&fetcher, &base(), &id).await.unwrap();
    assert_eq!(parsed.meeting.duration_minutes, Some(45));
    assert_eq!(fetcher.requested(), vec![session_url("101")]);
}

#[tokio::test]
async fn test_extract_meeting_surfaces_fetch_errors() {
    let fetcher = MockFetcher::new();
    let id = MeetingId::new("101").unwrap();
    let err = extract_meeting(&fetcher, &base(), &id).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Network(_)));
}
