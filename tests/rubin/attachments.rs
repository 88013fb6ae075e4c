use super::fixture;
use crate::common::{base, MockFetcher, PORTAL_BASE};
use council_ingest::error::ScrapeError;
use council_ingest::sources::rubin::attachments::{classify_listing, resolve_attachments};
use council_ingest::types::{AttachmentOutcome, MeetingId};

fn listing_url(sid: &str) -> String {
    format!("{PORTAL_BASE}anlagenliste.php?sid={sid}&toid=1")
}

#[tokio::test]
async fn test_resolves_each_attachment_form() {
    let mut fetcher = MockFetcher::new();
    fetcher.add_fixture(&listing_url("101"), &fixture("attachments_101_1.html"));
    let id = MeetingId::new("101").unwrap();

    let outcome = resolve_attachments(&fetcher, &base(), &id, "SV-2006/0123", &listing_url("101"))
        .await
        .unwrap();

    let AttachmentOutcome::Resolved(attachments) = outcome else {
        panic!("expected attachments, got {outcome:?}");
    };
    assert_eq!(attachments.len(), 2);

    assert_eq!(attachments[0].meeting_id, id);
    assert_eq!(attachments[0].agenda_item_key, "SV-2006/0123");
    assert_eq!(attachments[0].title, "Haushaltsplan 2007.pdf");
    assert_eq!(
        attachments[0].file_url,
        format!("{PORTAL_BASE}show_anlagen.php?id=9001&typ=pdf")
    );

    assert_eq!(attachments[1].title, "Stellungnahme Kämmerei.pdf");
    assert_eq!(
        attachments[1].file_url,
        format!("{PORTAL_BASE}show_anlagen.php?id=9002&typ=pdf")
    );
}

#[test]
fn test_unavailable_sentence_wins_over_forms() {
    let id = MeetingId::new("102").unwrap();
    let outcome = classify_listing(
        &id,
        "2006/0456",
        &listing_url("102"),
        &fixture("attachments_unavailable.html"),
        &base(),
    )
    .unwrap();

    let AttachmentOutcome::Unavailable(missing) = outcome else {
        panic!("expected unavailable marker, got {outcome:?}");
    };
    assert_eq!(missing.agenda_item_key, "2006/0456");
    assert_eq!(missing.listing_url, listing_url("102"));
}

#[test]
fn test_empty_listing_resolves_to_no_attachments() {
    let id = MeetingId::new("101").unwrap();
    let outcome = classify_listing(
        &id,
        "101/2",
        &listing_url("101"),
        "<html><body><h3>Anlagen</h3></body></html>",
        &base(),
    )
    .unwrap();
    assert_eq!(outcome, AttachmentOutcome::Resolved(Vec::new()));
}

#[tokio::test]
async fn test_listing_fetch_failure_is_reported() {
    let fetcher = MockFetcher::new();
    let id = MeetingId::new("101").unwrap();
    let err = resolve_attachments(&fetcher, &base(), &id, "101/1", &listing_url("101"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Network(_)));
}
