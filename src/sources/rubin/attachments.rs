use crate::error::{Result, ScrapeError};
use crate::runtime::fetcher::Fetcher;
use crate::sources::common::{
    attr, descendants, document_text, find_tags, normalize_text, parse_dom, text_of,
};
use crate::sources::rubin::table::FormLink;
use crate::types::{Attachment, AttachmentOutcome, AttachmentUnavailable, MeetingId};
use reqwest::Url;
use tl::{HTMLTag, Parser};

pub const ATTACHMENT_UNAVAILABLE_TEXT: &str =
    "Auf die Anlage konnte nicht zugegriffen werden oder Sie existiert nicht mehr.";

/// Rendered text of a form; a bare submit button renders its value.
fn form_title(form: &HTMLTag, parser: &Parser) -> String {
    let text = text_of(form, parser);
    if !text.is_empty() {
        return text;
    }
    descendants(form, parser, "input")
        .into_iter()
        .filter(|input| {
            attr(input, "type")
                .map(|kind| !kind.eq_ignore_ascii_case("hidden"))
                .unwrap_or(true)
        })
        .find_map(|input| attr(input, "value").filter(|value| !value.trim().is_empty()))
        .map(|value| normalize_text(&value))
        .unwrap_or_default()
}

/// Classifies a listing page: the portal's "not accessible" sentence wins
/// over any forms that may also be on the page.
pub fn classify_listing(
    meeting_id: &MeetingId,
    agenda_item_key: &str,
    listing_url: &str,
    html: &str,
    base: &Url,
) -> Result<AttachmentOutcome> {
    let dom = parse_dom(html)?;
    let parser = dom.parser();

    if document_text(&dom).contains(ATTACHMENT_UNAVAILABLE_TEXT) {
        tracing::info!("[Scraper] Agenda item {agenda_item_key} is missing at least one attachment");
        return Ok(AttachmentOutcome::Unavailable(AttachmentUnavailable {
            agenda_item_key: agenda_item_key.to_string(),
            listing_url: listing_url.to_string(),
        }));
    }

    let attachments = find_tags(&dom, "form")
        .into_iter()
        .map(|form| {
            let file_url = FormLink::from_form(form, parser).resolve(base)?;
            Ok(Attachment {
                meeting_id: meeting_id.clone(),
                agenda_item_key: agenda_item_key.to_string(),
                title: form_title(form, parser),
                file_url,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AttachmentOutcome::Resolved(attachments))
}

pub async fn resolve_attachments(
    fetcher: &dyn Fetcher,
    base: &Url,
    meeting_id: &MeetingId,
    agenda_item_key: &str,
    listing_url: &str,
) -> Result<AttachmentOutcome> {
    tracing::debug!("[Scraper] Scraping attachment listing {listing_url}");
    let html = fetcher
        .fetch(listing_url)
        .await
        .map_err(ScrapeError::Network)?;
    classify_listing(meeting_id, agenda_item_key, listing_url, &html, base)
}
