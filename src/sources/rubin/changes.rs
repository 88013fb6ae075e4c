use crate::error::{Result, ScrapeError};
use crate::runtime::fetcher::Fetcher;
use crate::sources::common::{document_text, find_tag_with_class, parse_dom, text_of};
use chrono::NaiveDateTime;
use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

pub const BANNER_PREFIX: &str = "Letzte Aktualisierung am:";
const BANNER_CLASS: &str = "aktualisierung";
const BANNER_FORMAT: &str = "%d.%m.%Y, %H:%M";

static BANNER_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{2}\.\d{2}\.\d{4}),\s*(\d{2}:\d{2})").unwrap());

/// Timestamp from the home page's "Letzte Aktualisierung am: DD.MM.YYYY, HH:MM"
/// banner.
pub fn parse_last_update(html: &str) -> Result<NaiveDateTime> {
    let dom = parse_dom(html)?;
    let parser = dom.parser();

    let banner = find_tag_with_class(&dom, "div", BANNER_CLASS)
        .map(|tag| text_of(tag, parser))
        .filter(|text| text.contains(BANNER_PREFIX))
        .unwrap_or_else(|| document_text(&dom));

    let Some(start) = banner.find(BANNER_PREFIX) else {
        return Err(ScrapeError::MissingRequiredElement {
            element: "div.aktualisierung",
            page: "/".to_string(),
        });
    };
    let remainder = &banner[start + BANNER_PREFIX.len()..];

    let unparseable = || ScrapeError::UnparseableDateTime {
        value: remainder.trim().to_string(),
    };
    let caps = BANNER_VALUE_RE.captures(remainder).ok_or_else(unparseable)?;
    let value = format!("{}, {}", &caps[1], &caps[2]);
    NaiveDateTime::parse_from_str(&value, BANNER_FORMAT).map_err(|_| unparseable())
}

/// True when nothing was scraped yet or the portal updated after the last
/// scrape.
pub fn has_changed_since(last_update: NaiveDateTime, since: Option<NaiveDateTime>) -> bool {
    match since {
        None => true,
        Some(since) => since < last_update,
    }
}

pub async fn has_portal_changed(
    fetcher: &dyn Fetcher,
    base: &Url,
    since: Option<NaiveDateTime>,
) -> Result<bool> {
    let html = fetcher
        .fetch(base.as_str())
        .await
        .map_err(ScrapeError::Network)?;
    let last_update = parse_last_update(&html)?;
    tracing::info!("[Scraper] Portal last updated {last_update}, last scrape {since:?}");
    Ok(has_changed_since(last_update, since))
}
