use crate::error::{Result, ScrapeError};
use crate::runtime::fetcher::Fetcher;
use crate::sources::common::{
    descendants, find_tag_with_class, parse_dom, shallow_descendants, text_of,
};
use crate::types::{Meeting, MeetingId};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

pub const SESSION_PATH: &str = "sitzungen_top.php";

const TITLE_CLASS: &str = "Suchueberschrift";
const INFO_BLOCK_CLASS: &str = "InfoBlock";
const LABEL_SCHEDULE: &str = "Termin:";
const LABEL_LOCATION: &str = "Raum:";
const LABEL_BODY: &str = "Gremien:";

static SCHEDULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<day>\d{2})\.(?P<month>\d{2})\.(?P<year>\d{4}),\s(?P<from_h>\d{2}):(?P<from_m>\d{2})\sUhr\s-\s(?P<until_h>\d{2}):(?P<until_m>\d{2})\sUhr",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
}

/// A meeting plus the field-level problems hit while reading it.
#[derive(Debug)]
pub struct ParsedMeeting {
    pub meeting: Meeting,
    pub diagnostics: Vec<ScrapeError>,
}

pub fn session_url(base: &Url, meeting_id: &MeetingId) -> Result<String> {
    let mut url = base.join(SESSION_PATH).map_err(|e| ScrapeError::Url {
        url: SESSION_PATH.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut().append_pair("sid", meeting_id.as_str());
    Ok(url.to_string())
}

pub async fn fetch_session_page(
    fetcher: &dyn Fetcher,
    base: &Url,
    meeting_id: &MeetingId,
) -> Result<String> {
    let url = session_url(base, meeting_id)?;
    fetcher.fetch(&url).await.map_err(ScrapeError::Network)
}

/// `DD.MM.YYYY, HH:MM Uhr - HH:MM Uhr`. Both ends fall on the given date; an
/// end before the start wraps the duration past midnight.
pub fn parse_schedule(value: &str) -> Option<Schedule> {
    let caps = SCHEDULE_RE.captures(value)?;
    let number = |name: &str| caps[name].parse::<u32>().ok();

    let date = NaiveDate::from_ymd_opt(
        caps["year"].parse::<i32>().ok()?,
        number("month")?,
        number("day")?,
    )?;
    let start = date.and_hms_opt(number("from_h")?, number("from_m")?, 0)?;
    let end = date.and_hms_opt(number("until_h")?, number("until_m")?, 0)?;
    let duration_minutes = (end - start).num_minutes().rem_euclid(24 * 60);

    Some(Schedule {
        start,
        end,
        duration_minutes,
    })
}

pub fn parse_meeting(meeting_id: &MeetingId, html: &str) -> Result<ParsedMeeting> {
    let dom = parse_dom(html)?;
    let parser = dom.parser();
    let page = format!("{SESSION_PATH}?sid={meeting_id}");

    let title = find_tag_with_class(&dom, "b", TITLE_CLASS)
        .map(|tag| text_of(tag, parser))
        .ok_or_else(|| ScrapeError::MissingRequiredElement {
            element: "b.Suchueberschrift",
            page: page.clone(),
        })?;

    let info_table = find_tag_with_class(&dom, "div", INFO_BLOCK_CLASS)
        .and_then(|block| descendants(block, parser, "table").into_iter().next())
        .ok_or_else(|| ScrapeError::MissingRequiredElement {
            element: "div.InfoBlock table",
            page: page.clone(),
        })?;

    let mut meeting = Meeting {
        id: meeting_id.clone(),
        title,
        body: None,
        location: None,
        start: None,
        end: None,
        duration_minutes: None,
    };
    let mut diagnostics = Vec::new();

    for (index, tr) in shallow_descendants(info_table, parser, "tr", "table")
        .into_iter()
        .enumerate()
    {
        let cells = shallow_descendants(tr, parser, "td", "table");
        if cells.is_empty() {
            continue;
        }
        if cells.len() < 2 {
            let err = ScrapeError::MalformedRow {
                row: index,
                expected: 2,
                found: cells.len(),
            };
            tracing::debug!("[Scraper] {meeting_id}: skipping info row: {err}");
            continue;
        }
        if cells.len() > 2 {
            continue;
        }

        let label = text_of(cells[0], parser);
        let value = text_of(cells[1], parser);
        match label.as_str() {
            LABEL_SCHEDULE => match parse_schedule(&value) {
                Some(schedule) => {
                    meeting.start = Some(schedule.start);
                    meeting.end = Some(schedule.end);
                    meeting.duration_minutes = Some(schedule.duration_minutes);
                }
                None => {
                    tracing::warn!(
                        "[Scraper] Unparseable date/time info in meeting {meeting_id}: \"{value}\""
                    );
                    diagnostics.push(ScrapeError::UnparseableDateTime { value });
                }
            },
            LABEL_LOCATION => meeting.location = Some(value),
            LABEL_BODY => meeting.body = Some(value),
            _ => {}
        }
    }

    Ok(ParsedMeeting {
        meeting,
        diagnostics,
    })
}

pub async fn extract_meeting(
    fetcher: &dyn Fetcher,
    base: &Url,
    meeting_id: &MeetingId,
) -> Result<ParsedMeeting> {
    let html = fetch_session_page(fetcher, base, meeting_id).await?;
    parse_meeting(meeting_id, &html)
}
