use crate::error::{Result, ScrapeError};
use crate::sources::common::{descendants, find_tag_with_id, find_tags, parse_dom};
use crate::sources::rubin::table::{parse_table, resolve_row, Cell};
use crate::types::{AgendaItem, BillReference, MeetingId};
use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

pub const AGENDA_CONTAINER_ID: &str = "ajax_sitzungsmappe";
pub const AGENDA_COLUMNS: usize = 10;

const BILL_MARKER: &str = "[Vorlage: ";
const SV_BILL_MARKER: &str = "[Vorlage: SV-";

static SV_BILL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Vorlage: (?P<id>SV-(?P<year>\d{4}).(?P<number>\d{4})[^,\]]*)").unwrap()
});
static PLAIN_BILL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Vorlage: (?P<id>(?P<year>\d{4}).(?P<number>\d{4})[^,\]]*)").unwrap()
});

/// Decodes `[Vorlage: SV-2006/0123, …]` or `[Vorlage: 2006/0123, …]`.
pub fn decode_bill_reference(title_full: &str) -> Option<BillReference> {
    if !title_full.contains(BILL_MARKER) {
        return None;
    }
    let pattern = if title_full.contains(SV_BILL_MARKER) {
        &*SV_BILL_RE
    } else {
        &*PLAIN_BILL_RE
    };
    let Some(caps) = pattern.captures(title_full) else {
        tracing::debug!("[Scraper] Bill marker without a known template: {title_full}");
        return None;
    };

    Some(BillReference {
        year: caps["year"].to_string(),
        bill_number: caps["number"].to_string(),
        bill_id: caps["id"].trim().to_string(),
    })
}

/// The agenda grid is much denser than the layout tables around it.
pub fn is_agenda_table(rows: &[Vec<Cell>]) -> bool {
    let populated = rows.iter().filter(|row| !row.is_empty()).count();
    let cells: usize = rows.iter().map(Vec::len).sum();
    populated > 0 && cells > 9 * populated
}

/// Maps resolved agenda rows to items. Rows short of ten cells are skipped;
/// positions count accepted rows only.
pub fn classify_rows(meeting_id: &MeetingId, rows: Vec<Vec<String>>) -> Vec<AgendaItem> {
    let mut items = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        if row.len() < AGENDA_COLUMNS {
            if !row.is_empty() {
                let err = ScrapeError::MalformedRow {
                    row: index,
                    expected: AGENDA_COLUMNS,
                    found: row.len(),
                };
                tracing::debug!("[Scraper] {meeting_id}: skipping agenda row: {err}");
            }
            continue;
        }

        let mut cells = row.into_iter();
        let mut next = || cells.next().unwrap_or_default();
        let status = next();
        let top_number = next();
        let category = next();
        let details_link = next();
        let title_full = next();
        let document_link = next();
        let attachment_link = next();
        let decision_link = next();
        let column_9 = next();
        let column_10 = next();
        let bill = decode_bill_reference(&title_full);

        items.push(AgendaItem {
            meeting_id: meeting_id.clone(),
            position: items.len() + 1,
            status,
            top_number,
            category,
            details_link,
            title_full,
            document_link,
            attachment_link,
            decision_link,
            column_9,
            column_10,
            bill,
        });
    }
    items
}

pub fn parse_agenda(meeting_id: &MeetingId, html: &str, base: &Url) -> Result<Vec<AgendaItem>> {
    let dom = parse_dom(html)?;
    let parser = dom.parser();

    let tables = match find_tag_with_id(&dom, "div", AGENDA_CONTAINER_ID) {
        Some(container) => descendants(container, parser, "table"),
        None => find_tags(&dom, "table"),
    };

    let mut resolved = Vec::new();
    for table in tables {
        let rows = parse_table(table, parser);
        if !is_agenda_table(&rows) {
            continue;
        }
        for row in rows {
            match resolve_row(&row, base) {
                Ok(cells) => resolved.push(cells),
                Err(err) => tracing::warn!("[Scraper] {meeting_id}: unresolvable agenda row: {err}"),
            }
        }
    }

    Ok(classify_rows(meeting_id, resolved))
}
