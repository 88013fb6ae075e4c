use crate::error::{Result, ScrapeError};
use crate::runtime::types::{RecordStore, ScrapeContext};
use crate::sources::rubin::agenda::parse_agenda;
use crate::sources::rubin::attachments::resolve_attachments;
use crate::sources::rubin::changes::has_portal_changed;
use crate::sources::rubin::discover::SessionFinder;
use crate::sources::rubin::meeting::{fetch_session_page, parse_meeting};
use crate::types::{
    AgendaItem, AttachmentOutcome, Meeting, MeetingId, Period, Record, RunStatus, ScrapeMarker,
    ScrapeSummary,
};

/// Everything extracted for one meeting, gathered before anything is stored
/// so a failing page never leaves half a meeting behind.
#[derive(Debug)]
pub struct MeetingRecords {
    pub meeting: Meeting,
    pub agenda: Vec<AgendaItem>,
    pub attachments: Vec<AttachmentOutcome>,
}

pub async fn scrape_meeting(context: &ScrapeContext, meeting_id: &MeetingId) -> Result<MeetingRecords> {
    let fetcher = context.fetcher.as_ref();
    let html = fetch_session_page(fetcher, &context.base, meeting_id).await?;

    let parsed = parse_meeting(meeting_id, &html)?;
    let agenda = parse_agenda(meeting_id, &html, &context.base)?;

    let mut attachments = Vec::new();
    for item in agenda.iter().filter(|item| item.has_attachment_listing()) {
        let outcome = resolve_attachments(
            fetcher,
            &context.base,
            meeting_id,
            &item.key(),
            item.attachment_link.trim(),
        )
        .await?;
        attachments.push(outcome);
    }

    Ok(MeetingRecords {
        meeting: parsed.meeting,
        agenda,
        attachments,
    })
}

async fn insert(store: &dyn RecordStore, record: Record) -> Result<()> {
    store.insert(record).await.map_err(ScrapeError::Store)
}

async fn store_meeting(
    store: &dyn RecordStore,
    records: MeetingRecords,
    summary: &mut ScrapeSummary,
) -> Result<()> {
    insert(store, Record::Meeting(records.meeting)).await?;
    summary.meetings += 1;

    for item in records.agenda {
        insert(store, Record::AgendaItem(item)).await?;
        summary.agenda_items += 1;
    }

    for outcome in records.attachments {
        match outcome {
            AttachmentOutcome::Unavailable(missing) => {
                insert(store, Record::AttachmentUnavailable(missing)).await?;
                summary.unavailable_attachments += 1;
            }
            AttachmentOutcome::Resolved(found) => {
                for attachment in found {
                    insert(store, Record::Attachment(attachment)).await?;
                    summary.attachments += 1;
                }
            }
        }
    }
    Ok(())
}

async fn scrape_discovered(
    context: &ScrapeContext,
    period: &Period,
    summary: &mut ScrapeSummary,
) -> Result<usize> {
    let store = context.store.as_ref();
    insert(
        store,
        Record::ScrapeMarker(ScrapeMarker {
            scraped_at: chrono::Local::now().naive_local(),
        }),
    )
    .await?;

    let mut finder = SessionFinder::new(context.fetcher.as_ref(), &context.base, period)?;
    while let Some(meeting_id) = finder.next_id().await? {
        match scrape_meeting(context, &meeting_id).await {
            Ok(records) => store_meeting(store, records, summary).await?,
            Err(err) => {
                tracing::error!("[Scraper] Meeting {meeting_id} failed: {err}");
                summary.failed_meetings += 1;
            }
        }
    }
    Ok(finder.pages_fetched())
}

/// One scrape run: change check, run marker, then every meeting of the
/// period. A meeting whose pages fail is logged and counted; discovery and
/// store failures end the run. Whatever was stored before the run ended is
/// flushed either way.
pub async fn scrape_portal(
    context: &ScrapeContext,
    period: &Period,
    force: bool,
) -> Result<ScrapeSummary> {
    let store = context.store.as_ref();

    let last_scrape = store.last_scrape().await.map_err(ScrapeError::Store)?;
    let changed = match has_portal_changed(context.fetcher.as_ref(), &context.base, last_scrape).await {
        Ok(changed) => changed,
        Err(err) if force => {
            tracing::warn!("[Scraper] Change check failed, scraping anyway: {err}");
            true
        }
        Err(err) => return Err(err),
    };

    let mut summary = ScrapeSummary {
        changed,
        ..ScrapeSummary::default()
    };
    if !changed && !force {
        tracing::info!("[Scraper] Portal unchanged since last scrape, nothing to do");
        summary.status = RunStatus::Unchanged;
        return Ok(summary);
    }

    tracing::info!("[Scraper] Scraping {} for {}", context.base, period.label());

    let outcome = scrape_discovered(context, period, &mut summary).await;
    let flushed = store.flush().await.map_err(ScrapeError::Store);
    let pages = match (outcome, flushed) {
        (Ok(pages), Ok(())) => pages,
        (Err(err), flushed) => {
            if let Err(flush_err) = flushed {
                tracing::error!("[Scraper] Flush after failed run also failed: {flush_err}");
            }
            return Err(err);
        }
        (Ok(_), Err(err)) => return Err(err),
    };

    tracing::info!(
        "[Scraper] Done: {} meetings, {} agenda items, {} attachments ({} unavailable), {} failed, {} search pages",
        summary.meetings,
        summary.agenda_items,
        summary.attachments,
        summary.unavailable_attachments,
        summary.failed_meetings,
        pages
    );
    Ok(summary)
}
