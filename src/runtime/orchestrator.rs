use crate::ingest::scrape_portal;
use crate::runtime::callbacks::{fetch_last_scrape, post_record_batch, post_scrape_complete};
use crate::runtime::fetcher::HttpFetcher;
use crate::runtime::logging::RunLog;
use crate::runtime::types::{RecordStore, ScrapeContext};
use crate::sources::configs::{resolve_portal, PortalsConfig};
use crate::types::{Record, ScrapeConfig, ScrapeSummary};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const BATCH_SIZE: usize = 200;

#[derive(Default)]
struct PendingRows {
    conflict_columns: &'static [&'static str],
    rows: Vec<serde_json::Value>,
}

/// Buffers rows per table and posts them to the callback API in batches.
pub struct HttpRecordStore {
    client: Client,
    callback_base: String,
    callback_token: String,
    buffers: Mutex<BTreeMap<&'static str, PendingRows>>,
}

impl HttpRecordStore {
    pub fn new(client: Client, callback_base: &str, callback_token: &str) -> Self {
        Self {
            client,
            callback_base: callback_base.trim_end_matches('/').to_string(),
            callback_token: callback_token.to_string(),
            buffers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Posts one table's rows. On failure the rows go back to the front of
    /// the buffer so a later flush retries them.
    async fn send(&self, table: &'static str, batch: PendingRows) -> Result<(), String> {
        let posted = post_record_batch(
            &self.client,
            &self.callback_base,
            &self.callback_token,
            table,
            batch.conflict_columns,
            &batch.rows,
        )
        .await;

        if let Err(err) = posted {
            let mut buffers = self.buffers.lock().map_err(|e| e.to_string())?;
            let pending = buffers.entry(table).or_default();
            let mut rows = batch.rows;
            rows.append(&mut pending.rows);
            pending.rows = rows;
            pending.conflict_columns = batch.conflict_columns;
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn insert(&self, record: Record) -> Result<(), String> {
        let table = record.table();
        let row = record
            .to_row()
            .map_err(|e| format!("Failed to serialize {table} row: {e}"))?;

        let batch = {
            let mut buffers = self.buffers.lock().map_err(|e| e.to_string())?;
            let pending = buffers.entry(table).or_default();
            pending.conflict_columns = record.conflict_columns();
            pending.rows.push(row);
            if pending.rows.len() >= BATCH_SIZE {
                Some(std::mem::take(pending))
            } else {
                None
            }
        };

        match batch {
            Some(batch) => self.send(table, batch).await,
            None => Ok(()),
        }
    }

    /// Sends every buffered table; a failing table does not stop the others.
    async fn flush(&self) -> Result<(), String> {
        let pending: Vec<(&'static str, PendingRows)> = {
            let mut buffers = self.buffers.lock().map_err(|e| e.to_string())?;
            std::mem::take(&mut *buffers)
                .into_iter()
                .filter(|(_, pending)| !pending.rows.is_empty())
                .collect()
        };

        let mut first_error = None;
        for (table, batch) in pending {
            if let Err(err) = self.send(table, batch).await {
                tracing::error!("[Scraper] Posting {table} rows failed: {err}");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn last_scrape(&self) -> Result<Option<NaiveDateTime>, String> {
        fetch_last_scrape(&self.client, &self.callback_base, &self.callback_token).await
    }
}

/// Runs one scrape job end to end and reports the summary to the callback API.
pub async fn run_scrape(config: ScrapeConfig) -> Result<ScrapeSummary, String> {
    let config = config.normalized();
    let client = Client::new();
    let log = RunLog::new(client.clone(), &config);

    let base = match PortalsConfig::load_default() {
        Ok(portals) => portals.resolve(&config.portal)?,
        Err(err) => {
            tracing::debug!("[Scraper] No portal registry ({err}), using portal as given");
            resolve_portal(&config.portal)?
        }
    };

    log.info(
        &format!("Starting scrape of {} for {}", base, config.period.label()),
        Some(serde_json::json!({ "force": config.force })),
    )
    .await;

    let context = ScrapeContext {
        base,
        fetcher: Arc::new(HttpFetcher::for_portal()?),
        store: Box::new(HttpRecordStore::new(
            client.clone(),
            &config.callback_base,
            &config.callback_token,
        )),
    };

    let summary = match scrape_portal(&context, &config.period, config.force).await {
        Ok(summary) => summary,
        Err(err) => {
            log.error(&format!("Scrape aborted: {err}"), None).await;
            return Err(err.to_string());
        }
    };

    if summary.failed_meetings > 0 {
        log.warn(
            &format!("{} meetings could not be scraped", summary.failed_meetings),
            None,
        )
        .await;
    }

    post_scrape_complete(&client, &config.callback_base, &config.callback_token, &summary)
        .await?;
    Ok(summary)
}
