use crate::runtime::fetcher::Fetcher;
use crate::types::Record;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Url;
use std::sync::Arc;

/// Append-only sink for extracted records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: Record) -> Result<(), String>;
    async fn flush(&self) -> Result<(), String>;
    /// Timestamp of the most recent recorded scrape run, if any.
    async fn last_scrape(&self) -> Result<Option<NaiveDateTime>, String>;
}

pub struct ScrapeContext {
    pub base: Url,
    pub fetcher: Arc<dyn Fetcher>,
    pub store: Box<dyn RecordStore>,
}
