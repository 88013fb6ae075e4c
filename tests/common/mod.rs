#![allow(dead_code)]
use async_trait::async_trait;
use chrono::NaiveDateTime;
use council_ingest::runtime::fetcher::Fetcher;
use council_ingest::runtime::types::{RecordStore, ScrapeContext};
use council_ingest::types::Record;
use reqwest::Url;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const PORTAL_BASE: &str = "http://musterstadt.more-rubin1.de/";

pub fn base() -> Url {
    Url::parse(PORTAL_BASE).unwrap()
}

pub fn fixtures_dir() -> String {
    format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR"))
}

pub fn load_fixture(filename: &str) -> String {
    let path = Path::new(&fixtures_dir()).join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

/// Search URL the session finder requests for the given result offset.
pub fn search_url(from: &str, to: &str, entry: usize) -> String {
    format!(
        "{PORTAL_BASE}recherche.php?suchbegriffe=&select_gremium=&datum_von={from}&datum_bis={to}&startsuche=Suche+starten&entry={entry}"
    )
}

pub fn session_url(sid: &str) -> String {
    format!("{PORTAL_BASE}sitzungen_top.php?sid={sid}")
}

#[derive(Clone)]
pub struct MockFetcher {
    pub fixtures: HashMap<String, String>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            fixtures: HashMap::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_fixture(&mut self, url: &str, content: &str) {
        self.fixtures.insert(url.to_string(), content.to_string());
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.fixtures
            .get(url)
            .cloned()
            .ok_or_else(|| format!("MockFetcher: No fixture for URL: {}", url))
    }
}

#[derive(Clone)]
pub struct MockRecordStore {
    pub records: Arc<Mutex<Vec<Record>>>,
    pub flushes: Arc<Mutex<usize>>,
    pub last_scrape: Option<NaiveDateTime>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            flushes: Arc::new(Mutex::new(0)),
            last_scrape: None,
        }
    }

    pub fn with_last_scrape(last_scrape: NaiveDateTime) -> Self {
        Self {
            last_scrape: Some(last_scrape),
            ..Self::new()
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn tables(&self) -> Vec<&'static str> {
        self.records().iter().map(Record::table).collect()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn insert(&self, record: Record) -> Result<(), String> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn flush(&self) -> Result<(), String> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }

    async fn last_scrape(&self) -> Result<Option<NaiveDateTime>, String> {
        Ok(self.last_scrape)
    }
}

pub fn create_test_context(fetcher: MockFetcher, store: MockRecordStore) -> ScrapeContext {
    ScrapeContext {
        base: base(),
        fetcher: Arc::new(fetcher),
        store: Box::new(store),
    }
}
