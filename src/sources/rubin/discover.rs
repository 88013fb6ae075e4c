use crate::error::{Result, ScrapeError};
use crate::runtime::fetcher::Fetcher;
use crate::sources::common::{attr, descendants, find_tags, parse_dom};
use crate::types::{portal_date, MeetingId, Period};
use chrono::NaiveDate;
use reqwest::Url;
use std::collections::{HashSet, VecDeque};

pub const SEARCH_PATH: &str = "recherche.php";
const ID_INPUT_NAME: &str = "sid";

/// Raw `sid` tokens on one search result page, in page order. Empty tokens
/// are kept; the caller decides what to do with them.
pub fn parse_meeting_ids(html: &str) -> Result<Vec<String>> {
    let dom = parse_dom(html)?;
    let parser = dom.parser();

    let results_table = find_tags(&dom, "table")
        .into_iter()
        .find(|table| attr(table, "width").as_deref() == Some("100%"));
    let inputs = match results_table {
        Some(table) => descendants(table, parser, "input"),
        None => find_tags(&dom, "input"),
    };

    Ok(inputs
        .into_iter()
        .filter(|input| attr(input, "name").as_deref() == Some(ID_INPUT_NAME))
        .map(|input| attr(input, "value").unwrap_or_default())
        .collect())
}

/// Pages through the search form and yields each meeting id once.
///
/// Each request asks for results starting at the number of ids already
/// collected. Discovery ends at the first page that contributes no new id,
/// which also covers portals that keep re-rendering the last page. The
/// finder is single-use: after it ends (or fails) it only yields `None`.
pub struct SessionFinder<'a> {
    fetcher: &'a dyn Fetcher,
    search_url: Url,
    from: NaiveDate,
    to: NaiveDate,
    seen: HashSet<MeetingId>,
    pending: VecDeque<MeetingId>,
    pages_fetched: usize,
    exhausted: bool,
}

impl<'a> SessionFinder<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, base: &Url, period: &Period) -> Result<Self> {
        let search_url = base.join(SEARCH_PATH).map_err(|e| ScrapeError::Url {
            url: SEARCH_PATH.to_string(),
            reason: e.to_string(),
        })?;
        let (from, to) = period.bounds()?;

        Ok(Self {
            fetcher,
            search_url,
            from,
            to,
            seen: HashSet::new(),
            pending: VecDeque::new(),
            pages_fetched: 0,
            exhausted: false,
        })
    }

    pub fn page_url(&self) -> String {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("suchbegriffe", "")
            .append_pair("select_gremium", "")
            .append_pair("datum_von", &portal_date::format(&self.from))
            .append_pair("datum_bis", &portal_date::format(&self.to))
            .append_pair("startsuche", "Suche starten")
            .append_pair("entry", &self.seen.len().to_string());
        url.to_string()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub async fn next_id(&mut self) -> Result<Option<MeetingId>> {
        while self.pending.is_empty() && !self.exhausted {
            self.fetch_next_page().await?;
        }
        Ok(self.pending.pop_front())
    }

    pub async fn collect_all(mut self) -> Result<Vec<MeetingId>> {
        let mut ids = Vec::new();
        while let Some(id) = self.next_id().await? {
            ids.push(id);
        }
        Ok(ids)
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        let url = self.page_url();
        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(err) => {
                self.exhausted = true;
                return Err(ScrapeError::Network(err));
            }
        };
        self.pages_fetched += 1;

        let tokens = match parse_meeting_ids(&html) {
            Ok(tokens) => tokens,
            Err(err) => {
                self.exhausted = true;
                return Err(err);
            }
        };

        let mut added = 0usize;
        for token in tokens {
            let Ok(id) = MeetingId::new(token) else {
                continue;
            };
            if self.seen.insert(id.clone()) {
                self.pending.push_back(id);
                added += 1;
            }
        }

        tracing::debug!(
            "[Scraper] Search page {} contributed {} new meeting ids ({} total)",
            self.pages_fetched,
            added,
            self.seen.len()
        );

        if added == 0 {
            self.exhausted = true;
        }
        Ok(())
    }
}
