use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("council-ingest/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the decoded body; non-2xx statuses are errors.
    async fn fetch(&self, url: &str) -> Result<String, String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client tuned for the portal: identifying user agent and a per-request
    /// timeout, since the core itself never times out.
    pub fn for_portal() -> Result<Self, String> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, String> {
        tracing::debug!("[Scraper] GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Network error fetching {url}: {e}"))?;

        if !response.status().is_success() {
            return Err(format!(
                "HTTP error {} fetching {url}",
                response.status().as_u16()
            ));
        }

        // Honors the charset in Content-Type; the portal serves ISO-8859-1.
        response
            .text()
            .await
            .map_err(|e| format!("Error reading response body from {url}: {e}"))
    }
}
