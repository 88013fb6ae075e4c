use crate::types::ScrapeSummary;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

pub async fn callback_fetch(
    client: &Client,
    callback_base: &str,
    callback_token: &str,
    path: &str,
    method: reqwest::Method,
    body: Option<serde_json::Value>,
) -> Result<reqwest::Response, String> {
    let url = format!("{callback_base}{path}");
    let mut builder = client
        .request(method, &url)
        .header("Authorization", format!("Bearer {callback_token}"));

    if let Some(json_body) = body {
        builder = builder.json(&json_body);
    }

    builder
        .send()
        .await
        .map_err(|e| format!("Request to {url} failed: {e}"))
}

async fn expect_success(res: reqwest::Response, what: &str) -> Result<reqwest::Response, String> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    Err(format!("{what} callback failed: {status} {text}"))
}

pub(crate) async fn post_debug_log(
    client: &Client,
    callback_base: &str,
    callback_token: &str,
    level: &str,
    message: &str,
    context: Option<serde_json::Value>,
) {
    let body = serde_json::json!({
        "level": level,
        "message": message,
        "context": context,
    });

    let result = callback_fetch(
        client,
        callback_base,
        callback_token,
        "/api/callback/containerLog",
        reqwest::Method::POST,
        Some(body),
    )
    .await;
    if let Err(err) = result {
        eprintln!(
            "[Scraper][stderr] post_debug_log failed: level={} message={} err={}",
            level, message, err
        );
    }
}

pub async fn post_record_batch(
    client: &Client,
    callback_base: &str,
    callback_token: &str,
    table: &str,
    conflict_columns: &[&str],
    records: &[serde_json::Value],
) -> Result<(), String> {
    let res = callback_fetch(
        client,
        callback_base,
        callback_token,
        "/api/callback/insertRecords",
        reqwest::Method::POST,
        Some(serde_json::json!({
            "table": table,
            "conflictColumns": conflict_columns,
            "records": records,
        })),
    )
    .await?;

    expect_success(res, "Insert records").await?;
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastScrapeResponse {
    scraped_at: Option<NaiveDateTime>,
}

pub async fn fetch_last_scrape(
    client: &Client,
    callback_base: &str,
    callback_token: &str,
) -> Result<Option<NaiveDateTime>, String> {
    let res = callback_fetch(
        client,
        callback_base,
        callback_token,
        "/api/callback/lastScrape",
        reqwest::Method::GET,
        None,
    )
    .await?;

    let res = expect_success(res, "Last scrape").await?;
    let body: LastScrapeResponse = res
        .json()
        .await
        .map_err(|e| format!("Failed to parse last scrape response: {e}"))?;
    Ok(body.scraped_at)
}

pub async fn post_scrape_complete(
    client: &Client,
    callback_base: &str,
    callback_token: &str,
    summary: &ScrapeSummary,
) -> Result<(), String> {
    let res = callback_fetch(
        client,
        callback_base,
        callback_token,
        "/api/callback/scrapeComplete",
        reqwest::Method::POST,
        Some(serde_json::json!({ "summary": summary })),
    )
    .await?;

    expect_success(res, "Scrape complete").await?;
    Ok(())
}

pub async fn post_scrape_error(client: &Client, callback_base: &str, callback_token: &str, error: &str) {
    let result = callback_fetch(
        client,
        callback_base,
        callback_token,
        "/api/callback/scrapeError",
        reqwest::Method::POST,
        Some(serde_json::json!({ "error": error })),
    )
    .await;
    if let Err(err) = result {
        tracing::error!("[Scraper] Failed to report scrape error: {err}");
    }
}
