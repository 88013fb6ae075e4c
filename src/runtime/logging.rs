use crate::runtime::callbacks::post_debug_log;
use crate::types::ScrapeConfig;
use reqwest::{Client, Url};
use serde_json::Value;
use std::net::IpAddr;
use tracing::Level;

/// Callback hosts that run next to a developer's machine. Only these get
/// log events mirrored.
pub fn is_dev_callback(callback_base: &str) -> bool {
    let Ok(url) = Url::parse(callback_base) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback(),
        Err(_) => host == "localhost" || host == "host.docker.internal",
    }
}

/// Log sink for one scrape job. Every event carries the portal it belongs to.
pub struct RunLog {
    client: Client,
    portal: String,
    callback: Option<(String, String)>,
}

impl RunLog {
    pub fn new(client: Client, config: &ScrapeConfig) -> Self {
        let callback = is_dev_callback(&config.callback_base)
            .then(|| (config.callback_base.clone(), config.callback_token.clone()));
        Self {
            client,
            portal: config.portal.clone(),
            callback,
        }
    }

    pub fn mirrors(&self) -> bool {
        self.callback.is_some()
    }

    pub async fn info(&self, message: &str, context: Option<Value>) {
        self.emit(Level::INFO, message, context).await;
    }

    pub async fn warn(&self, message: &str, context: Option<Value>) {
        self.emit(Level::WARN, message, context).await;
    }

    pub async fn error(&self, message: &str, context: Option<Value>) {
        self.emit(Level::ERROR, message, context).await;
    }

    async fn emit(&self, level: Level, message: &str, context: Option<Value>) {
        let portal = self.portal.as_str();
        let name = if level == Level::ERROR {
            tracing::error!(portal, "[Scraper] {message}");
            "error"
        } else if level == Level::WARN {
            tracing::warn!(portal, "[Scraper] {message}");
            "warn"
        } else {
            tracing::info!(portal, "[Scraper] {message}");
            "info"
        };

        if let Some((base, token)) = &self.callback {
            post_debug_log(&self.client, base, token, name, message, context).await;
        }
    }
}
