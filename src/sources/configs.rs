use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Hosted portals follow `http://<key>.more-rubin1.de/`.
const HOSTED_PORTAL_TEMPLATE: &str = "http://{key}.more-rubin1.de/";
const PORTALS_FILE: &str = "portals.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub name: String,
    pub municipality: String,
    pub base_url: String,
}

impl PortalConfig {
    /// Parsed base URL with a trailing slash, so relative form actions
    /// resolve under it.
    pub fn base_url(&self) -> Result<Url, String> {
        parse_base_url(&self.base_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalsConfig {
    pub portals: HashMap<String, PortalConfig>,
}

impl PortalsConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read portals.json: {e}"))?;
        let config: PortalsConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse portals.json: {e}"))?;
        Ok(config)
    }

    /// Reads `portals.json` from `$CONFIGS_PATH`, or the working directory.
    pub fn load_default() -> Result<Self, String> {
        let dir = std::env::var("CONFIGS_PATH").unwrap_or_else(|_| ".".to_string());
        Self::load_from_file(Path::new(&dir).join(PORTALS_FILE))
    }

    pub fn get_base_url(&self, key: &str) -> Option<&str> {
        self.portals.get(key).map(|p| p.base_url.as_str())
    }

    /// Registered portals win over the hosted-portal naming scheme.
    pub fn resolve(&self, portal: &str) -> Result<Url, String> {
        match self.portals.get(portal.trim()) {
            Some(config) => config.base_url(),
            None => resolve_portal(portal),
        }
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|e| format!("Invalid portal base URL `{raw}`: {e}"))
}

/// Accepts a full base URL or a bare hosted-portal key such as `darmstadt`.
pub fn resolve_portal(portal: &str) -> Result<Url, String> {
    let portal = portal.trim();
    if portal.contains("://") {
        return parse_base_url(portal);
    }
    if portal.is_empty() || !portal.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!("Invalid portal key `{portal}`"));
    }
    parse_base_url(&HOSTED_PORTAL_TEMPLATE.replace("{key}", portal))
}
