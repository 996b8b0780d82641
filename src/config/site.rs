//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    /// IANA timezone name used for displayed timestamps; empty means local time
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub assets_dir: String,

    // Date / Time format (Moment.js style tokens)
    pub date_format: String,

    /// Seconds a built page is served before it becomes eligible for rebuild
    pub revalidate: u64,

    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Medium Blog".to_string(),
            language: "en".to_string(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            assets_dir: "assets".to_string(),

            date_format: "M/D/YYYY, h:mm:ss A".to_string(),

            revalidate: 60,

            store: StoreConfig::default(),
            comments: CommentsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Override store and endpoint settings from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project_id) = lookup("SANITY_PROJECT_ID") {
            self.store.project_id = project_id;
        }
        if let Some(dataset) = lookup("SANITY_DATASET") {
            self.store.dataset = dataset;
        }
        if let Some(token) = lookup("SANITY_TOKEN") {
            self.store.token = Some(token);
        }
        if let Some(endpoint) = lookup("COMMENT_ENDPOINT") {
            self.comments.endpoint = endpoint;
        }
    }

    /// Revalidation window as a duration
    pub fn revalidate_window(&self) -> Duration {
        Duration::from_secs(self.revalidate)
    }
}

/// Content store (Sanity) connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    /// Read token for private datasets
    pub token: Option<String>,
    /// Query the edge-cached API host instead of the live one
    pub use_cdn: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2021-10-21".to_string(),
            token: None,
            use_cdn: false,
        }
    }
}

impl StoreConfig {
    /// Base URL of the query API for this project
    pub fn api_host(&self) -> String {
        let host = if self.use_cdn { "apicdn" } else { "api" };
        format!("https://{}.{}.sanity.io", self.project_id, host)
    }
}

/// Comment submission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// Moderation endpoint receiving new comments
    pub endpoint: String,
    /// Request timeout; `None` leaves the transport default in place
    pub timeout_secs: Option<u64>,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/createComment".to_string(),
            timeout_secs: None,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 4000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.revalidate, 60);
        assert_eq!(config.store.dataset, "production");
        assert_eq!(config.server.port, 4000);
        assert!(config.comments.timeout_secs.is_none());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
revalidate: 30
store:
  project_id: abc123
  use_cdn: true
comments:
  endpoint: https://example.com/api/createComment
  timeout_secs: 5
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.revalidate_window(), Duration::from_secs(30));
        assert_eq!(config.store.project_id, "abc123");
        assert_eq!(config.store.dataset, "production");
        assert_eq!(config.store.api_host(), "https://abc123.apicdn.sanity.io");
        assert_eq!(config.comments.timeout_secs, Some(5));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(&path, "title: From Disk\nstore:\n  dataset: staging\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.title, "From Disk");
        assert_eq!(config.store.dataset, "staging");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SANITY_PROJECT_ID", "p1"),
            ("SANITY_TOKEN", "secret"),
            ("COMMENT_ENDPOINT", "https://moderation.test/new"),
        ]
        .into_iter()
        .collect();

        let mut config = SiteConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.project_id, "p1");
        assert_eq!(config.store.dataset, "production");
        assert_eq!(config.store.token.as_deref(), Some("secret"));
        assert_eq!(config.comments.endpoint, "https://moderation.test/new");
    }
}
