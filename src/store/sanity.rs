//! HTTP client for the Sanity query API

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{queries, ContentStore, StoreError};
use crate::config::StoreConfig;
use crate::content::{Post, SlugDoc};

/// Query API response envelope
#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

/// Content store backed by the Sanity HTTP query API
#[derive(Debug, Clone)]
pub struct SanityClient {
    base_url: String,
    api_version: String,
    dataset: String,
    token: Option<String>,
    client: Client,
}

impl SanityClient {
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_base_url(config, &config.api_host())
    }

    /// Point the client at a different API host
    pub fn with_base_url(config: &StoreConfig, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            dataset: config.dataset.clone(),
            token: config.token.clone(),
            client: Client::new(),
        }
    }

    fn query_url(&self) -> String {
        format!(
            "{}/v{}/data/query/{}",
            self.base_url, self.api_version, self.dataset
        )
    }

    /// Run a GROQ query; `params` values are bound as JSON literals
    async fn fetch<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, serde_json::Value)],
    ) -> Result<T, StoreError> {
        let mut pairs = vec![("query".to_string(), query.to_string())];
        for (name, value) in params {
            pairs.push((format!("${}", name), value.to_string()));
        }

        let mut request = self.client.get(self.query_url()).query(&pairs);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: QueryResponse<T> = serde_json::from_str(&text)?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl ContentStore for SanityClient {
    async fn post_slugs(&self) -> Result<Vec<SlugDoc>, StoreError> {
        tracing::debug!("Querying all post slugs");
        self.fetch(queries::ALL_POST_SLUGS, &[]).await
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        tracing::debug!("Querying post {:?}", slug);
        self.fetch(queries::POST_BY_SLUG, &[("slug", slug.into())])
            .await
    }
}
