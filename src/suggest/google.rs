use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{BookCatalog, CatalogQuery, VolumeList};

pub const GOOGLE_BOOKS_URL: &str = "https://www.googleapis.com/books/v1/volumes";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Volume search against the public Google Books API.
pub struct GoogleBooksCatalog {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleBooksCatalog {
    pub fn new() -> Self {
        Self::with_endpoint(GOOGLE_BOOKS_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn request(&self, query: &CatalogQuery) -> reqwest::Result<reqwest::Request> {
        let mut params = vec![
            ("q", query.q()),
            ("maxResults", query.max_results.to_string()),
        ];
        if let Some(lang) = query.lang_restrict.as_deref().filter(|lang| !lang.is_empty()) {
            params.push(("langRestrict", lang.to_string()));
        }
        self.client.get(&self.endpoint).query(&params).build()
    }
}

impl Default for GoogleBooksCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookCatalog for GoogleBooksCatalog {
    async fn search(&self, query: &CatalogQuery) -> Result<VolumeList> {
        let request = self
            .request(query)
            .with_context(|| format!("failed to build catalog request for '{}'", query.q()))?;
        let response = self
            .client
            .execute(request)
            .await
            .context("catalog request failed")?
            .error_for_status()
            .context("catalog returned an error status")?;

        response
            .json::<VolumeList>()
            .await
            .context("failed to parse catalog payload")
    }
}
