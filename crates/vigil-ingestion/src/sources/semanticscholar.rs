//! Semantic Scholar Graph API client.

use super::openalex::normalize_doi;
use super::{AbstractProvider, EnrichCandidate, ProviderOutcome};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use vigil_common::Result;

const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
}

impl SemanticScholarClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AbstractProvider for SemanticScholarClient {
    fn name(&self) -> &'static str {
        "semanticscholar"
    }

    // The unauthenticated tier throttles hard; stay well under it.
    fn pace_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    #[instrument(skip(self, candidate), fields(id = candidate.id))]
    async fn fetch_abstract(&self, candidate: &EnrichCandidate) -> Result<ProviderOutcome> {
        let Some(doi) = candidate.doi.as_deref() else {
            return Ok(ProviderOutcome::NotFound);
        };
        let doi = normalize_doi(doi);

        let url = format!(
            "{}/paper/DOI:{doi}?fields=title,abstract",
            self.base_url
        );
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(ProviderOutcome::NotFound),
            StatusCode::TOO_MANY_REQUESTS => return Ok(ProviderOutcome::RateLimited),
            status if !status.is_success() => {
                debug!(%status, "semantic scholar returned error status");
                return Ok(ProviderOutcome::NotFound);
            }
            _ => {}
        }

        let body: Value = response.json().await?;
        match body.get("abstract").and_then(Value::as_str) {
            Some(text) if !text.trim().is_empty() => {
                Ok(ProviderOutcome::Found(text.trim().to_string()))
            }
            _ => Ok(ProviderOutcome::NotFound),
        }
    }
}
