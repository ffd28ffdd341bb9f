//! OpenAlex works API client.
//!
//! OpenAlex stores abstracts as an inverted index (word -> positions) for
//! licensing reasons; we rebuild the plain text by laying words back out
//! in position order.

use super::{AbstractProvider, EnrichCandidate, ProviderOutcome};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};
use vigil_common::Result;

const DEFAULT_BASE_URL: &str = "https://api.openalex.org";

pub struct OpenAlexClient {
    client: reqwest::Client,
    base_url: String,
    /// Contact address for OpenAlex's polite pool.
    mailto: Option<String>,
}

impl OpenAlexClient {
    pub fn new(client: reqwest::Client, mailto: Option<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            mailto,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AbstractProvider for OpenAlexClient {
    fn name(&self) -> &'static str {
        "openalex"
    }

    fn pace_delay(&self) -> Duration {
        Duration::from_millis(200)
    }

    #[instrument(skip(self, candidate), fields(id = candidate.id))]
    async fn fetch_abstract(&self, candidate: &EnrichCandidate) -> Result<ProviderOutcome> {
        let Some(doi) = candidate.doi.as_deref() else {
            return Ok(ProviderOutcome::NotFound);
        };
        let doi = normalize_doi(doi);

        let mut url = format!("{}/works/https://doi.org/{doi}", self.base_url);
        if let Some(mailto) = &self.mailto {
            url.push_str(&format!("?mailto={mailto}"));
        }

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(ProviderOutcome::NotFound),
            StatusCode::TOO_MANY_REQUESTS => return Ok(ProviderOutcome::RateLimited),
            status if !status.is_success() => {
                debug!(%status, "openalex returned error status");
                return Ok(ProviderOutcome::NotFound);
            }
            _ => {}
        }

        let body: Value = response.json().await?;
        match body.get("abstract_inverted_index") {
            Some(index) if !index.is_null() => {
                let text = reconstruct_abstract(index);
                if text.is_empty() {
                    Ok(ProviderOutcome::NotFound)
                } else {
                    Ok(ProviderOutcome::Found(text))
                }
            }
            _ => Ok(ProviderOutcome::NotFound),
        }
    }
}

/// Strip resolver prefixes so stored DOIs and full URLs both work.
pub fn normalize_doi(doi: &str) -> &str {
    let doi = doi.trim();
    for prefix in [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi:",
    ] {
        if let Some(rest) = doi.strip_prefix(prefix) {
            return rest;
        }
    }
    doi
}

/// Rebuild plain text from `{word: [positions]}`. Positions can be
/// sparse; missing slots are simply skipped.
pub fn reconstruct_abstract(index: &Value) -> String {
    let Some(map) = index.as_object() else {
        return String::new();
    };
    let mut by_position: BTreeMap<u64, &str> = BTreeMap::new();
    for (word, positions) in map {
        if let Some(positions) = positions.as_array() {
            for pos in positions.iter().filter_map(|p| p.as_u64()) {
                by_position.insert(pos, word);
            }
        }
    }
    by_position
        .values()
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reconstruct_abstract_orders_words() {
        let index = json!({
            "paper": [1],
            "This": [0],
            "governance.": [3],
            "examines": [2]
        });
        assert_eq!(
            reconstruct_abstract(&index),
            "This paper examines governance."
        );
    }

    #[test]
    fn test_reconstruct_abstract_repeated_words_and_gaps() {
        // "the" appears twice; position 2 is missing entirely.
        let index = json!({
            "the": [0, 4],
            "city": [1, 5],
            "and": [3]
        });
        assert_eq!(reconstruct_abstract(&index), "the city and the city");
    }

    #[test]
    fn test_reconstruct_abstract_non_object() {
        assert_eq!(reconstruct_abstract(&json!(null)), "");
        assert_eq!(reconstruct_abstract(&json!("text")), "");
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi("10.1234/abc"), "10.1234/abc");
        assert_eq!(normalize_doi("https://doi.org/10.1234/abc"), "10.1234/abc");
        assert_eq!(normalize_doi("doi:10.1234/abc"), "10.1234/abc");
        assert_eq!(normalize_doi("  10.1234/abc "), "10.1234/abc");
    }
}
