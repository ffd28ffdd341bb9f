//! Abstract providers.
//!
//! Each source knows how to turn a DOI (or landing URL) into an abstract.
//! The enrichment chain tries them in a fixed order; the trait keeps the
//! chain ignorant of any one API's shape.

pub mod openalex;
#[cfg(feature = "scrape")]
pub mod publisher;
pub mod semanticscholar;

use async_trait::async_trait;
use std::time::Duration;
use vigil_common::Result;

/// What a provider lookup produced. `RateLimited` is distinct from an
/// error: the chain backs off and moves on instead of logging a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Found(String),
    NotFound,
    RateLimited,
}

/// The slice of an article a provider needs for its lookup.
#[derive(Debug, Clone)]
pub struct EnrichCandidate {
    pub id: i64,
    pub title: String,
    pub doi: Option<String>,
    pub url: String,
}

#[async_trait]
pub trait AbstractProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Minimum gap between consecutive requests to this provider.
    fn pace_delay(&self) -> Duration;

    async fn fetch_abstract(&self, candidate: &EnrichCandidate) -> Result<ProviderOutcome>;
}
