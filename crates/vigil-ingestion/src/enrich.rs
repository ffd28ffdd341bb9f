//! Abstract enrichment chain.
//!
//! Walks the articles that still lack a usable abstract and asks each
//! provider in turn. The first acceptable answer wins; one article's
//! failure never aborts the batch.

use crate::pacing::Pacer;
use crate::sources::{AbstractProvider, EnrichCandidate, ProviderOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vigil_common::{Result, MIN_ABSTRACT_LEN};
use vigil_db::ArticleRepository;

// Back-off after a provider reports throttling.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

pub struct EnrichmentChain {
    providers: Vec<Box<dyn AbstractProvider>>,
    pacer: Arc<dyn Pacer>,
}

impl EnrichmentChain {
    pub fn new(providers: Vec<Box<dyn AbstractProvider>>, pacer: Arc<dyn Pacer>) -> Self {
        Self { providers, pacer }
    }

    /// The default provider order: OpenAlex first (fast, generous),
    /// Semantic Scholar second, the landing-page scraper last when
    /// compiled in and enabled.
    pub fn standard(
        client: reqwest::Client,
        openalex_mailto: Option<String>,
        scrape: bool,
        pacer: Arc<dyn Pacer>,
    ) -> Result<Self> {
        let mut providers: Vec<Box<dyn AbstractProvider>> = vec![
            Box::new(crate::sources::openalex::OpenAlexClient::new(
                client.clone(),
                openalex_mailto,
            )),
            Box::new(crate::sources::semanticscholar::SemanticScholarClient::new(client)),
        ];
        #[cfg(feature = "scrape")]
        if scrape {
            providers.push(Box::new(crate::sources::publisher::PublisherScraper::new()?));
        }
        #[cfg(not(feature = "scrape"))]
        let _ = scrape;
        Ok(Self::new(providers, pacer))
    }

    /// Enrich up to `limit` articles; returns how many got an abstract.
    pub async fn enrich_batch(&self, articles: &ArticleRepository, limit: usize) -> Result<usize> {
        let pending = articles.missing_abstract(limit).await?;
        if pending.is_empty() {
            return Ok(0);
        }
        info!(candidates = pending.len(), "enriching abstracts");

        let mut enriched = 0usize;
        for article in &pending {
            let candidate = EnrichCandidate {
                id: article.id,
                title: article.title.clone(),
                doi: article.doi.clone(),
                url: article.url.clone(),
            };
            if let Some(text) = self.enrich_one(&candidate).await {
                articles.update_abstract(article.id, &text).await?;
                enriched += 1;
            }
        }
        info!(enriched, total = pending.len(), "enrichment pass done");
        Ok(enriched)
    }

    async fn enrich_one(&self, candidate: &EnrichCandidate) -> Option<String> {
        for provider in &self.providers {
            self.pacer.wait(provider.pace_delay()).await;
            match provider.fetch_abstract(candidate).await {
                Ok(ProviderOutcome::Found(text))
                    if text.chars().count() >= MIN_ABSTRACT_LEN =>
                {
                    debug!(id = candidate.id, provider = provider.name(), "abstract found");
                    return Some(text);
                }
                Ok(ProviderOutcome::Found(_)) => {
                    debug!(
                        id = candidate.id,
                        provider = provider.name(),
                        "abstract too short, trying next provider"
                    );
                }
                Ok(ProviderOutcome::NotFound) => {}
                Ok(ProviderOutcome::RateLimited) => {
                    warn!(provider = provider.name(), "rate limited, backing off");
                    self.pacer.wait(RATE_LIMIT_BACKOFF).await;
                }
                Err(e) => {
                    warn!(
                        id = candidate.id,
                        provider = provider.name(),
                        error = %e,
                        "provider lookup failed"
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::NoopPacer;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use vigil_common::Priority;
    use vigil_db::{Database, NewArticle};

    struct StubProvider {
        name: &'static str,
        outcome: ProviderOutcome,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl AbstractProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }
        fn pace_delay(&self) -> Duration {
            Duration::from_millis(1)
        }
        async fn fetch_abstract(&self, _c: &EnrichCandidate) -> Result<ProviderOutcome> {
            self.calls.lock().unwrap().push(self.name);
            Ok(self.outcome.clone())
        }
    }

    fn stub(
        name: &'static str,
        outcome: ProviderOutcome,
        calls: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Box<dyn AbstractProvider> {
        Box::new(StubProvider { name, outcome, calls: Arc::clone(calls) })
    }

    async fn seed_article(db: &Database) -> i64 {
        let journal_id = db
            .journals()
            .get_or_create("Antipode", "https://example.org/feed", None)
            .await
            .unwrap();
        db.articles()
            .insert(&NewArticle {
                journal_id,
                title: "Territory as method".into(),
                authors: None,
                abstract_text: None,
                url: "https://example.org/1".into(),
                doi: Some("10.1111/anti.1".into()),
                published_at: None,
                priority: Priority::Normal,
                matched_keywords: None,
            })
            .await
            .unwrap()
            .unwrap()
    }

    fn long_abstract() -> String {
        "A full-length abstract that comfortably clears the usable minimum \
         by discussing territory, method, and the politics of measurement."
            .to_string()
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let db = Database::open_in_memory().await.unwrap();
        let id = seed_article(&db).await;
        let calls = Arc::new(Mutex::new(Vec::new()));

        let chain = EnrichmentChain::new(
            vec![
                stub("first", ProviderOutcome::Found(long_abstract()), &calls),
                stub("second", ProviderOutcome::Found("unused".into()), &calls),
            ],
            Arc::new(NoopPacer::default()),
        );

        let enriched = chain.enrich_batch(&db.articles(), 10).await.unwrap();
        assert_eq!(enriched, 1);
        assert_eq!(*calls.lock().unwrap(), vec!["first"]);

        let article = db.articles().find_by_id(id).await.unwrap().unwrap();
        assert!(article.has_usable_abstract());
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let db = Database::open_in_memory().await.unwrap();
        seed_article(&db).await;
        let calls = Arc::new(Mutex::new(Vec::new()));

        let chain = EnrichmentChain::new(
            vec![
                stub("miss", ProviderOutcome::NotFound, &calls),
                stub("short", ProviderOutcome::Found("too short".into()), &calls),
                stub("hit", ProviderOutcome::Found(long_abstract()), &calls),
            ],
            Arc::new(NoopPacer::default()),
        );

        let enriched = chain.enrich_batch(&db.articles(), 10).await.unwrap();
        assert_eq!(enriched, 1);
        assert_eq!(*calls.lock().unwrap(), vec!["miss", "short", "hit"]);
    }

    #[tokio::test]
    async fn test_rate_limit_backs_off_and_continues() {
        let db = Database::open_in_memory().await.unwrap();
        seed_article(&db).await;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pacer = Arc::new(NoopPacer::default());

        let chain = EnrichmentChain::new(
            vec![
                stub("limited", ProviderOutcome::RateLimited, &calls),
                stub("hit", ProviderOutcome::Found(long_abstract()), &calls),
            ],
            Arc::clone(&pacer) as Arc<dyn Pacer>,
        );

        let enriched = chain.enrich_batch(&db.articles(), 10).await.unwrap();
        assert_eq!(enriched, 1);
        assert_eq!(*calls.lock().unwrap(), vec!["limited", "hit"]);
        assert!(pacer.recorded().contains(&RATE_LIMIT_BACKOFF));
    }

    #[tokio::test]
    async fn test_all_providers_miss_leaves_article_pending() {
        let db = Database::open_in_memory().await.unwrap();
        let id = seed_article(&db).await;
        let calls = Arc::new(Mutex::new(Vec::new()));

        let chain = EnrichmentChain::new(
            vec![stub("miss", ProviderOutcome::NotFound, &calls)],
            Arc::new(NoopPacer::default()),
        );

        let enriched = chain.enrich_batch(&db.articles(), 10).await.unwrap();
        assert_eq!(enriched, 0);
        let article = db.articles().find_by_id(id).await.unwrap().unwrap();
        assert!(!article.has_usable_abstract());
        // Still in the queue for the next run.
        assert_eq!(db.articles().missing_abstract(10).await.unwrap().len(), 1);
    }
}
