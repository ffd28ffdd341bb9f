//! The run pipeline: fetch, classify, persist, enrich, reclassify,
//! translate. Stages run strictly in order; each stage is a no-op when
//! it has no work, and a single feed's failure never aborts the run.

use crate::classify::classify;
use crate::enrich::EnrichmentChain;
use crate::feed::FeedFetcher;
use crate::models::ArticleDraft;
use crate::pacing::{Pacer, SleepPacer};
use crate::registry::FeedRegistry;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use vigil_common::{Priority, Result};
use vigil_config::Config;
use vigil_db::{Database, NewArticle};
use vigil_llm::Translator;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Look-back window for dated entries.
    pub hours: i64,
    pub max_per_feed: usize,
    pub enrich: bool,
    pub translate: bool,
    /// Ignore category filtering and fetch every registered feed.
    pub all_feeds: bool,
    /// Category filter; `None` falls back to the configured academic set.
    pub categories: Option<Vec<String>>,
    pub translate_tiers: Vec<Priority>,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hours: config.rss.fetch_hours,
            max_per_feed: config.rss.max_articles_per_feed,
            enrich: config.enrichment.enabled,
            translate: true,
            all_feeds: false,
            categories: None,
            translate_tiers: vec![Priority::High],
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub feeds: usize,
    pub feed_errors: usize,
    pub collected: usize,
    pub new: usize,
    pub high: usize,
    pub medium: usize,
    pub enriched: usize,
    pub reclassified: usize,
    pub translated: usize,
    pub duration_ms: u128,
}

pub struct Pipeline {
    config: Config,
    db: Database,
    translator: Option<Translator>,
    pacer: Arc<dyn Pacer>,
}

impl Pipeline {
    pub fn new(config: Config, db: Database, translator: Option<Translator>) -> Self {
        Self { config, db, translator, pacer: Arc::new(SleepPacer) }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// One full monitoring run.
    #[instrument(skip_all)]
    pub async fn run(&self, registry: &FeedRegistry, opts: &RunOptions) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        let selected: Vec<_> = if opts.all_feeds {
            registry.feeds().iter().collect()
        } else {
            let categories = opts
                .categories
                .clone()
                .unwrap_or_else(|| self.config.rss.academic_categories.clone());
            registry.feeds_in_categories(&categories)
        };
        summary.feeds = selected.len();
        info!(feeds = selected.len(), hours = opts.hours, "starting run");

        let cutoff = Utc::now() - ChronoDuration::hours(opts.hours);
        let fetcher = FeedFetcher::new()?;
        let delay = Duration::from_millis(self.config.rss.request_delay_ms);

        for feed in selected {
            self.pacer.wait(delay).await;
            let drafts = match fetcher.fetch(feed, Some(cutoff), opts.max_per_feed).await {
                Ok(drafts) => drafts,
                Err(e) => {
                    warn!(feed = %feed.name, error = %e, "feed failed, continuing");
                    summary.feed_errors += 1;
                    continue;
                }
            };
            summary.collected += drafts.len();
            let (new, high, medium) =
                persist_drafts(&self.db, &drafts, &self.config.keywords).await?;
            summary.new += new;
            summary.high += high;
            summary.medium += medium;
        }

        // Enrichment and reclassification work off the stored backlog,
        // not this run's haul: rows left pending by an earlier run are
        // picked up even when every feed entry today was a duplicate.
        if opts.enrich && self.config.enrichment.enabled {
            summary.enriched = self.enrich(self.config.enrichment.limit).await?;
        }
        summary.reclassified = reclassify(&self.db, &self.config.keywords, false).await?;

        if opts.translate {
            summary.translated = self.translate(&opts.translate_tiers).await?;
        }

        summary.duration_ms = started.elapsed().as_millis();
        info!(
            collected = summary.collected,
            new = summary.new,
            high = summary.high,
            medium = summary.medium,
            enriched = summary.enriched,
            reclassified = summary.reclassified,
            translated = summary.translated,
            feed_errors = summary.feed_errors,
            duration_ms = summary.duration_ms,
            "run complete"
        );
        Ok(summary)
    }

    /// Enrichment pass on its own, for the dedicated CLI verb.
    pub async fn enrich(&self, limit: usize) -> Result<usize> {
        let client = crate::feed::http_client()?;
        let chain = EnrichmentChain::standard(
            client,
            self.config.enrichment.openalex_email.clone(),
            self.config.enrichment.scrape,
            Arc::clone(&self.pacer),
        )?;
        chain.enrich_batch(&self.db.articles(), limit).await
    }

    /// Re-run the classifier over every stored article. Used after a
    /// keyword change; writes the result back even when nothing matched.
    pub async fn recheck_priority(&self) -> Result<usize> {
        reclassify(&self.db, &self.config.keywords, true).await
    }

    pub async fn translate(&self, tiers: &[Priority]) -> Result<usize> {
        let Some(translator) = &self.translator else {
            info!("no LLM backend configured, skipping translation");
            return Ok(0);
        };
        translator.translate_pending(&self.db.articles(), tiers).await
    }
}

/// Classify and store a batch of drafts. Returns `(new, high, medium)`
/// counts over the newly inserted rows only; duplicates are silent.
pub async fn persist_drafts(
    db: &Database,
    drafts: &[ArticleDraft],
    keywords: &vigil_config::KeywordConfig,
) -> Result<(usize, usize, usize)> {
    let journals = db.journals();
    let articles = db.articles();
    let (mut new, mut high, mut medium) = (0usize, 0usize, 0usize);

    for draft in drafts {
        let journal_id = journals
            .get_or_create(&draft.journal_name, &draft.feed_url, Some(&draft.category))
            .await?;
        let (priority, matched) =
            classify(&draft.title, draft.abstract_text.as_deref(), keywords);

        let inserted = articles
            .insert(&NewArticle {
                journal_id,
                title: draft.title.clone(),
                authors: draft.authors.clone(),
                abstract_text: draft.abstract_text.clone(),
                url: draft.url.clone(),
                doi: draft.doi.clone(),
                published_at: draft.published_at,
                priority,
                matched_keywords: Some(matched),
            })
            .await?;

        if inserted.is_some() {
            new += 1;
            match priority {
                Priority::High => high += 1,
                Priority::Medium => medium += 1,
                Priority::Normal => {}
            }
        }
    }
    Ok((new, high, medium))
}

/// Re-run classification. In the normal post-enrichment pass
/// (`force = false`) only articles with no recorded match are scanned
/// and only non-empty results are written back; with `force = true`
/// every article is rescanned and the result always written.
pub async fn reclassify(
    db: &Database,
    keywords: &vigil_config::KeywordConfig,
    force: bool,
) -> Result<usize> {
    let articles = db.articles();
    let candidates = if force {
        articles.all().await?
    } else {
        articles.needs_reclassify().await?
    };

    let mut updated = 0usize;
    for article in &candidates {
        let (priority, matched) =
            classify(&article.title, article.abstract_text.as_deref(), keywords);
        if matched.is_empty() && !force {
            continue;
        }
        if force || priority != article.priority {
            articles.update_priority(article.id, priority, &matched).await?;
            updated += 1;
        } else if article.matched_keywords.as_deref() != Some(&matched[..]) {
            articles.update_priority(article.id, priority, &matched).await?;
            updated += 1;
        }
    }
    Ok(updated)
}
