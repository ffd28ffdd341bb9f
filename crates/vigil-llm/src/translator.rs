//! Article translation on top of an [`LlmBackend`].
//!
//! One request per article asks for three labeled sections; the parser
//! is a plain regex over the labels, so a malformed completion degrades
//! to "not translated yet" rather than corrupting the row.

use crate::backend::{LlmBackend, LlmRequest, Message};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{info, instrument, warn};
use vigil_common::{Priority, Result};
use vigil_db::{Article, ArticleRepository};

const TITLE_LABEL: &str = "[Translated Title]";
const ABSTRACT_LABEL: &str = "[Translated Abstract]";
const SUMMARY_LABEL: &str = "[Summary]";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[Translated Title\]\s*(.*?)\s*(?:\[Translated Abstract\]|\[Summary\]|$)")
        .unwrap()
});
static ABSTRACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[Translated Abstract\]\s*(.*?)\s*(?:\[Summary\]|$)").unwrap()
});
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[Summary\]\s*(.*)").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedArticle {
    pub title: String,
    pub abstract_text: String,
    pub summary: String,
}

pub struct Translator {
    backend: Arc<dyn LlmBackend>,
    max_tokens: u32,
    target_language: String,
}

impl Translator {
    pub fn new(backend: Arc<dyn LlmBackend>, max_tokens: u32, target_language: impl Into<String>) -> Self {
        Self { backend, max_tokens, target_language: target_language.into() }
    }

    /// Translate every article in the given priority tiers that still
    /// lacks a translation. A single failure logs and skips; the article
    /// stays in the queue for the next run.
    #[instrument(skip(self, articles))]
    pub async fn translate_pending(
        &self,
        articles: &ArticleRepository,
        tiers: &[Priority],
    ) -> Result<usize> {
        let pending = articles.pending_translation(tiers).await?;
        if pending.is_empty() {
            return Ok(0);
        }
        info!(
            pending = pending.len(),
            model = self.backend.model_id(),
            "translating priority articles"
        );

        let mut translated = 0usize;
        for article in &pending {
            match self.translate_one(article).await {
                Ok(Some(t)) => {
                    articles
                        .update_translation(article.id, &t.title, &t.abstract_text, &t.summary)
                        .await?;
                    translated += 1;
                }
                Ok(None) => {
                    warn!(id = article.id, "incomplete translation response, skipping");
                }
                Err(e) => {
                    warn!(id = article.id, error = %e, "translation failed, skipping");
                }
            }
        }
        info!(translated, total = pending.len(), "translation pass done");
        Ok(translated)
    }

    async fn translate_one(&self, article: &Article) -> Result<Option<TranslatedArticle>> {
        let Some(abstract_text) = article.abstract_text.as_deref() else {
            return Ok(None);
        };
        let prompt = self.build_prompt(&article.title, abstract_text);

        let response = self
            .backend
            .complete(LlmRequest {
                messages: vec![Message { role: "user".into(), content: prompt }],
                model: None,
                max_tokens: Some(self.max_tokens),
            })
            .await
            .map_err(|e| vigil_common::VigilError::Llm(e.to_string()))?;

        let parsed = parse_response(&response.content);
        // The translated abstract is what marks the article done; without
        // it the row would be rewritten every run, so treat that as a
        // failed call. A missing title or summary is stored empty.
        if parsed.abstract_text.is_empty() {
            return Ok(None);
        }
        Ok(Some(parsed))
    }

    fn build_prompt(&self, title: &str, abstract_text: &str) -> String {
        format!(
            "You are translating an academic journal article for a researcher. \
             Translate the title and abstract below into {lang}, then write a \
             2-3 sentence {lang} summary of the paper's core argument.\n\n\
             Title: {title}\n\n\
             Abstract: {abstract_text}\n\n\
             Respond with exactly these three sections:\n\
             {TITLE_LABEL}\n{ABSTRACT_LABEL}\n{SUMMARY_LABEL}",
            lang = self.target_language,
        )
    }
}

/// Pull the three labeled sections out of a completion. Missing sections
/// come back empty.
pub fn parse_response(text: &str) -> TranslatedArticle {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };
    TranslatedArticle {
        title: capture(&TITLE_RE),
        abstract_text: capture(&ABSTRACT_RE),
        summary: capture(&SUMMARY_RE),
    }
}
