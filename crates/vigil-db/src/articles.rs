//! Article repository.
//!
//! Insert-with-dedup plus the eligibility queries the pipeline stages run
//! on: missing-abstract (enrichment), unscanned-with-abstract
//! (reclassification), and untranslated-priority (translation gate).

use crate::schema::{identity_hash, Article, ArticleRow, NewArticle};
use sqlx::sqlite::SqlitePool;
use tracing::debug;
use vigil_common::{Priority, Result, MIN_ABSTRACT_LEN};

const SELECT_COLUMNS: &str = "id, journal_id, title, title_translated, authors, \
     abstract, abstract_translated, summary_translated, url, doi, \
     published_at, fetched_at, identity_hash, priority, is_read, is_starred, \
     matched_keywords";

#[derive(Clone)]
pub struct ArticleRepository {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_articles: i64,
    pub high_priority: i64,
    pub articles_24h: i64,
    pub articles_7d: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AbstractStats {
    pub total: i64,
    pub with_abstract: i64,
    pub without_abstract: i64,
    pub with_doi: i64,
    /// Missing an abstract but carrying a DOI — the enrichment chain's input.
    pub enrichable: i64,
}

impl ArticleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an article, deduplicating on the `(title, url)` identity
    /// hash. Returns `None` when a row with the same hash already exists;
    /// that no-op is the idempotence boundary for repeated runs.
    pub async fn insert(&self, article: &NewArticle) -> Result<Option<i64>> {
        let hash = identity_hash(&article.title, &article.url);

        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM articles WHERE identity_hash = ?")
                .bind(&hash)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_some() {
            debug!(title = %article.title, "duplicate article, skipping");
            return Ok(None);
        }

        let keywords_json = match &article.matched_keywords {
            Some(list) => Some(serde_json::to_string(list)?),
            None => None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO articles (
                journal_id, title, authors, abstract, url, doi,
                published_at, identity_hash, priority, matched_keywords
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article.journal_id)
        .bind(&article.title)
        .bind(&article.authors)
        .bind(&article.abstract_text)
        .bind(&article.url)
        .bind(&article.doi)
        .bind(article.published_at)
        .bind(&hash)
        .bind(article.priority.as_str())
        .bind(keywords_json)
        .execute(&self.pool)
        .await?;

        Ok(Some(result.last_insert_rowid()))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM articles WHERE id = ?");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Article::from))
    }

    pub async fn find_by_hash(&self, hash: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM articles WHERE identity_hash = ?");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Article::from))
    }

    pub async fn all(&self) -> Result<Vec<Article>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM articles ORDER BY id");
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Articles whose abstract is missing or under the usable minimum and
    /// that carry a DOI — the enrichment chain's work queue.
    pub async fn missing_abstract(&self, limit: usize) -> Result<Vec<Article>> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM articles
            WHERE doi IS NOT NULL AND doi != ''
              AND (abstract IS NULL OR LENGTH(abstract) < ?)
            ORDER BY fetched_at DESC
            LIMIT ?
            "#
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(MIN_ABSTRACT_LEN as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Articles with a usable abstract that have never had a keyword scan
    /// record a match (`matched_keywords` NULL or the empty list).
    pub async fn needs_reclassify(&self) -> Result<Vec<Article>> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM articles
            WHERE abstract IS NOT NULL AND LENGTH(abstract) >= ?
              AND (matched_keywords IS NULL OR matched_keywords = '[]')
            "#
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(MIN_ABSTRACT_LEN as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Articles in the given priority tiers with a usable abstract and no
    /// translated abstract yet — the translation gate's work queue. The
    /// translated abstract is the completeness marker: a response missing
    /// only its summary section still counts as translated.
    pub async fn pending_translation(&self, tiers: &[Priority]) -> Result<Vec<Article>> {
        if tiers.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; tiers.len()].join(",");
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM articles
            WHERE priority IN ({placeholders})
              AND abstract IS NOT NULL AND LENGTH(abstract) >= ?
              AND (abstract_translated IS NULL OR abstract_translated = '')
            "#
        );
        let mut query = sqlx::query_as::<_, ArticleRow>(&sql);
        for tier in tiers {
            query = query.bind(tier.as_str());
        }
        query = query.bind(MIN_ABSTRACT_LEN as i64);
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    pub async fn update_abstract(&self, id: i64, abstract_text: &str) -> Result<()> {
        sqlx::query("UPDATE articles SET abstract = ? WHERE id = ?")
            .bind(abstract_text)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_priority(
        &self,
        id: i64,
        priority: Priority,
        matched_keywords: &[String],
    ) -> Result<()> {
        let keywords_json = serde_json::to_string(matched_keywords)?;
        sqlx::query("UPDATE articles SET priority = ?, matched_keywords = ? WHERE id = ?")
            .bind(priority.as_str())
            .bind(keywords_json)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_translation(
        &self,
        id: i64,
        title_translated: &str,
        abstract_translated: &str,
        summary_translated: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE articles
            SET title_translated = ?, abstract_translated = ?, summary_translated = ?
            WHERE id = ?
            "#,
        )
        .bind(title_translated)
        .bind(abstract_translated)
        .bind(summary_translated)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let total_articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        let high_priority: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE priority = 'high'")
                .fetch_one(&self.pool)
                .await?;
        let articles_24h: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE fetched_at >= datetime('now', '-24 hours')",
        )
        .fetch_one(&self.pool)
        .await?;
        let articles_7d: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE fetched_at >= datetime('now', '-7 days')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats { total_articles, high_priority, articles_24h, articles_7d })
    }

    pub async fn abstract_stats(&self) -> Result<AbstractStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        let with_abstract: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE abstract IS NOT NULL AND LENGTH(abstract) >= ?",
        )
        .bind(MIN_ABSTRACT_LEN as i64)
        .fetch_one(&self.pool)
        .await?;
        let with_doi: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE doi IS NOT NULL AND doi != ''",
        )
        .fetch_one(&self.pool)
        .await?;
        let enrichable: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM articles
            WHERE doi IS NOT NULL AND doi != ''
              AND (abstract IS NULL OR LENGTH(abstract) < ?)
            "#,
        )
        .bind(MIN_ABSTRACT_LEN as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(AbstractStats {
            total,
            with_abstract,
            without_abstract: total - with_abstract,
            with_doi,
            enrichable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn draft(journal_id: i64, title: &str, url: &str) -> NewArticle {
        NewArticle {
            journal_id,
            title: title.to_string(),
            authors: None,
            abstract_text: None,
            url: url.to_string(),
            doi: None,
            published_at: None,
            priority: Priority::Normal,
            matched_keywords: None,
        }
    }

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let journal_id = db
            .journals()
            .get_or_create("Urban Studies", "https://example.org/feed", Some("Academic"))
            .await
            .unwrap();
        (db, journal_id)
    }

    #[tokio::test]
    async fn test_insert_dedup_at_most_once() {
        let (db, journal_id) = setup().await;
        let articles = db.articles();

        let first = draft(journal_id, "Governing through Infrastructure", "https://example.org/1");
        let id = articles.insert(&first).await.unwrap();
        assert!(id.is_some());

        // Same (title, url), different other fields — still a duplicate.
        let mut second = draft(journal_id, "Governing through Infrastructure", "https://example.org/1");
        second.doi = Some("10.1234/xyz".to_string());
        second.priority = Priority::High;
        assert!(articles.insert(&second).await.unwrap().is_none());

        assert_eq!(articles.stats().await.unwrap().total_articles, 1);
    }

    #[tokio::test]
    async fn test_insert_preserves_classification() {
        let (db, journal_id) = setup().await;
        let articles = db.articles();

        let mut a = draft(journal_id, "On Territory", "https://example.org/t");
        a.priority = Priority::High;
        a.matched_keywords = Some(vec!["territory".to_string()]);
        let id = articles.insert(&a).await.unwrap().unwrap();

        let stored = articles.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.priority, Priority::High);
        assert_eq!(stored.matched_keywords, Some(vec!["territory".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_keyword_list_differs_from_null() {
        let (db, journal_id) = setup().await;
        let articles = db.articles();

        let mut scanned = draft(journal_id, "Scanned", "https://example.org/s");
        scanned.abstract_text = Some("a".repeat(80));
        scanned.matched_keywords = Some(vec![]);
        articles.insert(&scanned).await.unwrap();

        let mut unscanned = draft(journal_id, "Unscanned", "https://example.org/u");
        unscanned.abstract_text = Some("b".repeat(80));
        articles.insert(&unscanned).await.unwrap();

        // Both are eligible for reclassification: '[]' and NULL alike.
        let eligible = articles.needs_reclassify().await.unwrap();
        assert_eq!(eligible.len(), 2);

        let scanned_row = articles
            .find_by_hash(&identity_hash("Scanned", "https://example.org/s"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scanned_row.matched_keywords, Some(vec![]));
        let unscanned_row = articles
            .find_by_hash(&identity_hash("Unscanned", "https://example.org/u"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unscanned_row.matched_keywords, None);
    }

    #[tokio::test]
    async fn test_missing_abstract_length_gate() {
        let (db, journal_id) = setup().await;
        let articles = db.articles();

        let mut short = draft(journal_id, "Short", "https://example.org/short");
        short.doi = Some("10.1000/short".to_string());
        short.abstract_text = Some("x".repeat(49));
        articles.insert(&short).await.unwrap();

        let mut long = draft(journal_id, "Long", "https://example.org/long");
        long.doi = Some("10.1000/long".to_string());
        long.abstract_text = Some("x".repeat(50));
        articles.insert(&long).await.unwrap();

        let mut no_doi = draft(journal_id, "NoDoi", "https://example.org/nodoi");
        no_doi.abstract_text = None;
        articles.insert(&no_doi).await.unwrap();

        let missing = articles.missing_abstract(50).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].title, "Short");
    }

    #[tokio::test]
    async fn test_pending_translation_selects_tiers_and_untranslated() {
        let (db, journal_id) = setup().await;
        let articles = db.articles();

        let mut high = draft(journal_id, "High", "https://example.org/h");
        high.priority = Priority::High;
        high.abstract_text = Some("a".repeat(100));
        let high_id = articles.insert(&high).await.unwrap().unwrap();

        let mut medium = draft(journal_id, "Medium", "https://example.org/m");
        medium.priority = Priority::Medium;
        medium.abstract_text = Some("a".repeat(100));
        articles.insert(&medium).await.unwrap();

        let mut normal = draft(journal_id, "Normal", "https://example.org/n");
        normal.abstract_text = Some("a".repeat(100));
        articles.insert(&normal).await.unwrap();

        let pending = articles.pending_translation(&[Priority::High]).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "High");

        let pending = articles
            .pending_translation(&[Priority::High, Priority::Medium])
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);

        // Once translated, the article drops out of the queue.
        articles
            .update_translation(high_id, "번역 제목", "번역 초록", "요약")
            .await
            .unwrap();
        let pending = articles.pending_translation(&[Priority::High]).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_update_abstract_and_reclassify_queue() {
        let (db, journal_id) = setup().await;
        let articles = db.articles();

        let mut a = draft(journal_id, "Enriched", "https://example.org/e");
        a.doi = Some("10.1000/e".to_string());
        let id = articles.insert(&a).await.unwrap().unwrap();

        assert!(articles.needs_reclassify().await.unwrap().is_empty());

        articles
            .update_abstract(id, &"governmentality ".repeat(10))
            .await
            .unwrap();
        let eligible = articles.needs_reclassify().await.unwrap();
        assert_eq!(eligible.len(), 1);

        articles
            .update_priority(id, Priority::High, &["governmentality".to_string()])
            .await
            .unwrap();
        assert!(articles.needs_reclassify().await.unwrap().is_empty());
        assert_eq!(articles.stats().await.unwrap().high_priority, 1);
    }
}
