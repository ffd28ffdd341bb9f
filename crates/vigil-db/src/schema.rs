//! Table definitions and typed row models.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use vigil_common::Priority;

pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS journals (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT UNIQUE NOT NULL,
        feed_url    TEXT NOT NULL,
        category    TEXT,
        created_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        journal_id          INTEGER NOT NULL,
        title               TEXT NOT NULL,
        title_translated    TEXT,
        authors             TEXT,
        abstract            TEXT,
        abstract_translated TEXT,
        summary_translated  TEXT,
        url                 TEXT NOT NULL,
        doi                 TEXT,
        published_at        TIMESTAMP,
        fetched_at          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        identity_hash       TEXT NOT NULL UNIQUE,
        priority            TEXT NOT NULL DEFAULT 'normal',
        is_read             INTEGER NOT NULL DEFAULT 0,
        is_starred          INTEGER NOT NULL DEFAULT 0,
        matched_keywords    TEXT,
        FOREIGN KEY (journal_id) REFERENCES journals(id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_at)",
    "CREATE INDEX IF NOT EXISTS idx_articles_priority ON articles(priority)",
    "CREATE INDEX IF NOT EXISTS idx_articles_hash ON articles(identity_hash)",
];

/// Deterministic fingerprint of `(title, url)`; the UNIQUE constraint on
/// this column is what makes repeated runs safe.
pub fn identity_hash(title: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Payload for inserting one article. Fields not listed here (fetched_at,
/// read/star flags) are set by the store.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub journal_id: i64,
    pub title: String,
    pub authors: Option<String>,
    pub abstract_text: Option<String>,
    pub url: String,
    pub doi: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub priority: Priority,
    /// `None` means "never classified"; `Some(vec![])` means "classified,
    /// nothing matched". The distinction drives reclassification.
    pub matched_keywords: Option<Vec<String>>,
}

/// Raw row as stored. `matched_keywords` is the JSON-encoded column.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub journal_id: i64,
    pub title: String,
    pub title_translated: Option<String>,
    pub authors: Option<String>,
    #[sqlx(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub abstract_translated: Option<String>,
    pub summary_translated: Option<String>,
    pub url: String,
    pub doi: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: NaiveDateTime,
    pub identity_hash: String,
    pub priority: String,
    pub is_read: bool,
    pub is_starred: bool,
    pub matched_keywords: Option<String>,
}

/// One ingested academic record, with typed priority and keyword list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub journal_id: i64,
    pub title: String,
    pub title_translated: Option<String>,
    pub authors: Option<String>,
    pub abstract_text: Option<String>,
    pub abstract_translated: Option<String>,
    pub summary_translated: Option<String>,
    pub url: String,
    pub doi: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: NaiveDateTime,
    pub identity_hash: String,
    pub priority: Priority,
    pub is_read: bool,
    pub is_starred: bool,
    pub matched_keywords: Option<Vec<String>>,
}

impl Article {
    /// Abstract shorter than the usable minimum counts as missing.
    pub fn has_usable_abstract(&self) -> bool {
        self.abstract_text
            .as_deref()
            .map(|a| a.chars().count() >= vigil_common::MIN_ABSTRACT_LEN)
            .unwrap_or(false)
    }
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        let matched_keywords = row.matched_keywords.as_deref().map(|raw| {
            // A corrupt column degrades to "classified, no matches".
            serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
        });
        Article {
            id: row.id,
            journal_id: row.journal_id,
            title: row.title,
            title_translated: row.title_translated,
            authors: row.authors,
            abstract_text: row.abstract_text,
            abstract_translated: row.abstract_translated,
            summary_translated: row.summary_translated,
            url: row.url,
            doi: row.doi,
            published_at: row.published_at,
            fetched_at: row.fetched_at,
            identity_hash: row.identity_hash,
            priority: Priority::parse(&row.priority),
            is_read: row.is_read,
            is_starred: row.is_starred,
            matched_keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_hash_is_deterministic() {
        let a = identity_hash("Governing through Infrastructure", "https://example.org/1");
        let b = identity_hash("Governing through Infrastructure", "https://example.org/1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_identity_hash_differs_on_url() {
        let a = identity_hash("Same Title", "https://example.org/1");
        let b = identity_hash("Same Title", "https://example.org/2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_usable_abstract_boundary() {
        let mut article = Article {
            id: 1,
            journal_id: 1,
            title: "t".into(),
            title_translated: None,
            authors: None,
            abstract_text: Some("x".repeat(49)),
            abstract_translated: None,
            summary_translated: None,
            url: "u".into(),
            doi: None,
            published_at: None,
            fetched_at: chrono::Utc::now().naive_utc(),
            identity_hash: "h".into(),
            priority: Priority::Normal,
            is_read: false,
            is_starred: false,
            matched_keywords: None,
        };
        assert!(!article.has_usable_abstract());
        article.abstract_text = Some("x".repeat(50));
        assert!(article.has_usable_abstract());
        article.abstract_text = None;
        assert!(!article.has_usable_abstract());
    }
}
