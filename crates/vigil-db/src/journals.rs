//! Journal repository.

use sqlx::sqlite::SqlitePool;
use vigil_common::Result;

/// A named feed source with a category label; name is the natural key.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Journal {
    pub id: i64,
    pub name: String,
    pub feed_url: String,
    pub category: Option<String>,
}

#[derive(Clone)]
pub struct JournalRepository {
    pool: SqlitePool,
}

impl JournalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a journal by name, creating it on first sighting.
    pub async fn get_or_create(
        &self,
        name: &str,
        feed_url: &str,
        category: Option<&str>,
    ) -> Result<i64> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM journals WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let result = sqlx::query(
            "INSERT INTO journals (name, feed_url, category) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(feed_url)
        .bind(category)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Journal>> {
        let journal = sqlx::query_as::<_, Journal>(
            "SELECT id, name, feed_url, category FROM journals WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(journal)
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM journals")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let db = Database::open_in_memory().await.unwrap();
        let journals = db.journals();

        let first = journals
            .get_or_create("Urban Studies", "https://example.org/feed", Some("Academic"))
            .await
            .unwrap();
        let second = journals
            .get_or_create("Urban Studies", "", None)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(journals.count().await.unwrap(), 1);

        let other = journals
            .get_or_create("Antipode", "https://example.org/antipode", None)
            .await
            .unwrap();
        assert_ne!(first, other);
        assert_eq!(journals.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_by_name_keeps_first_category() {
        let db = Database::open_in_memory().await.unwrap();
        let journals = db.journals();
        journals
            .get_or_create("Antipode", "https://example.org/a", Some("Geography"))
            .await
            .unwrap();

        let journal = journals.find_by_name("Antipode").await.unwrap().unwrap();
        assert_eq!(journal.category.as_deref(), Some("Geography"));
        assert!(journals.find_by_name("Nope").await.unwrap().is_none());
    }
}
