//! In-flight article representation, before it reaches the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry extracted from a feed, normalized but not yet classified
/// or persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub url: String,
    pub abstract_text: Option<String>,
    pub authors: Option<String>,
    pub doi: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub journal_name: String,
    pub feed_url: String,
    pub category: String,
}
