//! SQLite store for journals and articles.
//!
//! Single-process, single-writer semantics: every write is one statement
//! committed immediately, no transaction spans pipeline stages.

pub mod articles;
pub mod database;
pub mod journals;
pub mod schema;

pub use articles::ArticleRepository;
pub use database::Database;
pub use journals::JournalRepository;
pub use schema::{Article, NewArticle};
