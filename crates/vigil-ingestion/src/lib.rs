//! Feed ingestion: OPML registry, RSS/Atom parsing, keyword
//! classification, abstract enrichment, and the run pipeline that ties
//! the stages together.

pub mod classify;
pub mod enrich;
pub mod feed;
pub mod models;
pub mod pacing;
pub mod pipeline;
pub mod registry;
pub mod sources;

pub use models::ArticleDraft;
pub use pipeline::{Pipeline, RunOptions, RunSummary};
pub use registry::{FeedInfo, FeedRegistry};
