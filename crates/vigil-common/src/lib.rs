//! Shared types for the vigil workspace.

pub mod error;
pub mod priority;

pub use error::{Result, VigilError};
pub use priority::Priority;

/// An abstract shorter than this is treated as missing for enrichment
/// and translation purposes.
pub const MIN_ABSTRACT_LEN: usize = 50;

/// Feed-supplied abstracts are truncated to this many characters.
pub const MAX_ABSTRACT_LEN: usize = 2000;
