//! LLM integration: the backend abstraction and the article translator
//! built on top of it.

pub mod backend;
pub mod translator;

pub use backend::{AnthropicBackend, LlmBackend, LlmError};
pub use translator::{TranslatedArticle, Translator};
