//! Configuration loading for vigil.
//! Reads vigil.toml from the current directory or the path in the
//! VIGIL_CONFIG env var. A missing file yields defaults; a malformed
//! file is a fatal startup error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vigil_common::{Result, VigilError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub rss: RssConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_opml_file")]
    pub opml_file: PathBuf,
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_opml_file() -> PathBuf { PathBuf::from("Feeds.opml") }
fn default_database()  -> PathBuf { PathBuf::from("data/journals.db") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self { opml_file: default_opml_file(), database: default_database() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssConfig {
    #[serde(default = "default_fetch_hours")]
    pub fetch_hours: i64,
    #[serde(default = "default_max_per_feed")]
    pub max_articles_per_feed: usize,
    /// Delay between feed requests, in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Categories fetched when running with the academic-only filter.
    #[serde(default = "default_academic_categories")]
    pub academic_categories: Vec<String>,
}

fn default_fetch_hours()      -> i64   { 24 }
fn default_max_per_feed()     -> usize { 10 }
fn default_request_delay_ms() -> u64   { 1000 }

fn default_academic_categories() -> Vec<String> {
    [
        "Academic: Geography Journals",
        "Academic: Sociology Journals",
        "Academic: Theory & Philosophy",
        "Academic: Planning Studies",
        "Academic: Urban & Planning History",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            fetch_hours: default_fetch_hours(),
            max_articles_per_feed: default_max_per_feed(),
            request_delay_ms: default_request_delay_ms(),
            academic_categories: default_academic_categories(),
        }
    }
}

/// Two ordered tiers of case-insensitive match terms. Loaded once per run
/// and treated as immutable input to the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_high_keywords")]
    pub high: Vec<String>,
    #[serde(default = "default_medium_keywords")]
    pub medium: Vec<String>,
}

fn default_high_keywords() -> Vec<String> {
    [
        "governmentality", "통치성", "assemblage", "어셈블리지",
        "new materialism", "신유물론", "foucault", "푸코",
        "deleuze", "들뢰즈", "guattari", "가타리",
        "lefebvre", "르페브르", "urban politics", "도시정치",
        "housing financialization", "주거 금융화", "gentrification", "젠트리피케이션",
        "displacement", "축출", "dispossession", "탈취",
        "biopolitics", "생명정치", "necropolitics", "죽음정치",
        "territory", "영토", "territoriality", "영토성",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_medium_keywords() -> Vec<String> {
    [
        "urban planning", "도시계획", "political geography", "정치지리",
        "spatial", "공간", "mobility", "이동성", "infrastructure", "인프라",
        "housing", "주거", "rent", "임대", "property", "재산",
        "neoliberal", "신자유주의", "accumulation", "축적",
        "state", "국가", "governance", "거버넌스", "planning theory", "계획이론",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self { high: default_high_keywords(), medium: default_medium_keywords() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Publisher-page scraping fallback. Off by default; the bibliographic
    /// APIs cover most DOIs and scraping is the least polite option.
    #[serde(default)]
    pub scrape: bool,
    #[serde(default = "default_enrich_limit")]
    pub limit: usize,
    /// Email sent to OpenAlex for polite-pool rate limits.
    pub openalex_email: Option<String>,
}

fn default_true()         -> bool  { true }
fn default_enrich_limit() -> usize { 50 }

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scrape: false,
            limit: default_enrich_limit(),
            openalex_email: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key; falls back to the ANTHROPIC_API_KEY env var when empty.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

fn default_model()           -> String { "claude-sonnet-4-20250514".to_string() }
fn default_max_tokens()      -> u32    { 1500 }
fn default_target_language() -> String { "Korean".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: String::new(),
            target_language: default_target_language(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or VIGIL_CONFIG, or ./vigil.toml.
    /// A missing file yields `Config::default()`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("VIGIL_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("vigil.toml")),
        };

        if !path.exists() {
            return Ok(Config::default());
        }

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| VigilError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| VigilError::Config(e.to_string()))
    }

    /// API key from config or environment; None disables translation.
    pub fn anthropic_api_key(&self) -> Option<String> {
        if !self.llm.api_key.is_empty() {
            return Some(self.llm.api_key.clone());
        }
        std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty())
    }
}
