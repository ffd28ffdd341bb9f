//! Publisher landing-page scraper.
//!
//! Last-resort provider: fetch the article's landing page and pull the
//! abstract out of the HTML, using per-publisher selectors where we know
//! the markup and generic meta tags everywhere else. Compiled in only
//! with the `scrape` feature; publishers change markup without notice
//! and some prohibit scraping in their terms.

use super::{AbstractProvider, EnrichCandidate, ProviderOutcome};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;
use vigil_common::Result;

// Scraped fragments shorter than this are usually cookie banners or
// truncated teasers, not abstracts.
const MIN_SCRAPED_LEN: usize = 100;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) \
     Gecko/20100101 Firefox/128.0";

pub struct PublisherScraper {
    client: reqwest::Client,
}

impl PublisherScraper {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AbstractProvider for PublisherScraper {
    fn name(&self) -> &'static str {
        "publisher"
    }

    fn pace_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    #[instrument(skip(self, candidate), fields(id = candidate.id))]
    async fn fetch_abstract(&self, candidate: &EnrichCandidate) -> Result<ProviderOutcome> {
        let response = self.client.get(&candidate.url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(ProviderOutcome::RateLimited);
        }
        if !status.is_success() {
            debug!(%status, "landing page fetch failed");
            return Ok(ProviderOutcome::NotFound);
        }
        let html = response.text().await?;

        match extract_abstract(&html, &candidate.url) {
            Some(text) => Ok(ProviderOutcome::Found(text)),
            None => Ok(ProviderOutcome::NotFound),
        }
    }
}

/// CSS selectors for publishers whose markup we know, tried in order.
fn selectors_for_domain(host: &str) -> &'static [&'static str] {
    if host.contains("tandfonline") {
        &["div.abstractSection p", "div.hlFld-Abstract p"]
    } else if host.contains("sagepub") {
        &["div.abstractSection p", "section#abstract p", "div[class*='abstract'] p"]
    } else if host.contains("wiley") {
        &["div.abstract-group p", "section.article-section__abstract p"]
    } else if host.contains("sciencedirect") {
        &["div.abstract.author p", "div[class*='abstract'] p"]
    } else if host.contains("springer") || host.contains("link.springer") {
        &["div#Abs1-content p", "section[data-title='Abstract'] p"]
    } else {
        &[]
    }
}

const META_SELECTORS: &[&str] = &[
    "meta[name='citation_abstract']",
    "meta[name='DC.Description']",
    "meta[name='description']",
    "meta[property='og:description']",
];

pub fn extract_abstract(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let host = Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    for css in selectors_for_domain(&host) {
        let Ok(selector) = Selector::parse(css) else {
            warn!(css, "bad selector");
            continue;
        };
        let text: String = document
            .select(&selector)
            .flat_map(|el| el.text())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(cleaned) = clean_abstract(&text) {
            return Some(cleaned);
        }
    }

    for css in META_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(el) = document.select(&selector).next() {
            if let Some(content) = el.value().attr("content") {
                if let Some(cleaned) = clean_abstract(content) {
                    return Some(cleaned);
                }
            }
        }
    }

    None
}

/// Normalize scraped text; reject fragments too short to be abstracts.
fn clean_abstract(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_start_matches("Abstract")
        .trim_start_matches("ABSTRACT")
        .trim_start_matches(':')
        .trim();
    if trimmed.chars().count() >= MIN_SCRAPED_LEN {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_ABSTRACT: &str = "This article develops a genealogical account of \
        planning rationalities in three East Asian cities, tracing how techniques \
        of calculation travel between municipal agencies.";

    #[test]
    fn test_known_publisher_selector() {
        let html = format!(
            r#"<html><body>
              <div class="abstractSection"><p>{LONG_ABSTRACT}</p></div>
            </body></html>"#
        );
        let found =
            extract_abstract(&html, "https://www.tandfonline.com/doi/full/10.1/x").unwrap();
        assert!(found.starts_with("This article develops"));
    }

    #[test]
    fn test_meta_tag_fallback() {
        let html = format!(
            r#"<html><head>
              <meta name="citation_abstract" content="{LONG_ABSTRACT}">
            </head><body></body></html>"#
        );
        let found = extract_abstract(&html, "https://unknown-press.example/p/1").unwrap();
        assert!(found.contains("genealogical account"));
    }

    #[test]
    fn test_short_fragments_rejected() {
        let html = r#"<html><head>
          <meta name="description" content="Read the latest issue.">
        </head></html>"#;
        assert!(extract_abstract(html, "https://example.org/x").is_none());
    }

    #[test]
    fn test_abstract_label_stripped() {
        let raw = format!("Abstract: {LONG_ABSTRACT}");
        let cleaned = clean_abstract(&raw).unwrap();
        assert!(cleaned.starts_with("This article"));
    }
}
