//! OPML feed registry.
//!
//! Feeds are declared in an OPML file where container outlines act as
//! category labels and leaf outlines (those carrying `xmlUrl`) are the
//! feeds themselves. Nesting inherits the innermost container's name.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use tracing::info;
use vigil_common::{Result, VigilError};

const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq)]
pub struct FeedInfo {
    pub name: String,
    pub url: String,
    pub category: String,
}

#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    feeds: Vec<FeedInfo>,
}

impl FeedRegistry {
    pub fn from_opml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| {
            VigilError::Config(format!("cannot read OPML file {}: {e}", path.display()))
        })?;
        let registry = Self::parse(&xml)?;
        info!(
            feeds = registry.feeds.len(),
            path = %path.display(),
            "loaded feed registry"
        );
        Ok(registry)
    }

    /// Parse OPML text. A malformed document is a hard error: the
    /// registry is the run's ground truth and a partial read would
    /// silently drop feeds.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut feeds = Vec::new();
        // Stack of enclosing container-outline names.
        let mut containers: Vec<String> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                    let attrs = OutlineAttrs::read(&e)?;
                    if let Some(feed) = attrs.as_feed(containers.last()) {
                        feeds.push(feed);
                        // Still push so the matching End pops cleanly.
                        containers.push(String::new());
                    } else {
                        containers.push(attrs.label());
                    }
                }
                Ok(Event::Empty(e)) if e.name().as_ref() == b"outline" => {
                    let attrs = OutlineAttrs::read(&e)?;
                    if let Some(feed) = attrs.as_feed(containers.last()) {
                        feeds.push(feed);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                    containers.pop();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(VigilError::FeedParse(format!("malformed OPML: {e}")));
                }
            }
        }

        Ok(Self { feeds })
    }

    pub fn feeds(&self) -> &[FeedInfo] {
        &self.feeds
    }

    pub fn feeds_in_categories(&self, categories: &[String]) -> Vec<&FeedInfo> {
        self.feeds
            .iter()
            .filter(|f| categories.iter().any(|c| c == &f.category))
            .collect()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for feed in &self.feeds {
            if !seen.contains(&feed.category) {
                seen.push(feed.category.clone());
            }
        }
        seen
    }
}

#[derive(Debug, Default)]
struct OutlineAttrs {
    title: Option<String>,
    text: Option<String>,
    xml_url: Option<String>,
}

impl OutlineAttrs {
    fn read(e: &BytesStart<'_>) -> Result<Self> {
        let mut attrs = Self::default();
        for attr in e.attributes() {
            let attr =
                attr.map_err(|e| VigilError::FeedParse(format!("bad OPML attribute: {e}")))?;
            let value = attr
                .unescape_value()
                .map_err(|e| VigilError::FeedParse(format!("bad OPML attribute value: {e}")))?
                .into_owned();
            match attr.key.as_ref() {
                b"title" => attrs.title = Some(value),
                b"text" => attrs.text = Some(value),
                b"xmlUrl" => attrs.xml_url = Some(value),
                _ => {}
            }
        }
        Ok(attrs)
    }

    /// Container label: title wins over text, empty string otherwise.
    fn label(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.text.clone())
            .unwrap_or_default()
    }

    fn as_feed(&self, container: Option<&String>) -> Option<FeedInfo> {
        let url = self.xml_url.as_ref()?;
        if url.is_empty() {
            return None;
        }
        let name = self.label();
        if name.is_empty() {
            return None;
        }
        let category = container
            .filter(|c| !c.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        Some(FeedInfo { name, url: url.clone(), category })
    }
}
