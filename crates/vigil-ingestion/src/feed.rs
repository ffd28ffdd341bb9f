//! RSS/Atom feed fetching and entry normalization.
//!
//! The parser is a streaming state machine over `quick_xml` events that
//! accepts both RSS (`<item>`) and Atom (`<entry>`) documents, including
//! the Dublin Core and PRISM extensions academic publishers use.

use crate::models::ArticleDraft;
use crate::registry::FeedInfo;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use vigil_common::{Result, VigilError, MAX_ABSTRACT_LEN};

const USER_AGENT: &str = concat!("vigil/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DOI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"10\.\d{4,}/[^\s]+").unwrap());

/// Client for feed and bibliographic API calls: 30s per-request timeout
/// and a User-Agent identifying the tool and version.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

pub struct FeedFetcher {
    client: reqwest::Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self { client: http_client()? })
    }

    /// Fetch one feed and return its normalized entries. Entries older
    /// than `cutoff` are dropped; undated entries are kept.
    #[instrument(skip(self, feed), fields(feed = %feed.name))]
    pub async fn fetch(
        &self,
        feed: &FeedInfo,
        cutoff: Option<DateTime<Utc>>,
        max_entries: usize,
    ) -> Result<Vec<ArticleDraft>> {
        let response = self.client.get(&feed.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VigilError::FeedParse(format!(
                "feed {} returned HTTP {status}",
                feed.url
            )));
        }
        let body = response.text().await?;
        let drafts = parse_feed_entries(&body, feed, cutoff, max_entries)?;
        debug!(entries = drafts.len(), "feed parsed");
        Ok(drafts)
    }
}

/// Which element's character data we are currently accumulating.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    Summary,
    Description,
    Content,
    Author,
    Doi,
    Identifier,
    Date,
    DateFallback,
}

#[derive(Debug, Default)]
struct RawEntry {
    title: String,
    link: String,
    summary: String,
    description: String,
    content: String,
    author: String,
    doi: String,
    identifier: String,
    date: String,
    date_fallback: String,
}

impl RawEntry {
    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
            Field::Author => &mut self.author,
            Field::Doi => &mut self.doi,
            Field::Identifier => &mut self.identifier,
            Field::Date => &mut self.date,
            Field::DateFallback => &mut self.date_fallback,
        }
    }
}

/// Parse a feed document into drafts.
///
/// Scans at most `2 * max_entries` entries and keeps at most
/// `max_entries` after filtering, so a huge backfill feed cannot stall a
/// run. Entries without both a title and a link are dropped.
pub fn parse_feed_entries(
    xml: &str,
    feed: &FeedInfo,
    cutoff: Option<DateTime<Utc>>,
    max_entries: usize,
) -> Result<Vec<ArticleDraft>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let scan_cap = max_entries.saturating_mul(2);
    let mut scanned = 0usize;
    let mut drafts: Vec<ArticleDraft> = Vec::new();
    let mut entry: Option<RawEntry> = None;
    let mut target: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        entry = Some(RawEntry::default());
                        target = None;
                    }
                    b"link" if entry.is_some() => {
                        // Atom carries the URL in href; RSS in text.
                        match (entry.as_mut(), atom_link_href(&e)) {
                            (Some(raw), Some(href)) => {
                                if raw.link.is_empty() {
                                    raw.link = href;
                                }
                                target = None;
                            }
                            _ => target = Some(Field::Link),
                        }
                    }
                    other if entry.is_some() => {
                        target = field_for_tag(other);
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"link" {
                    if let (Some(raw), Some(href)) = (entry.as_mut(), atom_link_href(&e)) {
                        if raw.link.is_empty() {
                            raw.link = href;
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(raw), Some(field)) = (entry.as_mut(), target) {
                    let text = t
                        .unescape()
                        .map_err(|e| VigilError::FeedParse(format!("bad feed text: {e}")))?;
                    let slot = raw.field_mut(field);
                    // One author per element; join later.
                    if field == Field::Author && !slot.is_empty() {
                        slot.push('\n');
                    }
                    slot.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(raw), Some(field)) = (entry.as_mut(), target) {
                    raw.field_mut(field)
                        .push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        if let Some(raw) = entry.take() {
                            scanned += 1;
                            if let Some(draft) = normalize_entry(raw, feed, cutoff) {
                                drafts.push(draft);
                            }
                        }
                        if drafts.len() >= max_entries || scanned >= scan_cap {
                            break;
                        }
                    }
                    _ => target = None,
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(VigilError::FeedParse(format!(
                    "malformed feed {}: {e}",
                    feed.url
                )));
            }
        }
    }

    Ok(drafts)
}

fn field_for_tag(tag: &[u8]) -> Option<Field> {
    match tag {
        b"title" => Some(Field::Title),
        b"summary" => Some(Field::Summary),
        b"description" => Some(Field::Description),
        b"content" | b"content:encoded" => Some(Field::Content),
        b"dc:creator" | b"author" | b"name" => Some(Field::Author),
        b"prism:doi" => Some(Field::Doi),
        b"dc:identifier" => Some(Field::Identifier),
        b"pubDate" | b"published" | b"dc:date" | b"prism:publicationDate" => Some(Field::Date),
        b"updated" | b"lastBuildDate" => Some(Field::DateFallback),
        _ => None,
    }
}

fn atom_link_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel_ok = true;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"href" => {
                href = attr.unescape_value().ok().map(|v| v.into_owned());
            }
            b"rel" => {
                rel_ok = attr.value.as_ref() == b"alternate";
            }
            _ => {}
        }
    }
    if rel_ok {
        href
    } else {
        None
    }
}

fn normalize_entry(
    raw: RawEntry,
    feed: &FeedInfo,
    cutoff: Option<DateTime<Utc>>,
) -> Option<ArticleDraft> {
    let title = clean_html(&raw.title);
    let url = raw.link.trim().to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }

    let published_at = parse_entry_date(&raw.date).or_else(|| parse_entry_date(&raw.date_fallback));
    if let (Some(cutoff), Some(date)) = (cutoff, published_at) {
        if date < cutoff {
            return None;
        }
    }

    // First non-empty of summary, description, content.
    let abstract_source = [&raw.summary, &raw.description, &raw.content]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(String::as_str)
        .unwrap_or_default();
    let abstract_text = match clean_html(abstract_source) {
        s if s.is_empty() => None,
        s => Some(truncate_chars(&s, MAX_ABSTRACT_LEN)),
    };

    let mut author_list: Vec<String> = Vec::new();
    for name in raw.author.split('\n') {
        let name = clean_html(name);
        if !name.is_empty() && !author_list.contains(&name) {
            author_list.push(name);
        }
    }
    let authors = if author_list.is_empty() {
        None
    } else {
        Some(author_list.join(", "))
    };

    let doi = extract_doi(&raw.doi)
        .or_else(|| extract_doi(&raw.identifier))
        .or_else(|| extract_doi(&url));

    Some(ArticleDraft {
        title,
        url,
        abstract_text,
        authors,
        doi,
        published_at,
        journal_name: feed.name.clone(),
        feed_url: feed.url.clone(),
        category: feed.category.clone(),
    })
}

/// Strip markup and collapse whitespace. Feeds embed HTML in summaries
/// and sometimes in titles.
pub fn clean_html(input: &str) -> String {
    let stripped = TAG_RE.replace_all(input, " ");
    let unescaped = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WS_RE.replace_all(&unescaped, " ").trim().to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Find a DOI in free text, trimming the trailing punctuation link
/// formats attach.
pub fn extract_doi(text: &str) -> Option<String> {
    let m = DOI_RE.find(text)?;
    let doi = m.as_str().trim_end_matches(['.', ',', ';', ')']);
    Some(doi.to_string())
}

/// Publishers emit every date shape there is; try them in order of how
/// often feeds actually use them.
fn parse_entry_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = DateTime::parse_from_rfc2822(raw) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(d) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(d.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    warn!(raw, "unparseable entry date");
    None
}
