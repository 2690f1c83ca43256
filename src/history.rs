// src/history.rs
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Label used when search turns up nothing and the feed's own page stands in.
pub const WIKI_FALLBACK_TITLE: &str = "维基百科详情";

// === LINKS ===
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedLink {
    title: String,
    url: String,
}

impl RelatedLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into() }
    }

    pub fn wiki_fallback(url: &str) -> Self {
        Self::new(WIKI_FALLBACK_TITLE, url)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RelatedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.url)
    }
}

// === RAW FEED ENTRY ===

/// One valid entry as it came off the primary feed, before dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub year: i32,
    pub content: String,
    pub wiki_link: Option<String>,
}

impl RawEvent {
    pub fn new(year: i32, content: impl Into<String>, wiki_link: Option<String>) -> Self {
        Self { year, content: content.into(), wiki_link }
    }
}

// === EVENT ===

/// An event held by the manager. Shared between the queue, the consumer and
/// exactly one enrichment task, which is the only writer of `related_links`.
#[derive(Debug)]
pub struct HistoricalEvent {
    year: i32,
    content: String,
    wiki_link: Option<String>,
    related_links: OnceLock<Vec<RelatedLink>>,
    is_read: AtomicBool,
}

impl HistoricalEvent {
    pub fn new(year: i32, content: impl Into<String>, wiki_link: Option<String>) -> Self {
        Self {
            year,
            content: content.into(),
            wiki_link,
            related_links: OnceLock::new(),
            is_read: AtomicBool::new(false),
        }
    }

    pub fn from_raw(raw: RawEvent) -> Self {
        Self::new(raw.year, raw.content, raw.wiki_link)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn wiki_link(&self) -> Option<&str> {
        self.wiki_link.as_deref()
    }

    /// Empty until enrichment lands, then the complete list. Never partial.
    pub fn related_links(&self) -> &[RelatedLink] {
        self.related_links.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// True once the enrichment step has run, even if it found nothing.
    pub fn links_resolved(&self) -> bool {
        self.related_links.get().is_some()
    }

    /// Writes the enrichment result. Only the first call has any effect;
    /// returns false for any later attempt.
    pub fn set_related_links(&self, links: Vec<RelatedLink>) -> bool {
        self.related_links.set(links).is_ok()
    }

    pub fn is_read(&self) -> bool {
        self.is_read.load(Ordering::Acquire)
    }

    /// Returns true only for the call that flipped the flag.
    pub fn mark_read(&self) -> bool {
        !self.is_read.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Display for HistoricalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "历史上的{}年的今天：", self.year)?;
        writeln!(f, "{}", self.content)?;
        let links = self.related_links();
        if links.is_empty() {
            return writeln!(f, "暂无相关链接。");
        }
        writeln!(f, "相关链接：")?;
        for (i, link) in links.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, link)?;
        }
        Ok(())
    }
}
