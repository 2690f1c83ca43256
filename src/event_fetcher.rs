// src/event_fetcher.rs
use crate::errors::FetchError;
use crate::history::RawEvent;
use crate::page_download::PageFetcher;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Source of the day's events. Does not deduplicate.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawEvent>, FetchError>;
}

// ===== Wire shape of the "onthisday" feed
// Entries stay untyped so one malformed entry is skipped instead of failing
// the whole body.
#[derive(Debug, Deserialize)]
struct FeedResponse {
    events: Option<Vec<Value>>,
}

fn entry_to_raw_event(entry: &Value) -> Option<RawEvent> {
    let year: i32 = entry.get("year").and_then(Value::as_i64).and_then(|y| i32::try_from(y).ok())?;
    let content: String = entry
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())?
        .to_string();
    let wiki_link: Option<String> = entry
        .pointer("/pages/0/content_urls/desktop/page")
        .and_then(Value::as_str)
        .filter(|page| !page.is_empty())
        .map(str::to_string);
    Some(RawEvent { year, content, wiki_link })
}

/// Parses a feed body into valid entries, keeping the feed's order.
pub fn parse_feed(body: &str) -> Result<Vec<RawEvent>, FetchError> {
    let response: FeedResponse = serde_json::from_str(body)?;
    let entries: Vec<Value> = response.events.unwrap_or_default();
    let events: Vec<RawEvent> = entries.iter().filter_map(entry_to_raw_event).collect();
    debug!("parse_feed: {} of {} entries usable", events.len(), entries.len());

    if events.is_empty() {
        return Err(FetchError::NoData);
    }
    Ok(events)
}

pub fn feed_url(base_url: &str, date: NaiveDate) -> String {
    format!("{}/{:02}/{:02}", base_url.trim_end_matches('/'), date.month(), date.day())
}

// ===== Wikipedia implementation
pub struct OnThisDayFetcher {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
}

impl OnThisDayFetcher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: impl Into<String>) -> Self {
        Self { fetcher, base_url: base_url.into() }
    }
}

#[async_trait]
impl EventSource for OnThisDayFetcher {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawEvent>, FetchError> {
        let url: String = feed_url(&self.base_url, date);
        info!("OnThisDayFetcher: requesting events for {}", date.format("%m-%d"));
        let body: String = self.fetcher.fetch(&url).await?;
        let events: Vec<RawEvent> = parse_feed(&body)?;
        info!("OnThisDayFetcher: {} events for {}", events.len(), date.format("%m-%d"));
        Ok(events)
    }
}
