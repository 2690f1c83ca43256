// src/testing.rs
// Canned sources shared by the manager and app tests.
use crate::errors::FetchError;
use crate::event_fetcher::EventSource;
use crate::history::{RawEvent, RelatedLink};
use crate::link_enricher::LinkSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 20).unwrap()
}

/// Plays back one scripted response per call; once the script runs out every
/// call yields `NoData`. With a gate, each call waits for a `release()`.
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<RawEvent>, FetchError>>>,
    calls: AtomicUsize,
    gate: Option<Notify>,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Result<Vec<RawEvent>, FetchError>>) -> Self {
        Self { script: Mutex::new(script.into()), calls: AtomicUsize::new(0), gate: None }
    }

    pub(crate) fn gated(script: Vec<Result<Vec<RawEvent>, FetchError>>) -> Self {
        Self { gate: Some(Notify::new()), ..Self::new(script) }
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch(&self, _date: NaiveDate) -> Result<Vec<RawEvent>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.script.lock().unwrap().pop_front().unwrap_or(Err(FetchError::NoData))
    }
}

/// Returns the same links for every event, optionally after a delay.
pub(crate) struct StaticLinks {
    links: Vec<RelatedLink>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticLinks {
    pub(crate) fn new(links: Vec<RelatedLink>) -> Self {
        Self { links, delay: Duration::ZERO, calls: AtomicUsize::new(0) }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn delayed(links: Vec<RelatedLink>, delay: Duration) -> Self {
        Self { delay, ..Self::new(links) }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkSource for StaticLinks {
    async fn enrich(&self, _year: i32, _content: &str) -> Vec<RelatedLink> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.links.clone()
    }
}

pub(crate) fn raw(year: i32, content: &str, wiki_link: Option<&str>) -> RawEvent {
    RawEvent::new(year, content, wiki_link.map(str::to_string))
}
