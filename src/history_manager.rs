// src/history_manager.rs
//
// Owns one display session's worth of events: the known-events collection,
// the delivery queue and the loading flag. A fetch cycle runs on the runtime
// as one task; every newly seen event gets its own enrichment task that is
// never awaited by the cycle or by the consumer.
use crate::errors::{FailureKind, FetchError};
use crate::event_fetcher::EventSource;
use crate::history::{HistoricalEvent, RawEvent, RelatedLink};
use crate::link_enricher::LinkSource;
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

type EventQueueTx = mpsc::UnboundedSender<Arc<HistoricalEvent>>;
type EventQueueRx = mpsc::UnboundedReceiver<Arc<HistoricalEvent>>;

pub struct HistoryManager {
    date: NaiveDate,
    events: Arc<dyn EventSource>,
    links: Arc<dyn LinkSource>,
    runtime: Handle,
    // Keyed on year only: two events from the same year collapse into one.
    known: Mutex<BTreeMap<i32, Arc<HistoricalEvent>>>,
    queue_tx: EventQueueTx,
    queue_rx: Mutex<EventQueueRx>,
    loading: AtomicBool,
    completed_cycles: AtomicU64,
    last_failure: Mutex<Option<FailureKind>>,
    // In-flight enrichment tasks; finished ones are reaped on every spawn.
    enrichments: Mutex<JoinSet<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ends a fetch cycle when dropped, including when the cycle task panics.
/// The cycle counter moves before `loading` clears so a consumer that sees
/// `loading == false` also sees the finished cycle.
struct CycleGuard<'a> {
    manager: &'a HistoryManager,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.manager.completed_cycles.fetch_add(1, Ordering::SeqCst);
        self.manager.loading.store(false, Ordering::SeqCst);
    }
}

/// Writes an enrichment result into the event. Empty search results fall
/// back to the event's own wiki page when it has one.
pub fn apply_enrichment(event: &HistoricalEvent, found: Vec<RelatedLink>) {
    let links: Vec<RelatedLink> = if !found.is_empty() {
        found
    } else if let Some(wiki_link) = event.wiki_link() {
        vec![RelatedLink::wiki_fallback(wiki_link)]
    } else {
        Vec::new()
    };

    if !event.set_related_links(links) {
        warn!("HistoryManager: links for year {} were already set", event.year());
    }
}

fn log_enrichment_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("HistoryManager: enrichment task failed: {}", e);
    }
}

impl HistoryManager {
    /// Builds the manager for one session. Tasks are spawned on `runtime`.
    pub fn new(
        date: NaiveDate,
        events: Arc<dyn EventSource>,
        links: Arc<dyn LinkSource>,
        runtime: Handle,
    ) -> Arc<Self> {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            date,
            events,
            links,
            runtime,
            known: Mutex::new(BTreeMap::new()),
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            loading: AtomicBool::new(false),
            completed_cycles: AtomicU64::new(0),
            last_failure: Mutex::new(None),
            enrichments: Mutex::new(JoinSet::new()),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::SeqCst)
    }

    /// Whether the most recent cycle hit a transport, status or parse error.
    /// An empty but well-formed feed does not count as a failure.
    pub fn last_fetch_failed(&self) -> bool {
        self.last_failure().is_some()
    }

    pub fn last_failure(&self) -> Option<FailureKind> {
        *lock(&self.last_failure)
    }

    pub fn known_count(&self) -> usize {
        lock(&self.known).len()
    }

    pub fn known_years(&self) -> Vec<i32> {
        lock(&self.known).keys().copied().collect()
    }

    pub fn is_known(&self, year: i32) -> bool {
        lock(&self.known).contains_key(&year)
    }

    /// Starts a fetch cycle unless one is already in flight. Returns the
    /// cycle's handle, or `None` when the call was a no-op.
    pub fn fetch_events_async(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.loading.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            debug!("HistoryManager: fetch already in flight, ignoring trigger");
            return None;
        }

        let manager: Arc<HistoryManager> = Arc::clone(self);
        Some(self.runtime.spawn(async move { manager.run_fetch_cycle().await }))
    }

    /// Non-blocking pop. An empty queue while idle kicks off a refill and
    /// still returns `None` to this call.
    pub fn get_next_event(self: &Arc<Self>) -> Option<Arc<HistoricalEvent>> {
        // Read the flag first: a cycle pushes before it clears `loading`, so
        // idle-then-empty really means nothing is on its way.
        let idle: bool = !self.is_loading();
        let next: Option<Arc<HistoricalEvent>> = lock(&self.queue_rx).try_recv().ok();
        match next {
            Some(event) => {
                let first_delivery: bool = event.mark_read();
                debug_assert!(first_delivery, "year {} delivered twice", event.year());
                debug!("HistoryManager: delivering event from {}", event.year());
                Some(event)
            }
            None => {
                if idle {
                    self.fetch_events_async();
                }
                None
            }
        }
    }

    /// Events queued but not yet delivered.
    pub fn pending_count(&self) -> usize {
        lock(&self.queue_rx).len()
    }

    /// Waits for every enrichment task spawned so far, including ones
    /// spawned while waiting. Teardown never needs this.
    pub async fn settle(&self) {
        loop {
            let mut pending: JoinSet<()> = std::mem::take(&mut *lock(&self.enrichments));
            if pending.is_empty() {
                return;
            }
            while let Some(result) = pending.join_next().await {
                log_enrichment_result(result);
            }
        }
    }

    /// Enrichment tasks still tracked, finished or not.
    pub fn tracked_enrichments(&self) -> usize {
        lock(&self.enrichments).len()
    }

    async fn run_fetch_cycle(self: Arc<Self>) {
        let _cycle = CycleGuard { manager: &self };
        info!("HistoryManager: fetch cycle started for {}", self.date.format("%m-%d"));

        let outcome = self.events.fetch(self.date).await;
        *lock(&self.last_failure) = outcome.as_ref().err().and_then(FetchError::failure_kind);
        match outcome {
            Ok(raw_events) => {
                let received: usize = raw_events.len();
                let added: usize = self.ingest(raw_events);
                info!("HistoryManager: {} of {} events were new", added, received);
            }
            Err(e) if e.is_no_data() => {
                info!("HistoryManager: no events available for {}", self.date.format("%m-%d"));
            }
            Err(e) => {
                error!("HistoryManager: FetchFailed for {}: {}", self.date.format("%m-%d"), e);
            }
        }
    }

    /// Dedups against known years, then records and queues each new event
    /// under one lock so the queue never holds an unknown event.
    fn ingest(&self, raw_events: Vec<RawEvent>) -> usize {
        let mut fresh: Vec<Arc<HistoricalEvent>> = Vec::new();
        {
            let mut known = lock(&self.known);
            for raw in raw_events {
                if known.contains_key(&raw.year) {
                    debug!("HistoryManager: year {} already known, skipping", raw.year);
                    continue;
                }
                let event: Arc<HistoricalEvent> = Arc::new(HistoricalEvent::from_raw(raw));
                known.insert(event.year(), Arc::clone(&event));
                if self.queue_tx.send(Arc::clone(&event)).is_err() {
                    error!("HistoryManager: delivery queue closed, dropping year {}", event.year());
                    continue;
                }
                fresh.push(event);
            }
        }

        let added: usize = fresh.len();
        for event in fresh {
            self.spawn_enrichment(event);
        }
        added
    }

    fn spawn_enrichment(&self, event: Arc<HistoricalEvent>) {
        let links: Arc<dyn LinkSource> = Arc::clone(&self.links);
        let mut tasks = lock(&self.enrichments);
        while let Some(result) = tasks.try_join_next() {
            log_enrichment_result(result);
        }
        tasks.spawn_on(
            async move {
                let found: Vec<RelatedLink> = links.enrich(event.year(), event.content()).await;
                apply_enrichment(&event, found);
            },
            &self.runtime,
        );
    }
}
