//! Debounced search session.
//!
//! Each `query_changed` call takes a new generation number. Work for a
//! generation runs after the debounce delay, and its results are published
//! only if no newer generation was started meanwhile and nothing newer has
//! been published already. Cancellation is logical: superseded work may still
//! finish, its output is simply dropped.

use kindle_types::SearchResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default delay between the last keystroke and the search
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// The synchronous search pipeline a session drives.
pub trait Lookup: Send + Sync + 'static {
    fn lookup(&self, raw_query: &str) -> Vec<SearchResult>;
}

/// Results published for one generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub generation: u64,
    pub query: String,
    pub results: Vec<SearchResult>,
}

pub struct SearchSession {
    lookup: Arc<dyn Lookup>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    tx: Arc<watch::Sender<SearchOutcome>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchSession {
    #[must_use]
    pub fn new(lookup: Arc<dyn Lookup>, debounce: Duration) -> Self {
        let (tx, _rx) = watch::channel(SearchOutcome::default());
        Self {
            lookup,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            tx: Arc::new(tx),
            pending: Mutex::new(None),
        }
    }

    /// Receiver that observes every published outcome.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchOutcome> {
        self.tx.subscribe()
    }

    /// Most recently published outcome.
    #[must_use]
    pub fn latest(&self) -> SearchOutcome {
        self.tx.borrow().clone()
    }

    /// Generation of the most recent `query_changed` call.
    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a search for `raw_input`, superseding any pending one.
    ///
    /// Blank input publishes an empty result set immediately. Must be called
    /// from within a tokio runtime. Returns the generation assigned.
    pub fn query_changed(&self, raw_input: &str) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_pending();

        if raw_input.trim().is_empty() {
            publish(
                &self.tx,
                SearchOutcome {
                    generation,
                    query: raw_input.to_string(),
                    results: Vec::new(),
                },
            );
            return generation;
        }

        let lookup = Arc::clone(&self.lookup);
        let current = Arc::clone(&self.generation);
        let tx = Arc::clone(&self.tx);
        let debounce = self.debounce;
        let query = raw_input.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }

            let input = query.clone();
            let results = match tokio::task::spawn_blocking(move || lookup.lookup(&input)).await {
                Ok(results) => results,
                Err(e) => {
                    warn!("Search task failed for '{query}': {e}");
                    return;
                }
            };

            if current.load(Ordering::SeqCst) != generation {
                debug!("Discarding stale results for '{query}' (generation {generation})");
                return;
            }

            publish(
                &tx,
                SearchOutcome {
                    generation,
                    query,
                    results,
                },
            );
        });

        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        generation
    }

    /// Drop any pending work without publishing anything.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_pending();
    }

    fn abort_pending(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

/// Replace the published outcome unless it is already newer.
fn publish(tx: &watch::Sender<SearchOutcome>, outcome: SearchOutcome) -> bool {
    tx.send_if_modified(|current| {
        if outcome.generation > current.generation {
            debug!(
                "Publishing {} results for generation {}",
                outcome.results.len(),
                outcome.generation
            );
            *current = outcome;
            true
        } else {
            false
        }
    })
}
