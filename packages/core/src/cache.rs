//! Request-coalescing, keyed query cache.
//!
//! Each key owns a `watch` channel carrying the most recently settled
//! [`FetchState`]. A fetch for a key either
//!
//! - returns the cached success while it is within TTL,
//! - joins the attempt already in flight, or
//! - starts exactly one new attempt.
//!
//! Attempts run on their own Tokio task, so a caller that is dropped
//! mid-await never strands the other callers waiting on the same attempt.
//! The completion of an attempt is the only writer of an entry's state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::error::AppError;

/// Outcome of a keyed fetch.
#[derive(Debug)]
pub enum FetchState<T> {
    Pending,
    Success(Arc<T>),
    Failure(AppError),
}

impl<T> Clone for FetchState<T> {
    fn clone(&self) -> Self {
        match self {
            FetchState::Pending => FetchState::Pending,
            FetchState::Success(value) => FetchState::Success(Arc::clone(value)),
            FetchState::Failure(err) => FetchState::Failure(err.clone()),
        }
    }
}

impl<T> FetchState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchState::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchState::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            FetchState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&AppError> {
        match self {
            FetchState::Failure(err) => Some(err),
            _ => None,
        }
    }
}

/// Latest settled state of a key together with the attempt that produced it.
/// `attempt == 0` means nothing has settled yet.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
    pub attempt: u64,
    pub state: FetchState<T>,
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            attempt: self.attempt,
            state: self.state.clone(),
        }
    }
}

struct Entry<T> {
    tx: Arc<watch::Sender<QuerySnapshot<T>>>,
    in_flight: Option<u64>,
    last_attempt: u64,
    settled_at: Option<Instant>,
}

impl<T> Entry<T> {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(QuerySnapshot {
            attempt: 0,
            state: FetchState::Pending,
        });
        Self {
            tx: Arc::new(tx),
            in_flight: None,
            last_attempt: 0,
            settled_at: None,
        }
    }

    /// Only successes are served from cache; a failure ends with its attempt.
    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        if !self.tx.borrow().state.is_success() {
            return false;
        }
        match (self.settled_at, ttl) {
            (Some(_), None) => true,
            (Some(settled_at), Some(ttl)) => settled_at.elapsed() <= ttl,
            (None, _) => false,
        }
    }
}

type Entries<T> = Arc<Mutex<HashMap<String, Entry<T>>>>;

/// In-memory keyed cache with request coalescing.
///
/// Cloning is cheap and clones share the same entries.
pub struct QueryCache<T> {
    entries: Entries<T>,
    ttl: Option<Duration>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    /// `ttl = None` keeps a success for the lifetime of the cache.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Resolve `key`, running `load` only when no fresh value and no
    /// in-flight attempt exist. Every caller joined to an attempt observes
    /// the same terminal state.
    pub async fn fetch<F, Fut>(&self, key: &str, load: F) -> FetchState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let (mut rx, attempt, start) = {
            let mut entries = lock(&self.entries);
            let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);

            if let Some(attempt) = entry.in_flight {
                tracing::debug!("Joining in-flight fetch for '{}' (attempt {})", key, attempt);
                (entry.tx.subscribe(), attempt, None)
            } else if entry.is_fresh(self.ttl) {
                return entry.tx.borrow().state.clone();
            } else {
                entry.last_attempt += 1;
                let attempt = entry.last_attempt;
                entry.in_flight = Some(attempt);
                (entry.tx.subscribe(), attempt, Some(Arc::clone(&entry.tx)))
            }
        };

        // The attempt is already marked in flight, so `load` runs without the
        // map lock and may use this cache itself.
        if let Some(tx) = start {
            tracing::debug!("Starting fetch for '{}' (attempt {})", key, attempt);
            spawn_attempt(Arc::clone(&self.entries), key.to_string(), attempt, tx, load());
        }

        let settled = rx
            .wait_for(|snapshot| snapshot.attempt >= attempt)
            .await
            .map(|snapshot| snapshot.state.clone());

        match settled {
            Ok(state) => state,
            Err(_) => FetchState::Failure(AppError::Network(format!(
                "fetch for '{}' ended without settling",
                key
            ))),
        }
    }

    /// Most recently settled state, without starting a fetch.
    pub fn peek(&self, key: &str) -> FetchState<T> {
        lock(&self.entries)
            .get(key)
            .map(|entry| entry.tx.borrow().state.clone())
            .unwrap_or(FetchState::Pending)
    }

    /// Receiver notified every time an attempt for `key` settles.
    pub fn subscribe(&self, key: &str) -> watch::Receiver<QuerySnapshot<T>> {
        let mut entries = lock(&self.entries);
        entries
            .entry(key.to_string())
            .or_insert_with(Entry::new)
            .tx
            .subscribe()
    }

    /// Mark the cached value stale. The last settled state stays visible
    /// until the next attempt settles.
    pub fn invalidate(&self, key: &str) {
        if let Some(entry) = lock(&self.entries).get_mut(key) {
            entry.settled_at = None;
        }
    }

    pub fn is_fetching(&self, key: &str) -> bool {
        lock(&self.entries)
            .get(key)
            .map_or(false, |entry| entry.in_flight.is_some())
    }

    /// Callers currently waiting on or subscribed to `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        lock(&self.entries)
            .get(key)
            .map_or(0, |entry| entry.tx.receiver_count())
    }
}

fn spawn_attempt<T, Fut>(
    entries: Entries<T>,
    key: String,
    attempt: u64,
    tx: Arc<watch::Sender<QuerySnapshot<T>>>,
    fut: Fut,
) where
    T: Send + Sync + 'static,
    Fut: Future<Output = Result<T, AppError>> + Send + 'static,
{
    tokio::spawn(async move {
        let state = match tokio::spawn(fut).await {
            Ok(Ok(value)) => FetchState::Success(Arc::new(value)),
            Ok(Err(err)) => FetchState::Failure(err),
            Err(join_err) => {
                FetchState::Failure(AppError::Network(format!("fetch task failed: {}", join_err)))
            }
        };

        // Publish under the map lock so no caller can observe the entry as
        // idle while the channel still holds the previous state.
        let mut entries = lock(&entries);
        if let Some(entry) = entries.get_mut(&key) {
            if entry.in_flight == Some(attempt) {
                entry.in_flight = None;
                entry.settled_at = Some(Instant::now());
            }
        }
        tx.send_replace(QuerySnapshot { attempt, state });
    });
}

fn lock<T>(entries: &Mutex<HashMap<String, Entry<T>>>) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
    // The map is never left half-updated, so a poisoned lock is still usable.
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
