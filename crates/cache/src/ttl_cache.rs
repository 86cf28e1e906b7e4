// crates/cache/src/ttl_cache.rs
//! TTL cache with single-flight refresh

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// One stored payload. Replacement is a whole-entry map insert, so readers
/// see either the old entry or the new one, never a partial update.
#[derive(Debug)]
struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
    ttl: Duration,
}

type FlightMap<T, E> = HashMap<String, broadcast::Sender<Result<T, E>>>;

/// In-process TTL cache keyed by feed key.
///
/// Expiry is checked lazily at read time; there is no background sweeper and
/// no eviction beyond expiry (key count is bounded by the configured feeds).
/// `get_or_fetch` guarantees at most one in-flight fetch per key: concurrent
/// callers share the single fetch's result or failure through a broadcast
/// channel. The fetch itself runs on a detached task owned by the flight
/// slot, so it outlives the caller that started it. Locks guard only the
/// maps themselves, never the fetch.
#[derive(Debug)]
pub struct TtlCache<T, E> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<T>>>>,
    flights: Arc<Mutex<FlightMap<T, E>>>,
    serve_stale_on_error: bool,
}

impl<T, E> Default for TtlCache<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> TtlCache<T, E> {
    /// Creates an empty cache with serve-stale-on-error disabled
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            flights: Arc::new(Mutex::new(HashMap::new())),
            serve_stale_on_error: false,
        }
    }

    /// Enables or disables falling back to the last good payload when a
    /// refresh fails
    pub fn with_serve_stale_on_error(mut self, enabled: bool) -> Self {
        self.serve_stale_on_error = enabled;
        self
    }

    /// Returns whether stale fallback on refresh failure is enabled
    pub fn serves_stale_on_error(&self) -> bool {
        self.serve_stale_on_error
    }

    /// Number of stored entries, fresh or stale
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    // A panicked lock holder leaves the maps structurally intact, so recover
    // the guard instead of propagating poisoning.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_flights(&self) -> MutexGuard<'_, FlightMap<T, E>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone, E: Clone> TtlCache<T, E> {
    /// Returns a fresh payload and its remaining TTL, or `None` on miss or
    /// expiry
    pub fn get(&self, key: &str) -> Option<(T, Duration)> {
        let entries = self.lock_entries();
        let entry = entries.get(key)?;
        let elapsed = entry.stored_at.elapsed();
        if elapsed < entry.ttl {
            Some((entry.value.clone(), entry.ttl - elapsed))
        } else {
            None
        }
    }

    /// Returns the stored payload regardless of freshness
    pub fn get_stale(&self, key: &str) -> Option<T> {
        self.lock_entries().get(key).map(|e| e.value.clone())
    }

    /// Stores a payload, atomically replacing any previous entry for the key
    pub fn insert(&self, key: &str, value: T, ttl: Duration) {
        self.lock_entries().insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Returns the fresh payload for `key`, running `fetch_fn` at most once
    /// per key across all concurrent callers.
    ///
    /// The fetch runs on its own task, owned by the flight slot rather than
    /// by the initiating caller: a caller that disconnects mid-fetch detaches
    /// from the work instead of cancelling it, and the remaining waiters
    /// still receive the shared result. A failed fetch never overwrites a
    /// stored entry; with serve-stale-on-error enabled it yields the last
    /// good payload instead of the error when one exists.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch_fn: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        loop {
            if let Some((value, _)) = self.get(key) {
                return Ok(value);
            }

            // Lock order is always flights -> entries. The guard lives in
            // this block so it is released before any await.
            let existing_rx = {
                let mut flights = self.lock_flights();
                // a refresh may have landed while we waited for the lock
                if let Some((value, _)) = self.get(key) {
                    return Ok(value);
                }

                match flights.get(key) {
                    Some(tx) => Some(tx.subscribe()),
                    None => {
                        // This caller initiates the flight.
                        let (tx, _) = broadcast::channel(1);
                        flights.insert(key.to_string(), tx);
                        None
                    }
                }
            };

            if let Some(mut rx) = existing_rx {
                match rx.recv().await {
                    Ok(shared) => return shared,
                    // the flight ended without publishing; take another turn
                    Err(_) => continue,
                }
            }

            let handle = self.spawn_flight(key.to_string(), ttl, fetch_fn());

            // Awaiting the handle rather than the broadcast keeps the flight
            // alive when this caller is dropped: the handle detaches, the
            // task finishes the fetch and publishes to the waiters.
            return match handle.await {
                Ok(shared) => shared,
                Err(join_err) => match join_err.try_into_panic() {
                    // a panicking fetch propagates to the initiating caller
                    Ok(panic) => std::panic::resume_unwind(panic),
                    // the flight task is never aborted
                    Err(join_err) => std::panic::resume_unwind(Box::new(join_err)),
                },
            };
        }
    }

    fn spawn_flight(
        &self,
        key: String,
        ttl: Duration,
        fetch: impl Future<Output = Result<T, E>> + Send + 'static,
    ) -> JoinHandle<Result<T, E>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let flights = Arc::clone(&self.flights);
        let serve_stale = self.serve_stale_on_error;

        tokio::spawn(async move {
            // The guard clears the slot even if the fetch panics, so waiters
            // wake up and retry instead of waiting forever.
            let mut guard = FlightGuard {
                flights,
                key,
                armed: true,
            };

            let shared = match fetch.await {
                Ok(value) => {
                    entries
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(
                            guard.key.clone(),
                            CacheEntry {
                                value: value.clone(),
                                stored_at: Instant::now(),
                                ttl,
                            },
                        );
                    Ok(value)
                }
                Err(err) => {
                    let stale = if serve_stale {
                        entries
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .get(&guard.key)
                            .map(|e| e.value.clone())
                    } else {
                        None
                    };
                    match stale {
                        Some(value) => {
                            log::warn!("refresh of '{}' failed, serving stale payload", guard.key);
                            Ok(value)
                        }
                        None => Err(err),
                    }
                }
            };

            // The entry is stored before the flight slot clears, so a caller
            // that just missed the broadcast finds the fresh entry on its
            // next turn.
            if let Some(tx) = guard.disarm() {
                let _ = tx.send(shared.clone());
            }

            shared
        })
    }
}

/// Clears a key's in-flight slot when the flight ends, published or not.
struct FlightGuard<T, E> {
    flights: Arc<Mutex<FlightMap<T, E>>>,
    key: String,
    armed: bool,
}

impl<T, E> FlightGuard<T, E> {
    /// Removes the slot, handing the sender back for the final broadcast
    fn disarm(&mut self) -> Option<broadcast::Sender<Result<T, E>>> {
        self.armed = false;
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key)
    }
}

impl<T, E> Drop for FlightGuard<T, E> {
    fn drop(&mut self) {
        if self.armed {
            // dropping the sender closes the channel; waiters see the
            // closure and retry rather than hang
            self.flights
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.key);
        }
    }
}
