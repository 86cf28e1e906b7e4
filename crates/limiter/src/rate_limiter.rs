// crates/limiter/src/rate_limiter.rs
//! Windowed admission control

use crate::error::{LimiterResult, RateLimitError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// One client's current window
#[derive(Debug)]
struct ClientWindow {
    window_start: Instant,
    count: u32,
}

/// Per-client windowed rate limiter.
///
/// Each feed endpoint owns one instance with its own (limit, window) pair;
/// nothing is process-global. A client's first call, or first call after its
/// window elapsed, opens a fresh window with count 1. The call that would
/// push the count past the limit is denied and the count saturates there, so
/// hammering a denied endpoint does not grow state without bound.
///
/// Every `admit` sweeps expired client entries. The sweep is O(clients),
/// which is fine for a single-process deployment at moderate traffic; this
/// design does not scale past that and is not meant to.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, ClientWindow>>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `limit` requests per client per `window`
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Admits or denies one request from `client_id`.
    ///
    /// Admission is checked strictly before incrementing: a denied call never
    /// bumps the counter past the limit.
    pub fn admit(&self, client_id: &str) -> LimiterResult<()> {
        let mut clients = self.lock_clients();
        let now = Instant::now();

        // opportunistic purge of clients whose window has elapsed
        let window = self.window;
        clients.retain(|_, w| now.duration_since(w.window_start) <= window);

        let entry = clients
            .entry(client_id.to_string())
            .or_insert(ClientWindow {
                window_start: now,
                count: 0,
            });

        if entry.count < self.limit {
            entry.count += 1;
            Ok(())
        } else {
            let retry_after =
                (entry.window_start + self.window).saturating_duration_since(now);
            log::debug!(
                "rate limit hit for client {} ({} per {:?})",
                client_id,
                self.limit,
                self.window
            );
            Err(RateLimitError::Exceeded {
                limit: self.limit,
                window: self.window,
                retry_after,
            })
        }
    }

    /// Gets the maximum number of requests allowed per window
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Gets the time window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of clients currently tracked (expired entries not yet swept
    /// count too)
    pub fn tracked_clients(&self) -> usize {
        self.lock_clients().len()
    }

    // Counters stay structurally valid even if a holder panicked, so recover
    // from poisoning instead of failing the request.
    fn lock_clients(&self) -> MutexGuard<'_, HashMap<String, ClientWindow>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
