// crates/cache/src/lib.rs
//! TTL cache with single-flight refresh
//!
//! Keys expire after a per-entry time-to-live. When a key is missing or
//! expired, concurrent callers are coalesced onto a single fetch that runs
//! on its own task and survives the disconnect of whoever started it.

mod ttl_cache;

pub use ttl_cache::TtlCache;
