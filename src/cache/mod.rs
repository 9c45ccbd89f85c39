//! Cache Module
//!
//! Provides in-memory request caching with TTL expiration and single-flight
//! deduplication of concurrent requests.

mod entry;
mod key;
mod request;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use key::{generate_key, generate_key_default};
pub use request::RequestCache;
pub use stats::CacheStats;
pub use store::CacheStore;
