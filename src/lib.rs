//! Request Cache - memoized, deduplicated asynchronous requests
//!
//! Caches the results of asynchronous fetches by key with TTL expiration,
//! and collapses concurrent fetches for the same key into one request.

pub mod cache;
pub mod config;
pub mod error;
pub mod retry;
pub mod tasks;

pub use cache::{generate_key, generate_key_default, CacheEntry, CacheStats, RequestCache};
pub use config::Config;
pub use error::{KeyError, RequestError};
pub use retry::{execute_with_retry, RetryPolicy};
pub use tasks::{spawn_cleanup_task, CleanupTask};
