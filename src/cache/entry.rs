//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A stored request result with the time it was stored and its TTL.
///
/// Timestamps come from the tokio clock, so a paused test runtime can
/// advance them deterministically.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub data: V,
    /// When the entry was stored
    pub timestamp: Instant,
    /// How long the entry stays valid
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(data: V, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: Instant::now(),
            ttl,
        }
    }

    // == Age ==
    /// Time elapsed since the entry was stored.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.timestamp)
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry whose age equals its TTL is still valid;
    /// it expires once the age strictly exceeds the TTL.
    pub fn is_expired(&self) -> bool {
        self.age() > self.ttl
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }
}
