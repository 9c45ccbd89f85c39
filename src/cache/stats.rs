//! Cache Statistics Module
//!
//! Tracks how requests were served: from cache, by joining an in-flight
//! request, or by issuing a new one.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Requests answered from a valid entry
    pub hits: u64,
    /// Requests that had to invoke the request function
    pub misses: u64,
    /// Requests that awaited an already in-flight request
    pub joined: u64,
    /// Issued requests that failed or were aborted
    pub failures: u64,
    /// Expired entries removed on access or by cleanup
    pub evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Requests currently in flight
    pub pending_requests: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Fraction of requests that avoided a new call.
    ///
    /// Joined requests count as hits. Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let saved = self.hits + self.joined;
        let total = saved + self.misses;
        if total == 0 {
            0.0
        } else {
            saved as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Records a request answered from a valid entry.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Records a request that issued a new call.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Join ==
    /// Records a request that joined one already in flight.
    pub fn record_join(&mut self) {
        self.joined += 1;
    }

    // == Record Failure ==
    /// Records an issued request that failed or was aborted.
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    // == Record Eviction ==
    /// Records an expired entry being removed.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Set Total Entries ==
    /// Updates the current entry count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }

    // == Set Pending Requests ==
    /// Updates the current in-flight request count.
    pub fn set_pending_requests(&mut self, count: usize) {
        self.pending_requests = count;
    }
}
