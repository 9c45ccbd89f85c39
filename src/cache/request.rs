//! Request Cache Module
//!
//! Memoizes asynchronous fetches by key and collapses concurrent fetches for
//! the same key into a single in-flight request.
//!
//! Every issued request runs as its own tokio task and is exposed to callers
//! as a [`Shared`] future. Callers arriving while it is in flight await the
//! same future, so they observe the same value or the same error. The
//! registration is removed by a guard owned by the task, which runs whether
//! the request succeeds, fails or panics.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStore};
use crate::config::Config;
use crate::error::{RequestError, Result};

type SharedRequest<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// An in-flight request registered under a key.
struct Pending<V, E> {
    /// Distinguishes this request from a later one issued for the same key
    id: u64,
    future: SharedRequest<V, E>,
}

struct State<V, E> {
    store: CacheStore<V>,
    pending: HashMap<String, Pending<V, E>>,
    next_id: u64,
}

enum Lookup<V, E> {
    Hit(V),
    Join(SharedRequest<V, E>),
}

impl<V, E> State<V, E> {
    /// Removes the pending registration for `key` if it is still request `id`.
    fn take_pending(&mut self, key: &str, id: u64) -> bool {
        match self.pending.get(key) {
            Some(pending) if pending.id == id => {
                self.pending.remove(key);
                true
            }
            _ => false,
        }
    }
}

impl<V: Clone, E> State<V, E> {
    fn lookup(&mut self, key: &str) -> Option<Lookup<V, E>> {
        if let Some(data) = self.store.get_valid(key) {
            self.store.stats_mut().record_hit();
            return Some(Lookup::Hit(data));
        }

        let future = self.pending.get(key)?.future.clone();
        self.store.stats_mut().record_join();
        Some(Lookup::Join(future))
    }
}

// == Request Cache ==
/// Handle to a request cache.
///
/// Cloning is cheap and every clone shares the same entries and in-flight
/// requests. Build one at start-up and hand clones to whatever needs it.
pub struct RequestCache<V, E = anyhow::Error> {
    inner: Arc<Mutex<State<V, E>>>,
}

impl<V, E> Clone for RequestCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> fmt::Debug for RequestCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("RequestCache")
            .field("entries", &state.store.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl<V, E> Default for RequestCache<V, E> {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl<V, E> RequestCache<V, E> {
    // == Constructor ==
    /// Creates an empty cache whose stored results live for `default_ttl`.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                store: CacheStore::new(default_ttl),
                pending: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl)
    }

    /// TTL applied to results stored by `set` and `execute_request`.
    pub fn default_ttl(&self) -> Duration {
        self.inner.lock().store.default_ttl()
    }

    // == Has ==
    /// True if an entry exists for `key`, expired or not.
    pub fn has(&self, key: &str) -> bool {
        self.inner.lock().store.has(key)
    }

    // == Set ==
    /// Stores `data` under `key` with the default TTL.
    pub fn set(&self, key: impl Into<String>, data: V) {
        self.inner.lock().store.set(key, data);
    }

    /// Stores `data` under `key` with an explicit TTL.
    pub fn set_with_ttl(&self, key: impl Into<String>, data: V, ttl: Duration) {
        self.inner.lock().store.set_with_ttl(key, data, ttl);
    }

    // == Is Expired ==
    /// True if there is no entry for `key` or its TTL has elapsed.
    pub fn is_expired(&self, key: &str) -> bool {
        self.inner.lock().store.is_expired(key)
    }

    // == Delete ==
    /// Removes the entry for `key` and forgets any request in flight for it.
    ///
    /// A forgotten request still completes for the callers awaiting it, but
    /// its result is not stored.
    pub fn delete(&self, key: &str) {
        let mut state = self.inner.lock();
        state.store.delete(key);
        state.pending.remove(key);
    }

    // == Cleanup ==
    /// Evicts every expired entry. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        self.inner.lock().store.cleanup_expired()
    }

    // == Invalidate Pattern ==
    /// Deletes every key containing `pattern` (plain substring match),
    /// including requests still in flight under such keys.
    ///
    /// Returns the number of stored entries removed.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut state = self.inner.lock();
        let keys = state.store.keys_containing(pattern);
        for key in &keys {
            state.store.delete(key);
        }
        state.pending.retain(|key, _| !key.contains(pattern));

        debug!(pattern, removed = keys.len(), "Invalidated cache entries");
        keys.len()
    }

    // == Clear ==
    /// Drops all entries and forgets all in-flight requests.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.store.clear();
        state.pending.clear();
    }

    // == Length ==
    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    // == Is Empty ==
    /// True if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    // == Pending Count ==
    /// Number of requests currently in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    // == Stats ==
    /// Snapshot of the counters, with current entry and in-flight counts.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        let mut stats = state.store.stats();
        stats.set_pending_requests(state.pending.len());
        stats
    }
}

impl<V: Clone, E> RequestCache<V, E> {
    // == Get ==
    /// Raw lookup without any expiry check.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.inner.lock().store.get(key).cloned()
    }

    // == Get Valid ==
    /// Returns the data for `key` if present and fresh.
    ///
    /// A stale entry is evicted by the lookup. Requests in flight for the
    /// key are left untouched.
    pub fn get_valid(&self, key: &str) -> Option<V> {
        self.inner.lock().store.get_valid(key)
    }
}

impl<V, E> RequestCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    // == Execute Request ==
    /// Returns the value for `key`, calling `request_fn` only when needed.
    ///
    /// 1. A fresh stored value is returned without calling `request_fn`.
    /// 2. If a request for `key` is already in flight, its outcome is awaited.
    /// 3. Otherwise `request_fn` is called and its future spawned. A success
    ///    is stored with the default TTL; a failure is logged and returned,
    ///    never stored.
    ///
    /// Once spawned, a request runs to completion even if every caller stops
    /// awaiting it.
    ///
    /// # Errors
    /// Returns [`RequestError::NoRuntime`] without calling `request_fn` if a
    /// new request must be issued outside a tokio runtime.
    pub async fn execute_request<F, Fut>(&self, key: &str, request_fn: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        let joined = {
            let mut state = self.inner.lock();
            match state.lookup(key) {
                Some(Lookup::Hit(data)) => {
                    debug!(key, "Request served from cache");
                    return Ok(data);
                }
                Some(Lookup::Join(future)) => Some(future),
                None => None,
            }
        };
        if let Some(future) = joined {
            debug!(key, "Joining in-flight request");
            return future.await;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(key, "No tokio runtime running, request not issued");
            return Err(RequestError::NoRuntime {
                key: key.to_string(),
            });
        };

        // request_fn is user code, so it runs without the lock held.
        let request = request_fn();

        let future = {
            let mut state = self.inner.lock();
            match state.lookup(key) {
                Some(Lookup::Hit(data)) => return Ok(data),
                Some(Lookup::Join(future)) => future,
                None => self.issue(&mut state, &runtime, key, request),
            }
        };
        future.await
    }

    fn issue<Fut>(
        &self,
        state: &mut State<V, E>,
        runtime: &Handle,
        key: &str,
        request: Fut,
    ) -> SharedRequest<V, E>
    where
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        state.store.stats_mut().record_miss();
        state.next_id += 1;
        let id = state.next_id;

        let guard = PendingGuard {
            state: Arc::downgrade(&self.inner),
            key: key.to_string(),
            id,
            settled: false,
        };
        let task = runtime.spawn(async move {
            let mut guard = guard;
            let outcome = request.await;
            guard.settle(outcome)
        });

        let task_key = key.to_string();
        let future = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(key = %task_key, error = %err, "Request task terminated before completing");
                    Err(RequestError::Aborted { key: task_key })
                }
            }
        }
        .boxed()
        .shared();

        state.pending.insert(
            key.to_string(),
            Pending {
                id,
                future: future.clone(),
            },
        );
        debug!(key, id, "Issued new request");
        future
    }
}

// == Pending Guard ==
/// Owned by a request task; unregisters the request when it settles.
///
/// If the task unwinds or is cancelled before `settle` runs, `Drop` still
/// unregisters it so the next caller can retry.
struct PendingGuard<V, E> {
    state: Weak<Mutex<State<V, E>>>,
    key: String,
    id: u64,
    settled: bool,
}

impl<V: Clone, E: fmt::Display> PendingGuard<V, E> {
    fn settle(&mut self, outcome: std::result::Result<V, E>) -> Result<V, E> {
        self.settled = true;

        let Some(inner) = self.state.upgrade() else {
            // Cache was dropped while the request was in flight
            return outcome.map_err(|err| RequestError::Failed(Arc::new(err)));
        };
        let mut state = inner.lock();
        let registered = state.take_pending(&self.key, self.id);

        match outcome {
            Ok(data) => {
                if registered {
                    state.store.set(self.key.clone(), data.clone());
                } else {
                    debug!(key = %self.key, "Request was invalidated in flight, result not stored");
                }
                Ok(data)
            }
            Err(err) => {
                state.store.stats_mut().record_failure();
                warn!(key = %self.key, error = %err, "Request failed");
                Err(RequestError::Failed(Arc::new(err)))
            }
        }
    }
}

impl<V, E> Drop for PendingGuard<V, E> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(inner) = self.state.upgrade() {
            let mut state = inner.lock();
            state.take_pending(&self.key, self.id);
            state.store.stats_mut().record_failure();
        }
    }
}
