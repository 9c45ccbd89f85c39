//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::RequestCache;

/// Handle to a running cleanup task.
///
/// Dropping the handle aborts the task; call [`CleanupTask::stop`] to abort
/// it and wait until it has actually finished.
#[derive(Debug)]
pub struct CleanupTask {
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Stops the task and waits for it to finish.
    pub async fn stop(mut self) {
        self.handle.abort();
        // Only a cancellation error is possible here; the loop never returns
        let _ = (&mut self.handle).await;
        info!("TTL cleanup task stopped");
    }

    /// True once the task has stopped running.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a background task that calls `cleanup()` on `cache` every `period`.
///
/// The first sweep happens one full period after spawning. The task runs
/// until the returned [`CleanupTask`] is stopped or dropped.
///
/// # Panics
/// Panics if called outside a tokio runtime or if `period` is zero.
///
/// # Example
/// ```ignore
/// let cache: RequestCache<String> = RequestCache::from_config(&config);
/// let cleanup = spawn_cleanup_task(cache.clone(), config.cleanup_interval);
/// // Later, during shutdown:
/// cleanup.stop().await;
/// ```
pub fn spawn_cleanup_task<V, E>(cache: RequestCache<V, E>, period: Duration) -> CleanupTask
where
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let handle = tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} ms",
            period.as_millis()
        );

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let removed = cache.cleanup();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    });

    CleanupTask { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache: RequestCache<String> = RequestCache::new(PERIOD);
        cache.set_with_ttl("expire_soon", "value".to_string(), Duration::from_secs(1));

        let task = spawn_cleanup_task(cache.clone(), PERIOD);

        // Expired, but nothing has swept it yet
        sleep(Duration::from_secs(2)).await;
        assert!(cache.has("expire_soon"));

        sleep(PERIOD).await;
        assert!(
            !cache.has("expire_soon"),
            "Expired entry should have been cleaned up"
        );

        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache: RequestCache<String> = RequestCache::new(PERIOD);
        cache.set_with_ttl("long_lived", "value".to_string(), Duration::from_secs(3600));

        let task = spawn_cleanup_task(cache.clone(), PERIOD);
        sleep(PERIOD * 2 + Duration::from_secs(1)).await;

        assert_eq!(cache.get_valid("long_lived").as_deref(), Some("value"));
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_task_no_longer_sweeps() {
        let cache: RequestCache<u32> = RequestCache::new(PERIOD);
        let task = spawn_cleanup_task(cache.clone(), PERIOD);
        task.stop().await;

        cache.set_with_ttl("stale", 1, Duration::from_secs(1));
        sleep(PERIOD * 2).await;

        // Still present: only an access or a sweep evicts it
        assert!(cache.has("stale"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_aborts_task() {
        let cache: RequestCache<u32> = RequestCache::new(PERIOD);
        let task = spawn_cleanup_task(cache.clone(), PERIOD);
        assert!(!task.is_finished());
        drop(task);

        cache.set_with_ttl("stale", 1, Duration::from_secs(1));
        sleep(PERIOD * 2).await;
        assert!(cache.has("stale"));
    }
}
