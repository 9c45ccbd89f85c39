//! Configuration Module
//!
//! Handles loading request cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Default entry TTL in milliseconds (5 minutes)
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// Default interval between cleanup sweeps in milliseconds (5 minutes)
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Request cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TTL applied to results stored by `set` and `execute_request`
    pub default_ttl: Duration,
    /// Background cleanup task interval
    pub cleanup_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REQUEST_CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `REQUEST_CACHE_CLEANUP_INTERVAL_MS` - Cleanup frequency in milliseconds (default: 300000)
    pub fn from_env() -> Self {
        Self {
            default_ttl: Duration::from_millis(millis_from_env(
                "REQUEST_CACHE_DEFAULT_TTL_MS",
                DEFAULT_TTL_MS,
            )),
            cleanup_interval: Duration::from_millis(millis_from_env(
                "REQUEST_CACHE_CLEANUP_INTERVAL_MS",
                DEFAULT_CLEANUP_INTERVAL_MS,
            )),
        }
    }
}

fn millis_from_env(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_millis(DEFAULT_TTL_MS),
            cleanup_interval: Duration::from_millis(DEFAULT_CLEANUP_INTERVAL_MS),
        }
    }
}
