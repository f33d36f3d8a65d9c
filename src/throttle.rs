//! Fixed-window request throttle.
//!
//! Every key gets a counter that starts with its first attempt. Attempts
//! inside the window bump the counter; once it passes the threshold the
//! attempt is rejected. The first attempt at or after the window's end starts
//! a fresh window with a count of one.
//!
//! Being a fixed window, up to twice the threshold can get through around a
//! window boundary (the tail of one window plus the head of the next).

use crate::clock::{Clock, SystemClock};
use crate::rate_limit_config::RateLimitConfig;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottleError {
    #[error("Throttle key must not be empty")]
    InvalidKey,
}

/// Counter state for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleEntry {
    pub key: String,
    pub count: u32,
    pub window_start: Instant,
    pub last_seen: Instant,
}

impl ThrottleEntry {
    fn start(key: &str, now: Instant) -> Self {
        Self {
            key: key.to_string(),
            count: 1,
            window_start: now,
            last_seen: now,
        }
    }

    fn window_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Outcome of a single throttle check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted {
        count: u32,
        remaining: u32,
    },
    Rejected {
        count: u32,
        threshold: u32,
        /// Time left until the current window expires
        resets_in: Duration,
    },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    pub fn count(&self) -> u32 {
        match self {
            Decision::Admitted { count, .. } | Decision::Rejected { count, .. } => *count,
        }
    }
}

pub struct RequestThrottle {
    config: RateLimitConfig,
    entries: Mutex<HashMap<String, ThrottleEntry>>,
    clock: Arc<dyn Clock>,
}

impl RequestThrottle {
    /// Create a throttle driven by the system clock
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Record an attempt for `key` at `now` and decide whether it is admitted
    pub fn check(&self, key: &str, now: Instant) -> Result<Decision, ThrottleError> {
        if key.trim().is_empty() {
            return Err(ThrottleError::InvalidKey);
        }

        let threshold = self.config.threshold;
        let window = self.config.window;
        let mut entries = self.lock_entries();

        let entry = match entries.entry(key.to_string()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                vacant.insert(ThrottleEntry::start(key, now));
                return Ok(Decision::Admitted {
                    count: 1,
                    remaining: threshold.saturating_sub(1),
                });
            }
        };

        if entry.window_expired(now, window) {
            *entry = ThrottleEntry::start(key, now);
            return Ok(Decision::Admitted {
                count: 1,
                remaining: threshold.saturating_sub(1),
            });
        }

        entry.count = entry.count.saturating_add(1);
        entry.last_seen = entry.last_seen.max(now);

        if entry.count > threshold {
            let elapsed = now.saturating_duration_since(entry.window_start);
            Ok(Decision::Rejected {
                count: entry.count,
                threshold,
                resets_in: window.saturating_sub(elapsed),
            })
        } else {
            Ok(Decision::Admitted {
                count: entry.count,
                remaining: threshold - entry.count,
            })
        }
    }

    /// Same as [`check`](Self::check) with the instant taken from the clock
    pub fn check_now(&self, key: &str) -> Result<Decision, ThrottleError> {
        self.check(key, self.clock.now())
    }

    /// Snapshot of the entry tracked for `key`
    pub fn entry(&self, key: &str) -> Option<ThrottleEntry> {
        self.lock_entries().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict entries whose window is over and that have been idle for at
    /// least the retention period. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let window = self.config.window;
        let retention = self.config.retention;
        let mut entries = self.lock_entries();
        let before = entries.len();

        entries.retain(|_, entry| {
            !(entry.window_expired(now, window)
                && now.saturating_duration_since(entry.last_seen) >= retention)
        });

        before - entries.len()
    }

    pub fn sweep_now(&self) -> usize {
        self.sweep(self.clock.now())
    }

    // Every critical section leaves the map consistent, so a panic elsewhere
    // while holding the lock does not invalidate it.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, ThrottleEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
