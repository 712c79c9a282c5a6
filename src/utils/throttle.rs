//! Log throttling for engine threads
//!
//! A failing encryptor or a misbehaving callback fires once per frame; on a
//! media thread that means hundreds of identical warnings per second. The
//! throttler lets the first one through and counts the rest.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::LogConfig;

struct Entry {
    last_logged: Instant,
    suppressed: u64,
}

/// Limits how often the same message is logged
///
/// # Example
///
/// ```rust
/// use rtc_bridge::utils::LogThrottler;
/// use std::time::Duration;
///
/// let throttler = LogThrottler::new(Duration::from_secs(5));
///
/// assert_eq!(throttler.check("encrypt_failed"), Some(0));
/// assert_eq!(throttler.check("encrypt_failed"), None);
/// ```
pub struct LogThrottler {
    entries: Mutex<HashMap<&'static str, Entry>>,
    interval: Duration,
}

impl LogThrottler {
    /// Create a throttler with the given minimum interval per key
    pub fn new(interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// Create a throttler from the logging configuration
    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(Duration::from_secs(config.throttle_secs))
    }

    /// Check whether `key` may be logged now
    ///
    /// Returns `Some(n)` when the message should be emitted, where `n` is the
    /// number of occurrences suppressed since the last emitted one.
    pub fn check(&self, key: &'static str) -> Option<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.last_logged) < self.interval => {
                entry.suppressed += 1;
                None
            }
            Some(entry) => {
                let suppressed = entry.suppressed;
                entry.last_logged = now;
                entry.suppressed = 0;
                Some(suppressed)
            }
            None => {
                entries.insert(
                    key,
                    Entry {
                        last_logged: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }
}

impl Default for LogThrottler {
    fn default() -> Self {
        Self::from_config(&LogConfig::default())
    }
}
