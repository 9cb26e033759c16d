//! Dedup Ledger
//!
//! Time-windowed record of recently shown achievement keys. Pruned
//! opportunistically on each check rather than by a timer.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Records when each dedup key was last admitted
#[derive(Debug)]
pub struct DedupLedger {
    entries: HashMap<String, Instant>,
    /// Repeats inside this window are suppressed
    window: Duration,
    /// Entries older than this are dropped on the next check
    retention: Duration,
}

impl DedupLedger {
    pub fn new(window: Duration, retention: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            window,
            retention: retention.max(window),
        }
    }

    /// Admit `key` at `now` unless it was admitted within the window.
    ///
    /// Returns `true` and records the key when admitted, `false` when the
    /// key is a repeat. Stale entries are swept first.
    pub fn check_and_record(&mut self, key: &str, now: Instant) -> bool {
        self.prune(now);

        if let Some(last) = self.entries.get(key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        self.entries.insert(key.to_string(), now);
        true
    }

    fn prune(&mut self, now: Instant) {
        let retention = self.retention;
        self.entries
            .retain(|_, seen| now.saturating_duration_since(*seen) <= retention);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
