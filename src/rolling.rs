//! # Rolling Window Store
//! Per-user sliding window of scored samples (default 300s).
//!
//! Each user owns a `VecDeque<ScoredSample>` in insertion order. A write
//! appends at the tail and prunes from the head everything older than
//! `timestamp - window` of the sample just written. Reads copy the scores out
//! and compute the median without holding the lock.
//!
//! Known quirk: the prune cutoff is anchored on the *latest inserted* sample,
//! not on a high-water mark, and pruning only ever looks at the head. With
//! out-of-order timestamps a late, older event lowers the cutoff for its own
//! write (so stale samples survive it), and stale samples queued behind a
//! fresh head are not removed until everything ahead of them ages out.
//! For in-order input every retained sample is within the window.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;

use crate::event::ScoredSample;

/// Retention used when nothing else is configured.
pub const DEFAULT_WINDOW_SECS: u64 = 300;

/// One user's retained samples.
#[derive(Debug, Default, Clone)]
pub struct UserWindow {
    buf: VecDeque<ScoredSample>,
}

impl UserWindow {
    /// Append, then drop head entries with `timestamp < cutoff`.
    pub fn record(&mut self, sample: ScoredSample, window_secs: u64) {
        self.buf.push_back(sample);
        let cutoff = sample
            .timestamp
            .saturating_sub(i64::try_from(window_secs).unwrap_or(i64::MAX));
        while let Some(front) = self.buf.front() {
            if front.timestamp < cutoff {
                self.buf.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn scores(&self) -> Vec<f64> {
        self.buf.iter().map(|s| s.score).collect()
    }

    pub fn samples(&self) -> Vec<ScoredSample> {
        self.buf.iter().copied().collect()
    }
}

/// Thread-safe map of user id -> [`UserWindow`].
///
/// Backed by a sharded `DashMap`, so writers for different users only
/// contend when their keys hash to the same shard. A writer holds its
/// shard's write lock across append+prune, which makes each `record`
/// atomic with respect to `median` on the same user.
#[derive(Debug)]
pub struct RollingWindowStore {
    users: DashMap<String, UserWindow>,
    window: Duration,
}

impl Default for RollingWindowStore {
    fn default() -> Self {
        Self::with_window(Duration::from_secs(DEFAULT_WINDOW_SECS))
    }
}

impl RollingWindowStore {
    /// Create a store with the given retention.
    pub fn with_window(window: Duration) -> Self {
        Self {
            users: DashMap::new(),
            window,
        }
    }

    /// Record a scored event for `user_id`, creating its window lazily.
    pub fn record(&self, user_id: &str, timestamp: i64, score: f64) {
        let window_secs = self.window.as_secs();
        let sample = ScoredSample { timestamp, score };

        // Avoid allocating the key on the hot path when the user exists.
        if let Some(mut w) = self.users.get_mut(user_id) {
            w.record(sample, window_secs);
            return;
        }
        self.users
            .entry(user_id.to_owned())
            .or_default()
            .record(sample, window_secs);
    }

    /// Median of the user's current scores; `None` if unknown or empty.
    pub fn median(&self, user_id: &str) -> Option<f64> {
        let mut scores = {
            let w = self.users.get(user_id)?;
            w.scores()
        };
        median_of(&mut scores)
    }

    /// Copy of the user's retained samples, oldest first.
    pub fn samples(&self, user_id: &str) -> Option<Vec<ScoredSample>> {
        self.users.get(user_id).map(|w| w.samples())
    }

    /// Number of users that have ever recorded a valid event.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Length of the window in seconds (useful for diagnostics/telemetry).
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

/// Standard median: middle value for odd counts, mean of the two middle
/// values for even counts. Sorts `values` in place.
pub fn median_of(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> RollingWindowStore {
        RollingWindowStore::with_window(Duration::from_secs(300))
    }

    #[test]
    fn unknown_user_has_no_median() {
        assert_eq!(store().median("nobody"), None);
    }

    #[test]
    fn median_odd_and_even() {
        let mut odd = vec![3.0, 1.0, 2.0];
        assert_eq!(median_of(&mut odd), Some(2.0));
        let mut even = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median_of(&mut even), Some(2.5));
        assert_eq!(median_of(&mut []), None);
    }

    #[test]
    fn old_sample_is_pruned_by_newer_write() {
        let s = store();
        let t = 1_000_000;
        s.record("u2", t, 1.0);
        s.record("u2", t + 400, 2.0);
        let kept = s.samples("u2").unwrap();
        assert_eq!(kept, vec![ScoredSample { timestamp: t + 400, score: 2.0 }]);
        assert_eq!(s.median("u2"), Some(2.0));
    }

    #[test]
    fn boundary_sample_is_kept() {
        let s = store();
        s.record("u", 100, 1.0);
        s.record("u", 400, 3.0);
        // 100 == 400 - 300, not strictly older than the cutoff
        assert_eq!(s.samples("u").unwrap().len(), 2);
        assert_eq!(s.median("u"), Some(2.0));
    }

    #[test]
    fn out_of_order_write_uses_its_own_cutoff() {
        let s = store();
        s.record("u", 1_000, 1.0);
        // Late, older event: cutoff 500 - 300 = 200, nothing pruned. A
        // high-water cutoff (1_000 - 300) would have dropped the 500 sample.
        s.record("u", 500, 2.0);
        assert_eq!(s.samples("u").unwrap().len(), 2);
        // Cutoff 1_350 - 300 = 1_050 prunes both earlier samples from the head.
        s.record("u", 1_350, 3.0);
        let kept: Vec<i64> = s.samples("u").unwrap().iter().map(|x| x.timestamp).collect();
        assert_eq!(kept, vec![1_350]);
    }

    #[test]
    fn pruning_stops_at_first_fresh_head() {
        let s = store();
        s.record("u", 1_000, 1.0);
        s.record("u", 100, 2.0);
        // Cutoff 1_200 - 300 = 900: head (1_000) is fresh, so the stale 100
        // behind it survives. Pruning is head-only.
        s.record("u", 1_200, 3.0);
        let kept: Vec<i64> = s.samples("u").unwrap().iter().map(|x| x.timestamp).collect();
        assert_eq!(kept, vec![1_000, 100, 1_200]);
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        let s = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        s.record("shared", 10, (t * 250 + i) as f64);
                        s.record(&format!("user-{t}"), 10, i as f64);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(s.samples("shared").unwrap().len(), 2_000);
        assert_eq!(s.user_count(), 9);
        assert_eq!(s.median("user-3"), Some(124.5));
    }
}
