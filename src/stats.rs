//! Aggregate request/processing statistics.
//!
//! All raw state lives behind one mutex so a [`StatsSnapshot`] is always a
//! state that existed at a single instant. Counters are mirrored into the
//! `metrics` facade for Prometheus; the mirror is best-effort and is never
//! read back.

use metrics::{counter, histogram};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
struct Inner {
    ingest_requests: u64,
    events_processed: u64,
    median_requests: u64,
    /// One entry per completed ingest batch, in seconds.
    ingest_latencies: Vec<f64>,
}

/// Point-in-time view returned by `/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub ingest_requests: u64,
    pub events_processed: u64,
    pub median_requests: u64,
    pub avg_ingest_latency_seconds: f64,
}

#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<Inner>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ingest_request(&self) {
        self.inner.lock().ingest_requests += 1;
        counter!("ingest_requests_total").increment(1);
    }

    /// Add a finished batch: `count` processed events that took `latency_secs`.
    pub fn record_events_processed(&self, count: u64, latency_secs: f64) {
        {
            let mut s = self.inner.lock();
            s.events_processed += count;
            s.ingest_latencies.push(latency_secs);
        }
        counter!("ingest_events_processed_total").increment(count);
        histogram!("ingest_batch_seconds").record(latency_secs);
    }

    pub fn record_median_request(&self) {
        self.inner.lock().median_requests += 1;
        counter!("median_requests_total").increment(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let s = self.inner.lock();
        let avg = if s.ingest_latencies.is_empty() {
            0.0
        } else {
            s.ingest_latencies.iter().sum::<f64>() / s.ingest_latencies.len() as f64
        };
        StatsSnapshot {
            ingest_requests: s.ingest_requests,
            events_processed: s.events_processed,
            median_requests: s.median_requests,
            avg_ingest_latency_seconds: avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn empty_snapshot_has_zero_latency() {
        let s = StatsAggregator::new();
        assert_eq!(s.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn latency_is_arithmetic_mean() {
        let s = StatsAggregator::new();
        s.record_ingest_request();
        s.record_events_processed(3, 0.5);
        s.record_ingest_request();
        s.record_events_processed(0, 1.5);
        s.record_median_request();

        let snap = s.snapshot();
        assert_eq!(snap.ingest_requests, 2);
        assert_eq!(snap.events_processed, 3);
        assert_eq!(snap.median_requests, 1);
        assert!((snap.avg_ingest_latency_seconds - 1.0).abs() < 1e-12);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let s = Arc::new(StatsAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        s.record_ingest_request();
                        s.record_events_processed(2, 0.001);
                        s.record_median_request();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = s.snapshot();
        assert_eq!(snap.ingest_requests, 8_000);
        assert_eq!(snap.events_processed, 16_000);
        assert_eq!(snap.median_requests, 8_000);
        assert!((snap.avg_ingest_latency_seconds - 0.001).abs() < 1e-9);
    }
}
