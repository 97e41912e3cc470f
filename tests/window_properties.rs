//! Property-based tests for the rolling window store.
//!
//! Invariants checked:
//! - in-order writes never retain a sample older than `latest - window`
//! - nothing inside the window is ever dropped for in-order writes
//! - the median matches a straightforward sort-and-pick reference

use std::time::Duration;

use proptest::prelude::*;
use score_window_service::rolling::{median_of, RollingWindowStore};

const WINDOW: u64 = 300;

fn reference_median(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let mut s = v.to_vec();
    s.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = s.len();
    Some(if n % 2 == 1 {
        s[n / 2]
    } else {
        (s[n / 2 - 1] + s[n / 2]) / 2.0
    })
}

proptest! {
    #[test]
    fn prop_in_order_writes_respect_window(
        start in 0i64..1_000_000,
        steps in prop::collection::vec((0i64..200, -1_000.0f64..1_000.0), 1..60)
    ) {
        let store = RollingWindowStore::with_window(Duration::from_secs(WINDOW));
        let mut ts = start;
        let mut all: Vec<(i64, f64)> = Vec::new();
        for (gap, score) in steps {
            ts += gap;
            store.record("u", ts, score);
            all.push((ts, score));

            let kept = store.samples("u").unwrap();
            let cutoff = ts - WINDOW as i64;
            prop_assert!(kept.iter().all(|s| s.timestamp >= cutoff));

            // Exactly the in-window suffix of everything written so far.
            let expected: Vec<(i64, f64)> =
                all.iter().copied().filter(|(t, _)| *t >= cutoff).collect();
            let got: Vec<(i64, f64)> = kept.iter().map(|s| (s.timestamp, s.score)).collect();
            prop_assert_eq!(got, expected);
        }
    }

    #[test]
    fn prop_median_matches_reference(
        scores in prop::collection::vec(-1e6f64..1e6, 0..50)
    ) {
        let store = RollingWindowStore::with_window(Duration::from_secs(WINDOW));
        for s in &scores {
            store.record("m", 42, *s);
        }
        prop_assert_eq!(store.median("m"), reference_median(&scores));

        let mut copy = scores.clone();
        prop_assert_eq!(median_of(&mut copy), reference_median(&scores));
    }

    #[test]
    fn prop_users_are_isolated(
        a in prop::collection::vec(0.0f64..10.0, 1..20),
        b in prop::collection::vec(100.0f64..110.0, 1..20)
    ) {
        let store = RollingWindowStore::with_window(Duration::from_secs(WINDOW));
        for (x, y) in a.iter().zip(b.iter()) {
            store.record("a", 1, *x);
            store.record("b", 1, *y);
        }
        let n = a.len().min(b.len());
        prop_assert_eq!(store.median("a"), reference_median(&a[..n]));
        prop_assert_eq!(store.median("b"), reference_median(&b[..n]));
    }
}

#[test]
fn unknown_user_median_is_none() {
    let store = RollingWindowStore::with_window(Duration::from_secs(WINDOW));
    assert_eq!(store.median("ghost"), None);
    assert!(store.samples("ghost").is_none());
}
