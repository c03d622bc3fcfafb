//! Request-duration histogram collector.
//!
//! Constructed once in `main` and handed to the HTTP layer explicitly; there
//! is no process-wide registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Upper bounds of the histogram buckets, in milliseconds. The final bucket
/// is unbounded.
const BUCKET_BOUNDS_MS: [u64; 10] = [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

/// Cumulative request-duration histogram. All counters are atomics, so a
/// shared reference can be recorded from any number of request tasks.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    buckets: [AtomicU64; BUCKET_BOUNDS_MS.len() + 1],
    count: AtomicU64,
    total_micros: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request.
    pub fn record(&self, duration: Duration) {
        let millis = duration.as_millis() as u64;
        let index = BUCKET_BOUNDS_MS
            .iter()
            .position(|bound| millis <= *bound)
            .unwrap_or(BUCKET_BOUNDS_MS.len());

        self.buckets[index].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot for the `/metrics` route.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let buckets = BUCKET_BOUNDS_MS
            .iter()
            .enumerate()
            .map(|(i, bound)| BucketSnapshot {
                le_ms: Some(*bound),
                count: self.buckets[i].load(Ordering::Relaxed),
            })
            .chain(std::iter::once(BucketSnapshot {
                le_ms: None,
                count: self.buckets[BUCKET_BOUNDS_MS.len()].load(Ordering::Relaxed),
            }))
            .collect();

        MetricsSnapshot {
            request_count: self.count.load(Ordering::Relaxed),
            total_duration_micros: self.total_micros.load(Ordering::Relaxed),
            buckets,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub request_count: u64,
    pub total_duration_micros: u64,
    pub buckets: Vec<BucketSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct BucketSnapshot {
    /// Bucket upper bound in milliseconds; `None` for the overflow bucket.
    pub le_ms: Option<u64>,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_into_the_right_bucket() {
        let metrics = RequestMetrics::new();
        metrics.record(Duration::from_millis(3));
        metrics.record(Duration::from_millis(80));
        metrics.record(Duration::from_secs(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.request_count, 3);
        assert_eq!(snapshot.buckets[0].count, 1); // <= 5ms
        assert_eq!(snapshot.buckets[4].count, 1); // <= 100ms
        assert_eq!(snapshot.buckets.last().unwrap().count, 1); // overflow

        let total: u64 = snapshot.buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, snapshot.request_count);
    }
}
