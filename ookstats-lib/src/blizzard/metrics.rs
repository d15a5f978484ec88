//! Per-client request counters.

use core::fmt::{Display, Formatter};
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

/// Counters updated on every response the executor sees.
///
/// Owned by a single client; two clients never share counters.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    request_count: AtomicU64,
    not_found_count: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl RequestMetrics {
    /// Record one completed response with the given status.
    pub fn record(&self, status: u16, latency: Duration) {
        let _ = self.request_count.fetch_add(1, Ordering::Relaxed);
        if status == 404 {
            let _ = self.not_found_count.fetch_add(1, Ordering::Relaxed);
        }

        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        let _ = self.total_latency_ms.fetch_add(ms, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.request_count.load(Ordering::Relaxed);
        let not_found = self.not_found_count.load(Ordering::Relaxed);
        let total = self.total_latency_ms.load(Ordering::Relaxed);

        #[expect(clippy::cast_precision_loss, reason = "latency totals stay well below 2^52 ms")]
        let avg_latency_ms = if requests > 0 { total as f64 / requests as f64 } else { 0.0 };

        MetricsSnapshot {
            requests,
            not_found,
            avg_latency_ms,
        }
    }
}

/// Point-in-time copy of [`RequestMetrics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub not_found: u64,
    pub avg_latency_ms: f64,
}

impl Display for MetricsSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "requests: {}, not found: {}, avg latency: {:.1}ms",
            self.requests, self.not_found, self.avg_latency_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let metrics = RequestMetrics::default();
        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 0);
        assert_eq!(snap.not_found, 0);
        assert!(snap.avg_latency_ms.abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_and_average() {
        let metrics = RequestMetrics::default();
        metrics.record(200, Duration::from_millis(100));
        metrics.record(404, Duration::from_millis(50));
        metrics.record(500, Duration::from_millis(30));

        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 3);
        assert_eq!(snap.not_found, 1);
        assert!((snap.avg_latency_ms - 60.0).abs() < 1e-9);
        assert_eq!(snap.to_string(), "requests: 3, not found: 1, avg latency: 60.0ms");
    }
}
