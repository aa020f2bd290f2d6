//! Observability metrics: query latency, upsert/delete throughput.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Latency samples kept for percentile estimates.
const LATENCY_WINDOW: usize = 10_000;

/// Collects runtime metrics; safe to share across request handlers.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    query_latencies_us: Mutex<VecDeque<f64>>,
    total_queries: AtomicU64,
    total_upserts: AtomicU64,
    total_deletes: AtomicU64,
    total_failures: AtomicU64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub total_upserts: u64,
    pub total_deletes: u64,
    pub total_failures: u64,
    pub avg_query_latency_us: f64,
    pub p50_query_latency_us: f64,
    pub p95_query_latency_us: f64,
    pub p99_query_latency_us: f64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a query with its duration.
    pub fn record_query(&self, duration: Duration) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut window) = self.query_latencies_us.lock() {
            if window.len() == LATENCY_WINDOW {
                window.pop_front();
            }
            window.push_back(duration.as_micros() as f64);
        }
    }

    /// Record `count` upserted records.
    pub fn record_upsert(&self, count: usize) {
        self.total_upserts.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.total_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut sorted: Vec<f64> = self
            .query_latencies_us
            .lock()
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let avg = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };

        MetricsSnapshot {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            total_upserts: self.total_upserts.load(Ordering::Relaxed),
            total_deletes: self.total_deletes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            avg_query_latency_us: avg,
            p50_query_latency_us: percentile(&sorted, 50.0),
            p95_query_latency_us: percentile(&sorted, 95.0),
            p99_query_latency_us: percentile(&sorted, 99.0),
        }
    }
}

/// Nearest-rank percentile of an ascending slice; 0 when empty.
fn percentile(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((percentile / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}
