//! Metrics collection and reporting.
//!
//! Uses HDR histograms for accurate latency percentiles.

use crate::engine::Label;
use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Application-wide metrics
#[derive(Debug)]
pub struct AppMetrics {
    /// Classification latency histogram (milliseconds)
    classify_latency_ms: Histogram<u64>,

    /// Total classification requests
    total_requests: AtomicU64,

    /// Samples judged AI-generated
    total_ai: AtomicU64,

    /// Samples judged human-generated
    total_human: AtomicU64,

    /// Runs ending in an ERROR verdict
    total_errors: AtomicU64,

    /// Collector start timestamp
    started_at: Instant,
}

/// Summary of key metrics for display
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    /// P50 classification latency (milliseconds)
    pub classify_p50_ms: f64,

    /// P95 classification latency (milliseconds)
    pub classify_p95_ms: f64,

    /// P99 classification latency (milliseconds)
    pub classify_p99_ms: f64,

    /// Total classification requests
    pub total_requests: u64,

    /// Samples judged AI-generated
    pub total_ai: u64,

    /// Samples judged human-generated
    pub total_human: u64,

    /// Success rate (0.0-1.0), errors counted as failures
    pub success_rate: f64,

    /// Uptime in seconds
    pub uptime_secs: f64,
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::with_bounds(60_000, 2)
    }

    /// Create with explicit histogram bounds (max milliseconds, precision)
    pub fn with_bounds(max_ms: u64, precision: u8) -> Self {
        let classify_latency_ms = Histogram::new_with_bounds(1, max_ms.max(2), precision)
            .expect("Histogram creation should succeed");

        Self {
            classify_latency_ms,
            total_requests: AtomicU64::new(0),
            total_ai: AtomicU64::new(0),
            total_human: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record one classification outcome
    pub fn record_classification(&mut self, label: Label, elapsed_ms: u64) {
        if let Err(e) = self.classify_latency_ms.record(elapsed_ms.max(1)) {
            tracing::warn!("Failed to record classification latency: {}", e);
        }

        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match label {
            Label::AiGenerated => self.total_ai.fetch_add(1, Ordering::Relaxed),
            Label::HumanGenerated => self.total_human.fetch_add(1, Ordering::Relaxed),
            Label::Error => self.total_errors.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Get current metrics summary
    pub fn summary(&self) -> MetricsSummary {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_errors = self.total_errors.load(Ordering::Relaxed);
        let success_rate = if total_requests > 0 {
            (total_requests - total_errors) as f64 / total_requests as f64
        } else {
            0.0
        };

        MetricsSummary {
            classify_p50_ms: self.classify_latency_ms.value_at_quantile(0.5) as f64,
            classify_p95_ms: self.classify_latency_ms.value_at_quantile(0.95) as f64,
            classify_p99_ms: self.classify_latency_ms.value_at_quantile(0.99) as f64,
            total_requests,
            total_ai: self.total_ai.load(Ordering::Relaxed),
            total_human: self.total_human.load(Ordering::Relaxed),
            success_rate,
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.classify_latency_ms.clear();
        self.total_requests.store(0, Ordering::Relaxed);
        self.total_ai.store(0, Ordering::Relaxed);
        self.total_human.store(0, Ordering::Relaxed);
        self.total_errors.store(0, Ordering::Relaxed);
        self.started_at = Instant::now();
    }
}

impl MetricsSummary {
    /// Render as a compact one-block text report.
    pub fn report(&self) -> String {
        format!(
            "requests: {} (ai: {}, human: {}, success rate: {:.1}%)\n\
             latency: p50 {:.0}ms, p95 {:.0}ms, p99 {:.0}ms\n\
             uptime: {:.1}s",
            self.total_requests,
            self.total_ai,
            self.total_human,
            self.success_rate * 100.0,
            self.classify_p50_ms,
            self.classify_p95_ms,
            self.classify_p99_ms,
            self.uptime_secs,
        )
    }
}
