//! Metrics and observability utilities
//!
//! Prometheus-style metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Resplain metrics
pub const METRICS_PREFIX: &str = "resplain";

/// Histogram buckets for generation latency (in seconds); LLM calls are slow
pub const GENERATION_BUCKETS: &[f64] = &[
    0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 20.00, 30.00, 60.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Generation metrics
    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total explanation generation requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Explanation generation latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total explanation generation errors"
    );

    // Workflow metrics
    describe_counter!(
        format!("{}_papers_processed_total", METRICS_PREFIX),
        Unit::Count,
        "Total papers processed"
    );

    describe_counter!(
        format!("{}_quota_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Submissions rejected because the monthly limit was reached"
    );
}

/// Request timing helper
pub struct RequestMetrics {
    start: Instant,
    method: String,
    endpoint: String,
}

impl RequestMetrics {
    /// Start timing a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            method: method.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record generation metrics
pub fn record_generation(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_generation_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_generation_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a completed paper
pub fn record_paper_processed(age_level: &str) {
    counter!(
        format!("{}_papers_processed_total", METRICS_PREFIX),
        "age_level" => age_level.to_string()
    )
    .increment(1);
}

/// Helper to record a quota rejection
pub fn record_quota_rejection() {
    counter!(format!("{}_quota_rejections_total", METRICS_PREFIX)).increment(1);
}
