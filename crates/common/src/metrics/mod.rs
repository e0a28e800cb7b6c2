//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the research pipeline
//! with standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Scout metrics
pub const METRICS_PREFIX: &str = "scout";

/// Histogram buckets for search provider latency (in seconds)
pub const SEARCH_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
];

/// Buckets for generation latency (streams run long)
pub const GENERATION_BUCKETS: &[f64] = &[
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
    120.0,  // 2m
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

    // Pipeline metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total research queries by complexity tier"
    );

    describe_counter!(
        format!("{}_analyzer_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Query analyses answered by the heuristic fallback"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Total search provider calls"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search provider latency in seconds"
    );

    describe_counter!(
        format!("{}_hops_total", METRICS_PREFIX),
        Unit::Count,
        "Executed search hops by outcome"
    );

    // Filter metrics
    describe_counter!(
        format!("{}_mock_results_total", METRICS_PREFIX),
        Unit::Count,
        "Results dropped as synthetic by the quality filter"
    );

    describe_gauge!(
        format!("{}_ranked_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results kept after re-ranking"
    );

    // Generation metrics
    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total generation service requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation latency in seconds"
    );

    // Response quality
    describe_histogram!(
        format!("{}_response_quality_score", METRICS_PREFIX),
        Unit::Count,
        "Citation quality score of generated answers"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
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

/// Record a query entering the pipeline
pub fn record_query(complexity: &str, fallback: bool) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "complexity" => complexity.to_string()
    )
    .increment(1);

    if fallback {
        counter!(format!("{}_analyzer_fallbacks_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record search provider metrics
pub fn record_search(duration_secs: f64, engine: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_search_calls_total", METRICS_PREFIX),
        "engine" => engine.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "engine" => engine.to_string()
    )
    .record(duration_secs);
}

/// Record the outcome of one hop
pub fn record_hop(outcome: &str) {
    counter!(
        format!("{}_hops_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record quality filter results
pub fn record_filter(mock_flagged: usize, kept: usize) {
    counter!(format!("{}_mock_results_total", METRICS_PREFIX)).increment(mock_flagged as u64);
    gauge!(format!("{}_ranked_results_count", METRICS_PREFIX)).set(kept as f64);
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
    }
}

/// Record the validator's score for a generated answer
pub fn record_quality(score: u8, is_valid: bool) {
    histogram!(
        format!("{}_response_quality_score", METRICS_PREFIX),
        "valid" => is_valid.to_string()
    )
    .record(score as f64);
}
