use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business metrics
    pub static ref PUZZLES_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "puzzles_generated_total",
        "Puzzle generation attempts by outcome",
        &["status"]
    )
    .unwrap();

    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_total",
        "Puzzle submissions by outcome",
        &["outcome"]
    )
    .unwrap();

    // Solved-flag cache (duplicate-resubmission short-circuit)
    pub static ref SOLVED_FLAG_CHECKS: IntCounterVec = register_int_counter_vec!(
        "solved_flag_checks_total",
        "Solved-flag cache lookups by result",
        &["result"]
    )
    .unwrap();
}

pub fn record_solved_flag_hit() {
    SOLVED_FLAG_CHECKS.with_label_values(&["hit"]).inc();
}

pub fn record_solved_flag_miss() {
    SOLVED_FLAG_CHECKS.with_label_values(&["miss"]).inc();
}

pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
