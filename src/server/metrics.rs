use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all moodlist metrics
const PREFIX: &str = "moodlist";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Generation Metrics
    pub static ref PLAYLIST_GENERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_playlist_generations_total"), "Playlist generations by outcome"),
        &["outcome"]
    ).expect("Failed to create playlist_generations_total metric");

    pub static ref RECOVERY_PATH_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_recovery_path_total"), "Which recovery stage produced the tracklist"),
        &["path"]
    ).expect("Failed to create recovery_path_total metric");

    // Enrichment Metrics
    pub static ref ENRICHMENT_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_enrichment_lookups_total"), "Upstream lookups by upstream and outcome"),
        &["upstream", "outcome"]
    ).expect("Failed to create enrichment_lookups_total metric");

    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_upstream_request_duration_seconds"),
            "Upstream lookup duration in seconds"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["upstream"]
    ).expect("Failed to create upstream_request_duration_seconds metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLIST_GENERATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECOVERY_PATH_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ENRICHMENT_LOOKUPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses a request path into a bounded label value.
pub fn categorize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "root",
        "/v1/health" => "health",
        "/v1/playlist/generate" => "playlist_generate",
        "/v1/playlist/enrich" => "playlist_enrich",
        "/v1/playlist/lookup" => "playlist_lookup",
        "/v1/catalog/enrich" => "catalog_enrich",
        "/v1/catalog/lookup" => "catalog_lookup",
        "/v1/trending/videos" => "trending_videos",
        _ => "other",
    }
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let endpoint = categorize_endpoint(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration.as_secs_f64());
}

pub fn record_generation(outcome: &str) {
    PLAYLIST_GENERATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_recovery_path(path: &str) {
    RECOVERY_PATH_TOTAL.with_label_values(&[path]).inc();
}

/// Record one upstream lookup. `outcome` is one of matched, absent, failed.
pub fn record_lookup(upstream: &str, outcome: &str, duration: Duration) {
    ENRICHMENT_LOOKUPS_TOTAL
        .with_label_values(&[upstream, outcome])
        .inc();
    UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&[upstream])
        .observe(duration.as_secs_f64());
}

pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
