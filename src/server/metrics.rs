use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all Downtify metrics
const PREFIX: &str = "downtify";

lazy_static! {
    // Global Prometheus registry
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
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Playlist Metrics
    pub static ref PLAYLIST_JOBS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_playlist_jobs_total"), "Playlist jobs by start outcome"),
        &["outcome"]
    ).expect("Failed to create playlist_jobs_total metric");

    pub static ref PLAYLIST_TRACKS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_playlist_tracks_total"), "Processed tracks by outcome"),
        &["outcome"]
    ).expect("Failed to create playlist_tracks_total metric");

    pub static ref PLAYLIST_ACTIVE_WORKERS: Gauge = Gauge::new(
        format!("{PREFIX}_playlist_active_workers"),
        "Number of workers currently processing a track"
    ).expect("Failed to create playlist_active_workers metric");

    pub static ref PLAYLIST_TRACK_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_playlist_track_duration_seconds"),
            "Time spent processing a single track"
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0])
    ).expect("Failed to create playlist_track_duration_seconds metric");

    pub static ref PLAYLIST_ARCHIVES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_playlist_archives_total"),
        "Total playlist archives built"
    ).expect("Failed to create playlist_archives_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLIST_JOBS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLIST_TRACKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLIST_ACTIVE_WORKERS.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLIST_TRACK_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLIST_ARCHIVES_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a job outcome ("started", "invalid", "unavailable" or "done")
pub fn record_playlist_job(outcome: &str) {
    PLAYLIST_JOBS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a finished track, `outcome` is "done" or "failed"
pub fn record_playlist_track(outcome: &str, duration: Duration) {
    PLAYLIST_TRACKS_TOTAL.with_label_values(&[outcome]).inc();
    PLAYLIST_TRACK_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Holds one unit of an active-workers gauge for as long as it lives.
pub struct ActiveWorkerGuard<'a> {
    gauge: &'a Gauge,
}

impl<'a> ActiveWorkerGuard<'a> {
    pub fn new(gauge: &'a Gauge) -> Self {
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for ActiveWorkerGuard<'_> {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

pub fn worker_busy() -> ActiveWorkerGuard<'static> {
    ActiveWorkerGuard::new(&PLAYLIST_ACTIVE_WORKERS)
}

pub fn record_archive_built() {
    PLAYLIST_ARCHIVES_TOTAL.inc();
}

/// Collapse ids out of a request path so label cardinality stays bounded.
///
/// `/api/playlist/file/<job>/<file>` becomes `/api/playlist/file/:job/:file`.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let Some(action_at) = segments.iter().position(|s| *s == "playlist").map(|i| i + 1) else {
        return path.to_string();
    };

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| match i.checked_sub(action_at + 1) {
            Some(0) if !segment.is_empty() => ":job",
            Some(1) if !segment.is_empty() => ":file",
            _ => *segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
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
