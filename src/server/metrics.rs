use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all social feed metrics
const PREFIX: &str = "social_feed";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP
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

    // Likes
    pub static ref LIKE_TOGGLES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_like_toggles_total"), "Completed like toggles by resulting status"),
        &["status"]
    ).expect("Failed to create like_toggles_total metric");

    pub static ref LIKE_CONFLICTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_like_conflicts_total"),
            "Like writes that lost a race and resolved to the existing state"
        ),
        &["kind"]
    ).expect("Failed to create like_conflicts_total metric");

    pub static ref LIKE_COUNTER_FAILURES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_like_counter_failures_total"),
        "Relation writes whose paired counter update failed"
    ).expect("Failed to create like_counter_failures_total metric");

    pub static ref LIKE_COUNTS_RECONCILED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_like_counts_reconciled_total"),
        "Posts whose like counter was repaired by reconciliation"
    ).expect("Failed to create like_counts_reconciled_total metric");

    // Notifications
    pub static ref NOTIFICATIONS_ENQUEUED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_notifications_enqueued_total"),
        "Notifications written to the queue"
    ).expect("Failed to create notifications_enqueued_total metric");

    pub static ref NOTIFICATION_EVENTS_DROPPED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_notification_events_dropped_total"),
            "Like events that did not become notifications"
        ),
        &["reason"]
    ).expect("Failed to create notification_events_dropped_total metric");

    // Background jobs
    pub static ref BACKGROUND_JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_background_job_executions_total"), "Background job runs by outcome"),
        &["job_id", "status"]
    ).expect("Failed to create background_job_executions_total metric");

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_background_job_duration_seconds"),
            "Background job run duration in seconds"
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
        &["job_id"]
    ).expect("Failed to create background_job_duration_seconds metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Register all metrics with the Prometheus registry
pub fn init_metrics() {
    // Registering twice fails; tests call this repeatedly.
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(LIKE_TOGGLES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LIKE_CONFLICTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LIKE_COUNTER_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LIKE_COUNTS_RECONCILED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATIONS_ENQUEUED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATION_EVENTS_DROPPED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a completed toggle, `status` is `liked` or `unliked`
pub fn record_like_toggle(status: &str) {
    LIKE_TOGGLES_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_like_conflict(kind: &str) {
    LIKE_CONFLICTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_like_counter_failure() {
    LIKE_COUNTER_FAILURES_TOTAL.inc();
}

pub fn record_like_counts_reconciled(posts: usize) {
    LIKE_COUNTS_RECONCILED_TOTAL.inc_by(posts as f64);
}

pub fn record_notification_enqueued() {
    NOTIFICATIONS_ENQUEUED_TOTAL.inc();
}

pub fn record_notification_dropped(reason: &str) {
    NOTIFICATION_EVENTS_DROPPED_TOTAL
        .with_label_values(&[reason])
        .inc();
}

pub fn record_background_job_execution(job_id: &str, status: &str, duration: Duration) {
    BACKGROUND_JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_id])
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
