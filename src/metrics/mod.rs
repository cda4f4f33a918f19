use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    /// Commit attempts by outcome (`direct`, `merged`, or a rejection kind)
    pub static ref COMMIT_RESULTS: IntCounterVec = IntCounterVec::new(
        Opts::new("config_commit_results", "Commit attempts by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref COMMIT_LATENCY_METRIC: Histogram = Histogram::with_opts(
        HistogramOpts::new("config_commit_latency_ms", "Histogram of commit latency in ms")
            .buckets(exponential_buckets(1.0, 2.0, 12).expect("valid buckets"))
    )
    .expect("metric can not be created");

    pub static ref AUTO_MERGE_CONFLICTS: IntCounter = IntCounter::new(
        "config_auto_merge_conflicts",
        "Auto-merge attempts rejected for overlapping edits"
    )
    .expect("metric can not be created");

    /// In-memory commits whose backup could not be written
    pub static ref BACKUP_WRITE_FAILURES: IntCounter = IntCounter::new(
        "config_backup_write_failures",
        "Backups that failed to persist after a commit"
    )
    .expect("metric can not be created");

    pub static ref REGISTERED_SLAVES: IntGauge = IntGauge::new(
        "config_registered_slaves",
        "Slaves currently considered alive"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

fn register_custom_metrics() {
    REGISTRY
        .register(Box::new(COMMIT_RESULTS.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(COMMIT_LATENCY_METRIC.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(AUTO_MERGE_CONFLICTS.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(BACKUP_WRITE_FAILURES.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(REGISTERED_SLAVES.clone()))
        .expect("collector can be registered");
}

/// Serves `/metrics` until `shutdown_signal` fires.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics();
    info!("metrics server listening on port {}", port);

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(render())
}

pub(crate) fn render() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
