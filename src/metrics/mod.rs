use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;

pub(crate) const OUTCOME_CONVERGED: &str = "converged";
pub(crate) const OUTCOME_TIMEOUT: &str = "timeout";
pub(crate) const OUTCOME_CANCELLED: &str = "cancelled";

lazy_static! {
    pub static ref FETCH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("config_fetch_failures", "Failed fetch attempts per config definition"),
        &["def_name"]
    )
    .expect("metric can not be created");

    pub static ref UPDATES_DELIVERED: IntCounterVec = IntCounterVec::new(
        Opts::new("config_updates_delivered", "Updates pushed into holders per config definition"),
        &["def_name"]
    )
    .expect("metric can not be created");

    pub static ref CONVERGENCE_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("config_convergence_outcomes", "Results of next_config/next_generation calls"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref CONVERGENCE_LATENCY_MS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "config_convergence_latency_ms",
            "Histogram of time spent in next_config/next_generation in ms"
        )
        .buckets(exponential_buckets(1.0, 2.0, 16).expect("bucket layout is valid")),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref CONVERGED_GENERATION: IntGauge =
        IntGauge::new("config_converged_generation", "Last generation all subscriptions converged on")
            .expect("metric can not be created");

    static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry
            .register(Box::new(FETCH_FAILURES.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(UPDATES_DELIVERED.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(CONVERGENCE_OUTCOMES.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(CONVERGENCE_LATENCY_MS.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(CONVERGED_GENERATION.clone()))
            .expect("collector can be registered");
        registry
    };
}

/// Render every subscriber metric in the Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("could not encode subscriber metrics: {}", e);
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(body) => body,
        Err(e) => {
            warn!("subscriber metrics could not be from_utf8'd: {}", e);
            String::new()
        }
    }
}

pub(crate) fn record_convergence(
    outcome: &'static str,
    elapsed_ms: f64,
) {
    CONVERGENCE_OUTCOMES.with_label_values(&[outcome]).inc();
    CONVERGENCE_LATENCY_MS.with_label_values(&[outcome]).observe(elapsed_ms);
}
