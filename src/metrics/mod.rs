//! Metrics collection for observability

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_histogram_with_registry, CounterVec, Histogram, HistogramOpts, HistogramVec, Opts,
    Registry,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Pipeline metrics
    pub cycles_total: CounterVec,
    pub cycle_duration: Histogram,

    // Collaborator metrics
    pub collaborator_calls: CounterVec,
    pub collaborator_retries: CounterVec,

    // Analysis and generation metrics
    pub key_moments: Histogram,
    pub commentary_generated: CounterVec,

    // Speech metrics
    pub audio_duration: HistogramVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cycles_total = register_counter_vec_with_registry!(
            Opts::new("narration_cycles_total", "Narration cycles by outcome"),
            &["outcome"],
            registry
        )?;

        let cycle_duration = register_histogram_with_registry!(
            HistogramOpts::new(
                "narration_cycle_duration_seconds",
                "Wall time of one narration cycle in seconds"
            ),
            registry
        )?;

        let collaborator_calls = register_counter_vec_with_registry!(
            Opts::new("collaborator_calls_total", "Calls to external collaborators"),
            &["collaborator", "endpoint", "status"],
            registry
        )?;

        let collaborator_retries = register_counter_vec_with_registry!(
            Opts::new("collaborator_retries_total", "Retried collaborator calls"),
            &["collaborator"],
            registry
        )?;

        let key_moments = register_histogram_with_registry!(
            HistogramOpts::new("analysis_key_moments", "Key moments found per analysis")
                .buckets(vec![0.0, 1.0, 2.0, 3.0, 5.0, 8.0]),
            registry
        )?;

        let commentary_generated = register_counter_vec_with_registry!(
            Opts::new("commentary_generated_total", "Commentary lines by style and source"),
            &["style", "source"],
            registry
        )?;

        let audio_duration = register_histogram_vec_with_registry!(
            "speech_audio_duration_seconds",
            "Duration of synthesized clips in seconds",
            &["style"],
            registry
        )?;

        Ok(Self {
            registry,
            cycles_total,
            cycle_duration,
            collaborator_calls,
            collaborator_retries,
            key_moments,
            commentary_generated,
            audio_duration,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a collaborator call
    pub fn record_call(&self, collaborator: &str, endpoint: &str, status: &str) {
        self.collaborator_calls
            .with_label_values(&[collaborator, endpoint, status])
            .inc();
    }

    /// Record a retried collaborator call
    pub fn record_retry(&self, collaborator: &str) {
        self.collaborator_retries.with_label_values(&[collaborator]).inc();
    }

    /// Record the outcome of a narration cycle
    pub fn record_cycle(&self, outcome: &str, seconds: f64) {
        self.cycles_total.with_label_values(&[outcome]).inc();
        self.cycle_duration.observe(seconds);
    }

    /// Record a generated commentary line
    pub fn record_commentary(&self, style: &str, source: &str) {
        self.commentary_generated
            .with_label_values(&[style, source])
            .inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Prometheus text exposition of the global registry
pub fn render() -> String {
    METRICS.export_prometheus()
}
