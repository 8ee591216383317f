//! Monitoring adapter for metrics and observability
//!
//! Prometheus collectors for bbc calls and plugin management.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::time::Duration;

/// Adapter for Prometheus metrics
pub struct MonitoringAdapter {
    prometheus_registry: Registry,
    bbc_calls: IntCounterVec,
    bbc_call_duration: HistogramVec,
    plugin_management: IntCounterVec,
    running_domains: IntGauge,
    started_plugins: IntGauge,
}

impl MonitoringAdapter {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let bbc_calls = IntCounterVec::new(
            Opts::new("bbc_calls_total", "Total number of bbc calls by request and result code"),
            &["request", "code"],
        )?;
        let bbc_call_duration = HistogramVec::new(
            HistogramOpts::new("bbc_call_duration_seconds", "Bbc call duration in seconds"),
            &["request"],
        )?;
        let plugin_management = IntCounterVec::new(
            Opts::new(
                "plugin_management_total",
                "Total number of plugin management requests by operation and result code",
            ),
            &["operation", "code"],
        )?;
        let running_domains =
            IntGauge::new("bbc_running_domains", "Number of domains with a live bbc service")?;
        let started_plugins =
            IntGauge::new("bbc_started_plugins", "Number of plugins in the started state")?;

        registry.register(Box::new(bbc_calls.clone()))?;
        registry.register(Box::new(bbc_call_duration.clone()))?;
        registry.register(Box::new(plugin_management.clone()))?;
        registry.register(Box::new(running_domains.clone()))?;
        registry.register(Box::new(started_plugins.clone()))?;

        Ok(Self {
            prometheus_registry: registry,
            bbc_calls,
            bbc_call_duration,
            plugin_management,
            running_domains,
            started_plugins,
        })
    }

    pub fn record_bbc_call(&self, request: &str, code: i32, elapsed: Duration) {
        let code = code.to_string();
        self.bbc_calls
            .with_label_values(&[request, code.as_str()])
            .inc();
        self.bbc_call_duration
            .with_label_values(&[request])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_management(&self, operation: &str, code: i32) {
        let code = code.to_string();
        self.plugin_management
            .with_label_values(&[operation, code.as_str()])
            .inc();
    }

    /// Refresh the gauges from a registry / directory snapshot
    pub fn update_inventory(&self, running_domains: usize, started_plugins: usize) {
        self.running_domains.set(running_domains as i64);
        self.started_plugins.set(started_plugins as i64);
    }

    /// Get Prometheus metrics in text format
    pub fn get_prometheus_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let mut buffer = Vec::new();
        let encoder = prometheus::TextEncoder::new();
        encoder.encode(&self.prometheus_registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
