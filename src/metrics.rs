//! Metrics Module for the Video Subtitle API
//!
//! A pluggable metrics system: a Prometheus exporter served on `/metrics`, and a
//! null exporter used when metrics are disabled and in tests.

use async_trait::async_trait;
use log::{debug, warn};
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Metrics exporter trait for pluggable monitoring systems
#[async_trait]
pub trait MetricsExporter: Send + Sync {
    /// Increment a counter metric
    async fn increment(&self, name: &str, labels: &[(&str, &str)]);

    /// Observe a value in a histogram metric
    async fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]);

    /// Export metrics in the format expected by the monitoring system
    async fn export(&self) -> Result<Vec<u8>, String>;
}

/// Prometheus implementation of MetricsExporter
pub struct PrometheusExporter {
    registry: Registry,
    counters: Mutex<HashMap<String, CounterVec>>,
    histograms: Mutex<HashMap<String, HistogramVec>>,
}

impl Default for PrometheusExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusExporter {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    async fn get_or_create_counter(&self, name: &str, label_names: &[&str]) -> Option<CounterVec> {
        let mut counters = self.counters.lock().await;
        if let Some(counter) = counters.get(name) {
            return Some(counter.clone());
        }

        let counter = match CounterVec::new(Opts::new(name, name), label_names) {
            Ok(counter) => counter,
            Err(e) => {
                warn!("Failed to create counter metric {}: {}", name, e);
                return None;
            }
        };

        if let Err(e) = self.registry.register(Box::new(counter.clone())) {
            warn!("Failed to register counter metric {}: {}", name, e);
        }

        counters.insert(name.to_string(), counter.clone());
        Some(counter)
    }

    async fn get_or_create_histogram(
        &self,
        name: &str,
        label_names: &[&str],
    ) -> Option<HistogramVec> {
        let mut histograms = self.histograms.lock().await;
        if let Some(histogram) = histograms.get(name) {
            return Some(histogram.clone());
        }

        let opts = HistogramOpts::new(name, name).buckets(histogram_buckets(name));
        let histogram = match HistogramVec::new(opts, label_names) {
            Ok(histogram) => histogram,
            Err(e) => {
                warn!("Failed to create histogram metric {}: {}", name, e);
                return None;
            }
        };

        if let Err(e) = self.registry.register(Box::new(histogram.clone())) {
            warn!("Failed to register histogram metric {}: {}", name, e);
        }

        histograms.insert(name.to_string(), histogram.clone());
        Some(histogram)
    }

    fn split_labels<'a>(labels: &'a [(&'a str, &'a str)]) -> (Vec<&'a str>, Vec<&'a str>) {
        labels.iter().map(|(k, v)| (*k, *v)).unzip()
    }
}

#[async_trait]
impl MetricsExporter for PrometheusExporter {
    async fn increment(&self, name: &str, labels: &[(&str, &str)]) {
        let (names, values) = Self::split_labels(labels);
        if let Some(counter) = self.get_or_create_counter(name, &names).await {
            match counter.get_metric_with_label_values(values.as_slice()) {
                Ok(metric) => metric.inc(),
                Err(e) => warn!("Invalid labels for counter {}: {}", name, e),
            }
        }
    }

    async fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let (names, values) = Self::split_labels(labels);
        if let Some(histogram) = self.get_or_create_histogram(name, &names).await {
            match histogram.get_metric_with_label_values(values.as_slice()) {
                Ok(metric) => metric.observe(value),
                Err(e) => warn!("Invalid labels for histogram {}: {}", name, e),
            }
        }
    }

    async fn export(&self) -> Result<Vec<u8>, String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| e.to_string())?;
        Ok(buffer)
    }
}

/// Bucket bounds for a histogram, byte-sized metrics get 1 KiB to 256 MiB
fn histogram_buckets(name: &str) -> Vec<f64> {
    if name.ends_with("_bytes") {
        if let Ok(buckets) = prometheus::exponential_buckets(1024.0, 4.0, 10) {
            return buckets;
        }
    }
    prometheus::DEFAULT_BUCKETS.to_vec()
}

/// Null exporter for testing or when metrics are disabled
pub struct NullExporter;

#[async_trait]
impl MetricsExporter for NullExporter {
    async fn increment(&self, _name: &str, _labels: &[(&str, &str)]) {}

    async fn observe_histogram(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) {}

    async fn export(&self) -> Result<Vec<u8>, String> {
        Ok(vec![])
    }
}

/// Metrics facade for the application
#[derive(Clone)]
pub struct Metrics {
    exporter: Arc<dyn MetricsExporter>,
}

impl Metrics {
    pub fn new(exporter: Arc<dyn MetricsExporter>) -> Self {
        Self { exporter }
    }

    /// Metrics that record nothing
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullExporter))
    }

    pub async fn increment(&self, name: &str, labels: &[(&str, &str)]) {
        self.exporter.increment(name, labels).await
    }

    pub async fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.exporter.observe_histogram(name, value, labels).await
    }

    pub async fn export(&self) -> Result<Vec<u8>, String> {
        self.exporter.export().await
    }

    /// Record HTTP request duration
    pub async fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status: &str,
        duration: f64,
    ) {
        let labels = [("endpoint", endpoint), ("method", method), ("status", status)];
        self.observe_histogram("http_request_duration_seconds", duration, &labels)
            .await;
        self.increment("http_requests_total", &labels).await;
    }

    /// Record how long a pipeline stage took and whether it succeeded
    pub async fn record_stage(&self, stage: &str, duration: f64, outcome: &str) {
        let labels = [("stage", stage), ("outcome", outcome)];
        self.observe_histogram("pipeline_stage_duration_seconds", duration, &labels)
            .await;
    }

    /// Record the end of a pipeline run, `outcome` is "success" or an error kind
    pub async fn record_pipeline_completed(&self, language: &str, duration: f64, outcome: &str) {
        self.observe_histogram(
            "pipeline_duration_seconds",
            duration,
            &[("outcome", outcome)],
        )
        .await;
        self.increment(
            "pipeline_runs_total",
            &[("language", language), ("outcome", outcome)],
        )
        .await;
    }

    /// Record upload size
    pub async fn record_file_size(&self, size_bytes: f64) {
        self.observe_histogram("upload_size_bytes", size_bytes, &[])
            .await;
    }
}

/// Factory function to create metrics exporter based on configuration
pub fn create_metrics_exporter(exporter_type: &str) -> Arc<dyn MetricsExporter> {
    match exporter_type.to_lowercase().as_str() {
        "prometheus" => {
            debug!("Initializing Prometheus metrics exporter");
            Arc::new(PrometheusExporter::new())
        }
        "none" | "disabled" => {
            debug!("Metrics disabled, using null exporter");
            Arc::new(NullExporter)
        }
        _ => {
            warn!(
                "Unknown metrics exporter type '{}', using null exporter",
                exporter_type
            );
            Arc::new(NullExporter)
        }
    }
}
