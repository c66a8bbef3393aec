use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    request_counter: Counter<u64>,
    upload_counter: Counter<u64>,
    upload_duration: Histogram<u64>,
    camera_fps: Gauge<f64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("webcam_uploader");
        global::set_meter_provider(provider);

        let request_counter = meter
            .u64_counter("requests_total")
            .with_description("Total number of control requests")
            .build();

        let upload_counter = meter
            .u64_counter("uploads_total")
            .with_description("Snapshot uploads by outcome")
            .build();

        // Uploads go over the network, so the buckets reach into seconds.
        let boundaries = generate_boundaries(&[(50, 250, 25), (250, 1000, 125), (1000, 5000, 1000)]);

        let upload_duration = meter
            .u64_histogram("upload_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of snapshot uploads in milliseconds")
            .build();

        let camera_fps = meter
            .f64_gauge("camera_fps")
            .with_description("Frames per second read from the camera")
            .build();

        Ok(Metrics {
            request_counter,
            upload_counter,
            upload_duration,
            camera_fps,
            registry,
        })
    }

    pub fn record_request(&self, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.request_counter.add(1, &attributes);
    }

    pub fn record_upload(&self, duration_ms: u64, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        let attributes = vec![KeyValue::new("outcome", outcome)];
        self.upload_counter.add(1, &attributes);
        self.upload_duration.record(duration_ms, &attributes);
    }

    pub fn record_camera_fps(&self, fps: f64) {
        self.camera_fps.record(fps, &[]);
    }
}

/// Histogram boundaries from `(start, end, step)` segments, deduplicated.
fn generate_boundaries(segments: &[(u64, u64, usize)]) -> Vec<f64> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .flat_map(|&(start, end, step)| (start..=end).step_by(step.max(1)))
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
