//! Multi-source telemetry acquisition.
//!
//! One [`TelemetryPoller::poll`] call is one tick: health, config, metrics and
//! the governance summary are queried concurrently, and every query that
//! fails simply contributes no updates. In offline mode no request is made
//! and the gauges come from [`OfflineGaugeSynth`] instead.

use std::time::Duration;

use futures::future::join_all;
use log::{debug, info};
use serde::Deserialize;

use crate::config::{join_url, EndpointConfig};
use crate::error::ControlError;
use crate::metrics::{extract_counter, extract_histogram_average};
use crate::synthetic::OfflineGaugeSynth;

use super::{Gauge, GaugeUpdate, ObservedConfig, Service};

/// Plain counters/gauges read verbatim from `/metrics`.
const COUNTERS: [(&str, Gauge); 5] = [
    ("results_received_total", Gauge::ResultsReceivedTotal),
    ("mqtt_published_total", Gauge::MqttPublishedTotal),
    ("opcua_published_total", Gauge::OpcuaPublishedTotal),
    ("capture_fps", Gauge::CaptureFps),
    ("capture_frames_dropped_total", Gauge::CaptureFramesDroppedTotal),
];

/// Histograms reported as `<base>_sum / <base>_count`.
const HISTOGRAMS: [(&str, Gauge); 3] = [
    ("preprocess_time_ms", Gauge::PreprocessAvgMs),
    ("model_infer_ms", Gauge::InferAvgMs),
    ("e2e_latency_ms", Gauge::E2eAvgMs),
];

/// Services whose `/metrics` endpoint is scanned each tick.
const METRICS_SOURCES: [Service; 4] = [
    Service::Capture,
    Service::Preprocess,
    Service::Inference,
    Service::Adapter,
];

/// Services exposing a readable `/config`.
const CONFIG_SOURCES: [Service; 2] = [Service::Adapter, Service::Inference];

/// Base URLs of the polled services.
#[derive(Debug, Clone)]
pub struct PollerEndpoints {
    pub adapter: String,
    pub inference: String,
    pub capture: String,
    pub preprocess: String,
}

impl PollerEndpoints {
    pub fn from_config(endpoints: &EndpointConfig) -> Self {
        Self {
            adapter: endpoints.adapter.clone(),
            inference: endpoints.inference.clone(),
            capture: endpoints.capture.clone(),
            preprocess: endpoints.preprocess.clone(),
        }
    }

    fn base(&self, service: Service) -> &str {
        match service {
            Service::Adapter => &self.adapter,
            Service::Inference => &self.inference,
            Service::Capture => &self.capture,
            Service::Preprocess => &self.preprocess,
        }
    }

    fn url(&self, service: Service, path: &str) -> String {
        join_url(self.base(service), path)
    }
}

#[derive(Debug, Deserialize)]
struct GovernanceSummary {
    #[serde(default)]
    latency_p95_ms: Option<f64>,
}

/// Scan one exposition payload for every catalogued series.
pub fn scan_metrics(text: &str) -> Vec<GaugeUpdate> {
    let counters = COUNTERS
        .iter()
        .filter_map(|&(name, gauge)| extract_counter(text, name).map(|value| (gauge, value)));
    let histograms = HISTOGRAMS.iter().filter_map(|&(base, gauge)| {
        extract_histogram_average(text, base).map(|value| (gauge, value))
    });

    counters
        .chain(histograms)
        .map(|(gauge, value)| GaugeUpdate::Value { gauge, value })
        .collect()
}

pub struct TelemetryPoller {
    client: reqwest::Client,
    endpoints: PollerEndpoints,
    gauge_seed: u64,
    offline: Option<OfflineGaugeSynth>,
}

impl TelemetryPoller {
    pub fn new(
        endpoints: PollerEndpoints,
        request_timeout: Duration,
        gauge_seed: u64,
    ) -> Result<Self, ControlError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| ControlError::ClientInit {
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            endpoints,
            gauge_seed,
            offline: None,
        })
    }

    /// Run one tick.
    ///
    /// Entering offline mode starts a fresh synthesizer; leaving it drops the
    /// synthesizer so the next offline period starts from baselines again.
    pub async fn poll(&mut self, offline: bool) -> Vec<GaugeUpdate> {
        if offline {
            let seed = self.gauge_seed;
            let synth = self.offline.get_or_insert_with(|| {
                info!("[TelemetryPoller] Offline mode: synthesizing gauges");
                OfflineGaugeSynth::new(seed)
            });
            return synth.tick();
        }

        if self.offline.take().is_some() {
            info!("[TelemetryPoller] Online mode: polling upstream services");
        }
        self.poll_live().await
    }

    async fn poll_live(&self) -> Vec<GaugeUpdate> {
        let health = join_all(Service::ALL.iter().map(|&s| self.fetch_health(s)));
        let config = join_all(CONFIG_SOURCES.iter().map(|&s| self.fetch_config(s)));
        let metrics = join_all(METRICS_SOURCES.iter().map(|&s| self.fetch_metrics(s)));
        let p95 = self.fetch_latency_p95();

        let (health, config, metrics, p95) = futures::join!(health, config, metrics, p95);

        let mut updates: Vec<GaugeUpdate> = health;

        let observed = config
            .into_iter()
            .flatten()
            .fold(ObservedConfig::default(), ObservedConfig::merge);
        if !observed.is_empty() {
            updates.push(GaugeUpdate::Config(observed));
        }

        updates.extend(metrics.into_iter().flatten());
        if let Some(value) = p95 {
            updates.push(GaugeUpdate::Value {
                gauge: Gauge::LatencyP95Ms,
                value,
            });
        }
        updates
    }

    async fn fetch_health(&self, service: Service) -> GaugeUpdate {
        let url = self.endpoints.url(service, "/healthz");
        let healthy = match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("[TelemetryPoller] {} unreachable: {}", url, err);
                false
            }
        };
        GaugeUpdate::Health { service, healthy }
    }

    async fn fetch_config(&self, service: Service) -> Option<ObservedConfig> {
        let url = self.endpoints.url(service, "/config");
        let response = self.get_success(&url).await?;
        match response.json::<ObservedConfig>().await {
            Ok(observed) => Some(observed),
            Err(err) => {
                debug!("[TelemetryPoller] Unreadable config from {}: {}", url, err);
                None
            }
        }
    }

    async fn fetch_metrics(&self, service: Service) -> Vec<GaugeUpdate> {
        let url = self.endpoints.url(service, "/metrics");
        let Some(response) = self.get_success(&url).await else {
            return Vec::new();
        };
        match response.text().await {
            Ok(text) => scan_metrics(&text),
            Err(err) => {
                debug!("[TelemetryPoller] Failed to read {}: {}", url, err);
                Vec::new()
            }
        }
    }

    async fn fetch_latency_p95(&self) -> Option<f64> {
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let url = format!(
            "{}?date_from={}&date_to={}",
            self.endpoints.url(Service::Adapter, "/governance/summary"),
            today,
            today
        );
        let response = self.get_success(&url).await?;
        match response.json::<GovernanceSummary>().await {
            Ok(summary) => summary.latency_p95_ms.filter(|v| v.is_finite()),
            Err(err) => {
                debug!("[TelemetryPoller] Unreadable governance summary: {}", err);
                None
            }
        }
    }

    async fn get_success(&self, url: &str) -> Option<reqwest::Response> {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => Some(response),
            Ok(response) => {
                debug!(
                    "[TelemetryPoller] {} answered HTTP {}",
                    url,
                    response.status().as_u16()
                );
                None
            }
            Err(err) => {
                debug!("[TelemetryPoller] {} failed: {}", url, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE_METRICS: &str = "\
# HELP capture_fps Frames per second
# TYPE capture_fps gauge
capture_fps 9.8
capture_frames_dropped_total 3
";

    const PREPROCESS_METRICS: &str = "\
# TYPE preprocess_time_ms histogram
preprocess_time_ms_bucket{le=\"5.0\"} 2
preprocess_time_ms_sum 26.0
preprocess_time_ms_count 4
";

    fn value_of(updates: &[GaugeUpdate], wanted: Gauge) -> Option<f64> {
        updates.iter().find_map(|u| match u {
            GaugeUpdate::Value { gauge, value } if *gauge == wanted => Some(*value),
            _ => None,
        })
    }

    #[test]
    fn test_scans_counters_from_capture_payload() {
        let updates = scan_metrics(CAPTURE_METRICS);
        assert_eq!(value_of(&updates, Gauge::CaptureFps), Some(9.8));
        assert_eq!(value_of(&updates, Gauge::CaptureFramesDroppedTotal), Some(3.0));
        assert_eq!(value_of(&updates, Gauge::ResultsReceivedTotal), None);
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn test_scans_histogram_average() {
        let updates = scan_metrics(PREPROCESS_METRICS);
        assert_eq!(value_of(&updates, Gauge::PreprocessAvgMs), Some(6.5));
        assert_eq!(updates.len(), 1);
    }

    #[test]
    fn test_garbage_payload_yields_nothing() {
        assert!(scan_metrics("<html>502 Bad Gateway</html>").is_empty());
    }

    #[test]
    fn test_endpoints_build_service_urls() {
        let endpoints = PollerEndpoints::from_config(&EndpointConfig::default());
        assert_eq!(
            endpoints.url(Service::Capture, "/metrics"),
            "http://localhost:9001/metrics"
        );
        assert_eq!(
            endpoints.url(Service::Inference, "config"),
            "http://localhost:9003/config"
        );
    }

    #[tokio::test]
    async fn test_offline_poll_makes_no_requests() {
        // Unroutable endpoints: any request would fail and report unhealthy.
        let endpoints = PollerEndpoints {
            adapter: "http://127.0.0.1:1".into(),
            inference: "http://127.0.0.1:1".into(),
            capture: "http://127.0.0.1:1".into(),
            preprocess: "http://127.0.0.1:1".into(),
        };
        let mut poller = TelemetryPoller::new(endpoints, Duration::from_millis(50), 3).unwrap();

        let updates = poller.poll(true).await;
        assert!(updates
            .iter()
            .all(|u| !matches!(u, GaugeUpdate::Health { healthy: false, .. })));
        assert!(value_of(&updates, Gauge::CaptureFps).is_some());
    }

    #[tokio::test]
    async fn test_unreachable_services_report_unhealthy_only() {
        let endpoints = PollerEndpoints {
            adapter: "http://127.0.0.1:1".into(),
            inference: "http://127.0.0.1:1".into(),
            capture: "http://127.0.0.1:1".into(),
            preprocess: "http://127.0.0.1:1".into(),
        };
        let mut poller = TelemetryPoller::new(endpoints, Duration::from_millis(200), 3).unwrap();

        let updates = poller.poll(false).await;
        assert_eq!(updates.len(), Service::ALL.len());
        assert!(updates
            .iter()
            .all(|u| matches!(u, GaugeUpdate::Health { healthy: false, .. })));
    }

    #[tokio::test]
    async fn test_inference_metrics_feed_infer_average() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake inference");
        let addr = listener.local_addr().expect("local addr");
        let router = axum::Router::new().route(
            "/metrics",
            axum::routing::get(|| async { "model_infer_ms_sum 40.0\nmodel_infer_ms_count 4.0\n" }),
        );
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let endpoints = PollerEndpoints {
            adapter: "http://127.0.0.1:1".into(),
            inference: format!("http://{addr}"),
            capture: "http://127.0.0.1:1".into(),
            preprocess: "http://127.0.0.1:1".into(),
        };
        let mut poller = TelemetryPoller::new(endpoints, Duration::from_millis(500), 3).unwrap();

        let updates = poller.poll(false).await;
        assert_eq!(value_of(&updates, Gauge::InferAvgMs), Some(10.0));
        assert_eq!(value_of(&updates, Gauge::CaptureFps), None);
    }
}
