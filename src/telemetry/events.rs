//! Gauge and health update messages produced by the poller (live or offline)
//! and applied by the console coordinator.

use serde::{Deserialize, Serialize};

/// Upstream services polled for health.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Adapter,
    Inference,
    Capture,
    Preprocess,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Adapter,
        Service::Inference,
        Service::Capture,
        Service::Preprocess,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Service::Adapter => "adapter",
            Service::Inference => "inference",
            Service::Capture => "capture",
            Service::Preprocess => "preprocess",
        }
    }
}

/// Named numeric gauges shown on the dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Gauge {
    ResultsReceivedTotal,
    MqttPublishedTotal,
    OpcuaPublishedTotal,
    /// Derived from successive `mqtt_published_total` readings.
    MqttPerSec,
    PreprocessAvgMs,
    InferAvgMs,
    E2eAvgMs,
    LatencyP95Ms,
    CaptureFps,
    CaptureFramesDroppedTotal,
}

impl Gauge {
    pub const ALL: [Gauge; 10] = [
        Gauge::ResultsReceivedTotal,
        Gauge::MqttPublishedTotal,
        Gauge::OpcuaPublishedTotal,
        Gauge::MqttPerSec,
        Gauge::PreprocessAvgMs,
        Gauge::InferAvgMs,
        Gauge::E2eAvgMs,
        Gauge::LatencyP95Ms,
        Gauge::CaptureFps,
        Gauge::CaptureFramesDroppedTotal,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Gauge::ResultsReceivedTotal => "results_received_total",
            Gauge::MqttPublishedTotal => "mqtt_published_total",
            Gauge::OpcuaPublishedTotal => "opcua_published_total",
            Gauge::MqttPerSec => "mqtt_per_sec",
            Gauge::PreprocessAvgMs => "preprocess_avg_ms",
            Gauge::InferAvgMs => "infer_avg_ms",
            Gauge::E2eAvgMs => "e2e_avg_ms",
            Gauge::LatencyP95Ms => "latency_p95_ms",
            Gauge::CaptureFps => "capture_fps",
            Gauge::CaptureFramesDroppedTotal => "capture_frames_dropped_total",
        }
    }

    /// Counters only ever grow upstream (until a restart resets them).
    pub fn is_counter(self) -> bool {
        matches!(
            self,
            Gauge::ResultsReceivedTotal
                | Gauge::MqttPublishedTotal
                | Gauge::OpcuaPublishedTotal
                | Gauge::CaptureFramesDroppedTotal
        )
    }
}

/// Operator-adjustable settings as read from a `/config` endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ObservedConfig {
    #[serde(default)]
    pub conf_threshold: Option<f64>,
    #[serde(default, alias = "demo_force")]
    pub offline_force: Option<bool>,
    #[serde(default)]
    pub opcua_enabled: Option<bool>,
}

impl ObservedConfig {
    /// Fields present in `other` win.
    pub fn merge(self, other: ObservedConfig) -> ObservedConfig {
        ObservedConfig {
            conf_threshold: other.conf_threshold.or(self.conf_threshold),
            offline_force: other.offline_force.or(self.offline_force),
            opcua_enabled: other.opcua_enabled.or(self.opcua_enabled),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conf_threshold.is_none() && self.offline_force.is_none() && self.opcua_enabled.is_none()
    }
}

/// One observation from a single upstream query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GaugeUpdate {
    Health { service: Service, healthy: bool },
    Value { gauge: Gauge, value: f64 },
    Config(ObservedConfig),
}
