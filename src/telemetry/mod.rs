//! Telemetry snapshot, poller and exposition rendering.
//!
//! The snapshot maps named gauges and per-service health to their last-known
//! values. A failed poll of one source never touches gauges of another, and a
//! gauge that was never observed stays `None` rather than reading as zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod events;
pub mod poller;
mod render;

pub use events::{Gauge, GaugeUpdate, ObservedConfig, Service};
pub use poller::{PollerEndpoints, TelemetryPoller};
pub use render::render_exposition;

/// Last-known telemetry plus the operator settings mirrored from `/config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySnapshot {
    pub health: BTreeMap<Service, bool>,
    pub gauges: BTreeMap<Gauge, f64>,
    pub conf_threshold: Option<f64>,
    pub opcua_enabled: Option<bool>,
    pub force_offline: bool,
    #[serde(skip)]
    last_observed: ObservedConfig,
    #[serde(skip)]
    previous_mqtt_total: Option<f64>,
}

impl TelemetrySnapshot {
    pub fn new(force_offline: bool) -> Self {
        Self {
            force_offline,
            ..Self::default()
        }
    }

    pub fn gauge(&self, gauge: Gauge) -> Option<f64> {
        self.gauges.get(&gauge).copied()
    }

    pub fn health(&self, service: Service) -> Option<bool> {
        self.health.get(&service).copied()
    }

    /// Apply one observation. Returns `true` when the force-offline flag changed
    /// because upstream configuration changed out-of-band.
    pub fn apply(&mut self, update: GaugeUpdate) -> bool {
        match update {
            GaugeUpdate::Health { service, healthy } => {
                self.health.insert(service, healthy);
                false
            }
            GaugeUpdate::Value { gauge, value } => {
                self.record_value(gauge, value);
                false
            }
            GaugeUpdate::Config(observed) => self.sync_config(observed),
        }
    }

    fn record_value(&mut self, gauge: Gauge, value: f64) {
        if gauge == Gauge::MqttPublishedTotal {
            if let Some(previous) = self.previous_mqtt_total {
                // A decreasing counter means upstream restarted; never report a negative rate.
                self.gauges.insert(Gauge::MqttPerSec, (value - previous).max(0.0));
            }
            self.previous_mqtt_total = Some(value);
        }
        self.gauges.insert(gauge, value);
    }

    /// First observation populates local values; later observations only
    /// overwrite a value whose upstream reading changed since last time, so an
    /// optimistic local edit survives an unchanged upstream value.
    fn sync_config(&mut self, observed: ObservedConfig) -> bool {
        let previous = self.last_observed;
        self.last_observed = previous.merge(observed);

        if let Some(threshold) = observed.conf_threshold {
            if previous.conf_threshold != Some(threshold) {
                if previous.conf_threshold.is_some() {
                    log::info!("[Telemetry] Threshold re-synced from upstream: {:.2}", threshold);
                }
                self.conf_threshold = Some(threshold);
            }
        }

        if let Some(enabled) = observed.opcua_enabled {
            if previous.opcua_enabled != Some(enabled) {
                self.opcua_enabled = Some(enabled);
            }
        }

        match observed.offline_force {
            Some(offline)
                if previous.offline_force != Some(offline) && self.force_offline != offline =>
            {
                log::info!("[Telemetry] Upstream force-offline flag is now {}", offline);
                self.force_offline = offline;
                true
            }
            _ => false,
        }
    }

    /// Local operator edit of the threshold (optimistic).
    pub fn set_threshold(&mut self, threshold: f64) {
        self.conf_threshold = Some(threshold);
    }

    pub fn set_opcua_enabled(&mut self, enabled: bool) {
        self.opcua_enabled = Some(enabled);
    }

    /// Local operator edit of the force-offline flag. Returns `true` on change.
    pub fn set_force_offline(&mut self, offline: bool) -> bool {
        let changed = self.force_offline != offline;
        self.force_offline = offline;
        changed
    }

    /// Hard reset of all derived values on an online/offline transition.
    ///
    /// Operator settings survive; health, gauges and the publish-rate history do not.
    pub fn reset_gauges(&mut self) {
        self.health.clear();
        self.gauges.clear();
        self.previous_mqtt_total = None;
    }
}
