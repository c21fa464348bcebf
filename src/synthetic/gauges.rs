//! Offline telemetry synthesis.
//!
//! While force-offline is active the poller makes no network calls and asks
//! this synthesizer for a full set of plausible gauges each tick: bounded
//! random walks around fixed baselines for latencies and fps, and counters
//! that only ever grow by burst or non-burst increments.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::telemetry::{Gauge, GaugeUpdate, Service};

const BURST_PROBABILITY: f64 = 0.15;
const DROP_PROBABILITY: f64 = 0.05;

/// Value that wanders by at most `step` per tick, pulled back toward its
/// baseline and clamped to `[min, max]`.
#[derive(Debug, Clone)]
struct RandomWalk {
    value: f64,
    baseline: f64,
    step: f64,
    min: f64,
    max: f64,
}

impl RandomWalk {
    fn new(baseline: f64, step: f64, min: f64, max: f64) -> Self {
        Self {
            value: baseline,
            baseline,
            step,
            min,
            max,
        }
    }

    fn advance(&mut self, rng: &mut StdRng) -> f64 {
        let drift = rng.gen_range(-self.step..=self.step);
        let pull = (self.baseline - self.value) * 0.1;
        self.value = (self.value + drift + pull).clamp(self.min, self.max);
        self.value
    }
}

pub struct OfflineGaugeSynth {
    rng: StdRng,
    preprocess_ms: RandomWalk,
    infer_ms: RandomWalk,
    e2e_ms: RandomWalk,
    p95_ms: RandomWalk,
    fps: RandomWalk,
    results_total: f64,
    mqtt_total: f64,
    opcua_total: f64,
    dropped_total: f64,
}

impl OfflineGaugeSynth {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            preprocess_ms: RandomWalk::new(6.5, 1.2, 3.0, 12.0),
            infer_ms: RandomWalk::new(24.0, 3.0, 12.0, 45.0),
            e2e_ms: RandomWalk::new(58.0, 5.0, 35.0, 110.0),
            p95_ms: RandomWalk::new(84.0, 4.0, 60.0, 130.0),
            fps: RandomWalk::new(9.6, 0.3, 8.5, 10.0),
            results_total: 0.0,
            mqtt_total: 0.0,
            opcua_total: 0.0,
            dropped_total: 0.0,
        }
    }

    /// One tick worth of synthesized updates covering every gauge and service.
    pub fn tick(&mut self) -> Vec<GaugeUpdate> {
        self.advance_counters();

        let mut updates: Vec<GaugeUpdate> = Service::ALL
            .iter()
            .map(|&service| GaugeUpdate::Health {
                service,
                healthy: true,
            })
            .collect();

        let values = [
            (Gauge::ResultsReceivedTotal, self.results_total),
            (Gauge::MqttPublishedTotal, self.mqtt_total),
            (Gauge::OpcuaPublishedTotal, self.opcua_total),
            (Gauge::CaptureFramesDroppedTotal, self.dropped_total),
            (Gauge::PreprocessAvgMs, self.preprocess_ms.advance(&mut self.rng)),
            (Gauge::InferAvgMs, self.infer_ms.advance(&mut self.rng)),
            (Gauge::E2eAvgMs, self.e2e_ms.advance(&mut self.rng)),
            (Gauge::LatencyP95Ms, self.p95_ms.advance(&mut self.rng)),
            (Gauge::CaptureFps, self.fps.advance(&mut self.rng)),
        ];
        updates.extend(
            values
                .into_iter()
                .map(|(gauge, value)| GaugeUpdate::Value { gauge, value }),
        );
        updates
    }

    fn advance_counters(&mut self) {
        let results: u32 = if self.rng.gen_bool(BURST_PROBABILITY) {
            self.rng.gen_range(8..=14)
        } else {
            self.rng.gen_range(2..=5)
        };
        let published = (f64::from(results) * self.rng.gen_range(0.3..0.6)).round();

        self.results_total += f64::from(results);
        self.mqtt_total += published;
        self.opcua_total += (published / 2.0).floor();
        if self.rng.gen_bool(DROP_PROBABILITY) {
            self.dropped_total += 1.0;
        }
    }
}
