use std::collections::BTreeMap;

use anyhow::{Context, Result};
use edgesight_console::console::ConsoleView;
use edgesight_console::legend::{class_counts, legend_color, percentile};
use edgesight_console::telemetry::{render_exposition, Gauge, Service};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ConsoleReport {
    pub mode: &'static str,
    pub epoch: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub connected: bool,
    pub live_failed: bool,
    pub events_buffered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_frame_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub classes: BTreeMap<String, ClassEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_latency_p95_ms: Option<f64>,
    pub gauges: BTreeMap<&'static str, f64>,
    pub health: BTreeMap<&'static str, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opcua_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip)]
    exposition: String,
}

#[derive(Debug, Serialize)]
pub struct ClassEntry {
    pub count: usize,
    pub color: &'static str,
}

impl ConsoleReport {
    pub fn from_view(view: &ConsoleView) -> Self {
        let classes = class_counts(&view.events)
            .into_iter()
            .map(|(class_id, count)| {
                let color = legend_color(&class_id);
                (class_id, ClassEntry { count, color })
            })
            .collect();

        let gauges = Gauge::ALL
            .iter()
            .filter_map(|&g| view.snapshot.gauge(g).map(|v| (g.label(), v)))
            .collect();
        let health = Service::ALL
            .iter()
            .filter_map(|&s| view.snapshot.health(s).map(|h| (s.label(), h)))
            .collect();

        Self {
            mode: if view.mode.offline { "offline" } else { "online" },
            epoch: view.mode.epoch,
            source: view.source.map(|kind| format!("{kind:?}").to_lowercase()),
            connected: view.connected,
            live_failed: view.live_failed,
            events_buffered: view.events.len(),
            latest_frame_id: view.events.first().map(|e| e.frame_id.clone()),
            classes,
            event_latency_p95_ms: (!view.latency_series.is_empty())
                .then(|| percentile(&view.latency_series, 0.95)),
            gauges,
            health,
            conf_threshold: view.snapshot.conf_threshold,
            opcua_enabled: view.snapshot.opcua_enabled,
            notice: view.notice.as_ref().map(|n| format!("[{}] {}", n.code, n.message)),
            exposition: render_exposition(&view.snapshot),
        }
    }

    pub fn print_json(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing console report")?;
        println!("{json}");
        Ok(())
    }

    pub fn print_prometheus(&self) {
        print!("{}", self.exposition);
    }

    pub fn print_table(&self) {
        println!("Mode                     : {} (epoch {})", self.mode, self.epoch);
        println!(
            "Event source             : {} ({})",
            self.source.as_deref().unwrap_or("n/a"),
            if self.connected { "connected" } else { "disconnected" }
        );
        if self.live_failed {
            println!("Live stream              : unavailable for this session");
        }
        println!(
            "Events buffered          : {} (latest frame {})",
            self.events_buffered,
            self.latest_frame_id.as_deref().unwrap_or("n/a")
        );
        match self.event_latency_p95_ms {
            Some(p95) => println!("Event latency p95 (ms)   : {:.1}", p95),
            None => println!("Event latency p95 (ms)   : n/a"),
        }

        if self.classes.is_empty() {
            println!("Detections by class      : n/a");
        } else {
            println!("Detections by class      :");
            for (class_id, entry) in &self.classes {
                println!("  - {class_id}: {} ({})", entry.count, entry.color);
            }
        }

        if self.health.is_empty() {
            println!("Service health           : n/a");
        } else {
            println!("Service health           :");
            for (service, healthy) in &self.health {
                println!("  - {service}: {}", if *healthy { "up" } else { "down" });
            }
        }

        if self.gauges.is_empty() {
            println!("Gauges                   : n/a");
        } else {
            println!("Gauges                   :");
            for (name, value) in &self.gauges {
                println!("  - {name}: {:.2}", value);
            }
        }

        if let Some(threshold) = self.conf_threshold {
            println!("Confidence threshold     : {:.2}", threshold);
        }
        if let Some(enabled) = self.opcua_enabled {
            println!("OPC UA publishing        : {}", if enabled { "on" } else { "off" });
        }
        if let Some(notice) = &self.notice {
            println!("Notice                   : {notice}");
        }
    }
}
