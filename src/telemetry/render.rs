use std::fmt::Write;

use super::{Gauge, Service, TelemetrySnapshot};

/// Render the snapshot back into exposition text.
///
/// Unknown gauges are omitted rather than written as zero.
pub fn render_exposition(snapshot: &TelemetrySnapshot) -> String {
    ExpositionWriter::new(snapshot).render()
}

struct ExpositionWriter<'a> {
    snapshot: &'a TelemetrySnapshot,
    output: String,
}

impl<'a> ExpositionWriter<'a> {
    fn new(snapshot: &'a TelemetrySnapshot) -> Self {
        Self {
            snapshot,
            output: String::new(),
        }
    }

    fn render(mut self) -> String {
        self.write_gauges();
        self.write_health();
        self.write_settings();
        self.output
    }

    fn write_gauges(&mut self) {
        for gauge in Gauge::ALL {
            let Some(value) = self.snapshot.gauge(gauge) else {
                continue;
            };
            let kind = if gauge.is_counter() { "counter" } else { "gauge" };
            let _ = writeln!(&mut self.output, "# TYPE console_{} {}", gauge.label(), kind);
            let _ = writeln!(&mut self.output, "console_{} {:.3}", gauge.label(), value);
        }
    }

    fn write_health(&mut self) {
        let _ = writeln!(
            &mut self.output,
            "# HELP console_service_up Upstream health (1 healthy)"
        );
        let _ = writeln!(&mut self.output, "# TYPE console_service_up gauge");
        for service in Service::ALL {
            if let Some(healthy) = self.snapshot.health(service) {
                let _ = writeln!(
                    &mut self.output,
                    "console_service_up{{service=\"{}\"}} {}",
                    service.label(),
                    bool_to_int(healthy)
                );
            }
        }
    }

    fn write_settings(&mut self) {
        if let Some(threshold) = self.snapshot.conf_threshold {
            let _ = writeln!(&mut self.output, "console_conf_threshold {:.2}", threshold);
        }
        if let Some(enabled) = self.snapshot.opcua_enabled {
            let _ = writeln!(
                &mut self.output,
                "console_opcua_enabled {}",
                bool_to_int(enabled)
            );
        }
        let _ = writeln!(
            &mut self.output,
            "console_force_offline {}",
            bool_to_int(self.snapshot.force_offline)
        );
    }
}

fn bool_to_int(value: bool) -> u8 {
    if value {
        1
    } else {
        0
    }
}
