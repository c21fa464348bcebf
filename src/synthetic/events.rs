//! Deterministic synthetic inspection events.
//!
//! The generator controls content, the caller controls cadence: it is a lazy,
//! infinite iterator. Two generators built from the same seed yield the same
//! detections, frame ids and latencies; only the wall-clock timestamp differs.

use chrono::{SecondsFormat, Utc};

use super::prng::Prng;
use crate::model::{BBox, Detection, Event};

/// Nominal canvas the synthetic boxes are placed on.
pub const CANVAS_WIDTH: f64 = 640.0;
pub const CANVAS_HEIGHT: f64 = 360.0;
const MARGIN: f64 = 20.0;

/// Fixed class table: (class_id, label).
pub const CLASSES: [(&str, &str); 3] = [("defect", "Defect"), ("ok", "OK"), ("warn", "Warn")];

pub struct SyntheticEventGenerator {
    rng: Prng,
    next_frame: u64,
}

impl SyntheticEventGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: Prng::new(seed),
            next_frame: 1,
        }
    }

    fn detection_count(&mut self) -> usize {
        if self.rng.next() < 0.2 {
            2
        } else if self.rng.next() < 0.6 {
            1
        } else {
            0
        }
    }

    fn detection(&mut self) -> Detection {
        let (class_id, label) = CLASSES[self.rng.int(0, CLASSES.len() as i64 - 1) as usize];
        let width = self.rng.range(40.0, 160.0);
        let height = self.rng.range(30.0, 140.0);
        let x = self.rng.range(MARGIN, CANVAS_WIDTH - MARGIN - width);
        let y = self.rng.range(MARGIN, CANVAS_HEIGHT - MARGIN - height);

        Detection {
            bbox: BBox::new(x, y, width, height),
            score: self.rng.range(0.55, 0.98),
            class_id: class_id.to_string(),
            label: Some(label.to_string()),
        }
    }
}

impl Iterator for SyntheticEventGenerator {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        let count = self.detection_count();
        let detections = (0..count).map(|_| self.detection()).collect();
        let latency_ms = self.rng.range(45.0, 120.0);

        let frame_id = self.next_frame;
        self.next_frame += 1;

        Some(Event {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            frame_id: frame_id.to_string(),
            detections,
            correlation_id: None,
            trace_id: None,
            latency_ms: Some(latency_ms),
        })
    }
}
