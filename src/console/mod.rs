//! Console coordinator.
//!
//! All shared console state lives in one [`ConsoleState`] owned by a single
//! coordinator task. The stream supervisor, the telemetry poller and operator
//! commands never touch it directly: they send [`ConsoleMessage`]s, and each
//! message is applied to completion before the next. Producers that await
//! (polls, stream reads) tag their messages with the mode epoch they started
//! under, and anything from an older epoch is discarded on arrival.

use std::collections::VecDeque;

use log::{debug, info};
use serde::Serialize;

use crate::buffer::EventBuffer;
use crate::control::Notice;
use crate::model::Event;
use crate::stream::{SourceEvent, SourceKind};
use crate::telemetry::{GaugeUpdate, TelemetrySnapshot};

mod handle;
mod supervisor;

pub use handle::{ConsoleBuilder, ConsoleHandle};

/// Capacity of the rolling latency series used for charting.
pub const LATENCY_SERIES_CAPACITY: usize = 120;

/// Online/offline mode plus a counter bumped on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mode {
    pub offline: bool,
    pub epoch: u64,
}

#[derive(Debug, Clone)]
pub enum ConsoleMessage {
    /// A new event source became active.
    SourceStarted { epoch: u64, kind: SourceKind },
    Source { epoch: u64, event: SourceEvent },
    /// The live stream cannot be used for the rest of the session.
    LiveUnavailable { reason: String },
    Gauges { epoch: u64, updates: Vec<GaugeUpdate> },
    SetThreshold(f64),
    SetOpcuaEnabled(bool),
    SetForceOffline(bool),
    CommandFailed(Notice),
    DismissNotice,
}

/// Read-only copy of the console state handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsoleView {
    /// Newest first.
    pub events: Vec<Event>,
    pub snapshot: TelemetrySnapshot,
    pub connected: bool,
    pub source: Option<SourceKind>,
    pub live_failed: bool,
    pub notice: Option<Notice>,
    /// Oldest first.
    pub latency_series: Vec<f64>,
    pub mode: Mode,
}

pub struct ConsoleState {
    buffer: EventBuffer,
    snapshot: TelemetrySnapshot,
    connected: bool,
    source: Option<SourceKind>,
    live_failed: bool,
    notice: Option<Notice>,
    latency_series: VecDeque<f64>,
    mode: Mode,
}

impl ConsoleState {
    pub fn new(buffer_capacity: usize, force_offline: bool) -> Self {
        Self {
            buffer: EventBuffer::new(buffer_capacity),
            snapshot: TelemetrySnapshot::new(force_offline),
            connected: false,
            source: None,
            live_failed: false,
            notice: None,
            latency_series: VecDeque::with_capacity(LATENCY_SERIES_CAPACITY),
            mode: Mode {
                offline: force_offline,
                epoch: 0,
            },
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    /// Apply one message. Returns `true` when the mode changed.
    pub fn apply(&mut self, message: ConsoleMessage) -> bool {
        match message {
            ConsoleMessage::SourceStarted { epoch, kind } => {
                if self.is_current(epoch) {
                    self.source = Some(kind);
                    if kind == SourceKind::Live {
                        self.connected = false;
                    }
                }
                false
            }
            ConsoleMessage::Source { epoch, event } => {
                if self.is_current(epoch) {
                    self.apply_source_event(event);
                }
                false
            }
            ConsoleMessage::LiveUnavailable { reason } => {
                info!("[Console] Live stream unavailable for this session: {}", reason);
                self.live_failed = true;
                false
            }
            ConsoleMessage::Gauges { epoch, updates } => {
                if !self.is_current(epoch) {
                    debug!("[Console] Discarding {} stale gauge updates", updates.len());
                    return false;
                }
                let mut flipped = false;
                for update in updates {
                    flipped |= self.snapshot.apply(update);
                }
                if flipped {
                    self.enter_mode(self.snapshot.force_offline);
                }
                flipped
            }
            ConsoleMessage::SetThreshold(threshold) => {
                self.snapshot.set_threshold(threshold);
                false
            }
            ConsoleMessage::SetOpcuaEnabled(enabled) => {
                self.snapshot.set_opcua_enabled(enabled);
                false
            }
            ConsoleMessage::SetForceOffline(offline) => {
                let changed = self.snapshot.set_force_offline(offline);
                if changed {
                    self.enter_mode(offline);
                }
                changed
            }
            ConsoleMessage::CommandFailed(notice) => {
                self.notice = Some(notice);
                false
            }
            ConsoleMessage::DismissNotice => {
                self.notice = None;
                false
            }
        }
    }

    pub fn view(&self) -> ConsoleView {
        ConsoleView {
            events: self.buffer.to_vec(),
            snapshot: self.snapshot.clone(),
            connected: self.connected,
            source: self.source,
            live_failed: self.live_failed,
            notice: self.notice.clone(),
            latency_series: self.latency_series.iter().copied().collect(),
            mode: self.mode,
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        epoch == self.mode.epoch
    }

    fn apply_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Event(event) => {
                if let Some(latency) = event.latency_ms.filter(|v| v.is_finite()) {
                    if self.latency_series.len() == LATENCY_SERIES_CAPACITY {
                        self.latency_series.pop_front();
                    }
                    self.latency_series.push_back(latency);
                }
                self.buffer.push_front(event);
            }
            SourceEvent::Connected => self.connected = true,
            SourceEvent::Disconnected { .. } => self.connected = false,
            SourceEvent::Failed(_) => {
                self.connected = false;
                self.live_failed = true;
            }
        }
    }

    /// Online/offline transition: derived telemetry starts over.
    ///
    /// Offline mode keeps the connected indicator as it was; the synthetic
    /// source asserts it anyway.
    fn enter_mode(&mut self, offline: bool) {
        self.mode = Mode {
            offline,
            epoch: self.mode.epoch + 1,
        };
        self.snapshot.reset_gauges();
        if !offline {
            self.connected = false;
        }
        info!(
            "[Console] Entering {} mode (epoch {})",
            if offline { "offline" } else { "online" },
            self.mode.epoch
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticEventGenerator;
    use crate::telemetry::{Gauge, ObservedConfig};

    fn event_message(epoch: u64, event: Event) -> ConsoleMessage {
        ConsoleMessage::Source {
            epoch,
            event: SourceEvent::Event(event),
        }
    }

    #[test]
    fn test_events_are_buffered_newest_first() {
        let mut state = ConsoleState::new(50, false);
        for event in SyntheticEventGenerator::new(1).take(51) {
            state.apply(event_message(0, event));
        }

        let view = state.view();
        assert_eq!(view.events.len(), 50);
        assert_eq!(view.events[0].frame_id, "51");
        assert_eq!(view.events[49].frame_id, "2");
        assert_eq!(view.latency_series.len(), 51);
    }

    #[test]
    fn test_latency_series_is_capped() {
        let mut state = ConsoleState::new(50, false);
        for event in SyntheticEventGenerator::new(2).take(130) {
            state.apply(event_message(0, event));
        }
        assert_eq!(state.view().latency_series.len(), LATENCY_SERIES_CAPACITY);
    }

    #[test]
    fn test_connection_signals_drive_connected_flag() {
        let mut state = ConsoleState::new(50, false);
        state.apply(ConsoleMessage::SourceStarted {
            epoch: 0,
            kind: SourceKind::Live,
        });
        assert!(!state.view().connected);

        state.apply(ConsoleMessage::Source {
            epoch: 0,
            event: SourceEvent::Connected,
        });
        assert!(state.view().connected);

        state.apply(ConsoleMessage::Source {
            epoch: 0,
            event: SourceEvent::Disconnected { retry_in_ms: 1_000 },
        });
        assert!(!state.view().connected);
    }

    #[test]
    fn test_mode_switch_resets_gauges_and_discards_stale_results() {
        let mut state = ConsoleState::new(50, false);
        state.apply(ConsoleMessage::Gauges {
            epoch: 0,
            updates: vec![GaugeUpdate::Value {
                gauge: Gauge::CaptureFps,
                value: 9.0,
            }],
        });

        assert!(state.apply(ConsoleMessage::SetForceOffline(true)));
        assert_eq!(state.mode(), Mode { offline: true, epoch: 1 });
        assert_eq!(state.snapshot().gauge(Gauge::CaptureFps), None);

        // A poll issued before the switch resolves late.
        state.apply(ConsoleMessage::Gauges {
            epoch: 0,
            updates: vec![GaugeUpdate::Value {
                gauge: Gauge::CaptureFps,
                value: 9.0,
            }],
        });
        assert_eq!(state.snapshot().gauge(Gauge::CaptureFps), None);

        let stale = SyntheticEventGenerator::new(3).next().unwrap();
        state.apply(event_message(0, stale));
        assert!(state.buffer().is_empty());
    }

    #[test]
    fn test_going_offline_keeps_connected_indicator() {
        let mut state = ConsoleState::new(50, false);
        state.apply(ConsoleMessage::Source {
            epoch: 0,
            event: SourceEvent::Connected,
        });
        assert!(state.view().connected);

        assert!(state.apply(ConsoleMessage::SetForceOffline(true)));
        assert!(state.view().connected);
        state.apply(ConsoleMessage::SourceStarted {
            epoch: 1,
            kind: SourceKind::Synthetic,
        });
        assert!(state.view().connected);

        assert!(state.apply(ConsoleMessage::SetForceOffline(false)));
        assert!(!state.view().connected);
    }

    #[test]
    fn test_repeated_offline_request_is_not_a_transition() {
        let mut state = ConsoleState::new(50, true);
        assert!(!state.apply(ConsoleMessage::SetForceOffline(true)));
        assert_eq!(state.mode().epoch, 0);
    }

    #[test]
    fn test_upstream_offline_flag_switches_mode() {
        let mut state = ConsoleState::new(50, false);
        let changed = state.apply(ConsoleMessage::Gauges {
            epoch: 0,
            updates: vec![GaugeUpdate::Config(ObservedConfig {
                offline_force: Some(true),
                ..Default::default()
            })],
        });

        assert!(changed);
        assert!(state.mode().offline);
        assert!(state.view().snapshot.force_offline);
    }

    #[test]
    fn test_notice_is_dismissible_and_keeps_local_value() {
        let mut state = ConsoleState::new(50, false);
        state.apply(ConsoleMessage::SetThreshold(0.7));
        state.apply(ConsoleMessage::CommandFailed(Notice {
            code: 4001,
            message: "PATCH unreachable".into(),
        }));

        let view = state.view();
        assert_eq!(view.snapshot.conf_threshold, Some(0.7));
        assert!(view.notice.is_some());

        state.apply(ConsoleMessage::DismissNotice);
        assert!(state.view().notice.is_none());
    }
}
