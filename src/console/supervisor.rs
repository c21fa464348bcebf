use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::ConsoleConfig;
use crate::error::{log_stream_error, StreamError};
use crate::stream::{
    EventSource, EventTransport, LiveEventSource, ReconnectBackoff, SourceEvent, SourceKind,
    SyntheticEventSource,
};

use super::{ConsoleMessage, Mode};

/// Keeps exactly one event source running for the current mode.
///
/// Live while online and the stream is usable; synthetic while offline or
/// after the live transport failed permanently. A mode change disposes the
/// active source before the next one is opened.
pub(super) struct SourceSupervisor {
    pub(super) config: ConsoleConfig,
    pub(super) transport: Option<Arc<dyn EventTransport>>,
    pub(super) mode: watch::Receiver<Mode>,
    pub(super) messages: mpsc::Sender<ConsoleMessage>,
    pub(super) cancel: CancellationToken,
    pub(super) live_failed: bool,
}

enum Exit {
    ModeChanged,
    LiveFailed(StreamError),
    Stop,
}

impl SourceSupervisor {
    pub(super) async fn run(mut self) {
        loop {
            let mode = *self.mode.borrow_and_update();
            let mut source = self.open(mode).await;
            let kind = source.kind();
            if !self
                .send(ConsoleMessage::SourceStarted {
                    epoch: mode.epoch,
                    kind,
                })
                .await
            {
                source.dispose();
                break;
            }

            let exit = self.pump(source.as_mut(), mode).await;
            source.dispose();

            match exit {
                Exit::ModeChanged => debug!("[Supervisor] Mode changed; swapping {:?} source", kind),
                Exit::LiveFailed(err) => {
                    log_stream_error(&err, "SourceSupervisor::pump");
                    self.live_failed = true;
                    let _ = self
                        .send(ConsoleMessage::LiveUnavailable {
                            reason: err.to_string(),
                        })
                        .await;
                }
                Exit::Stop => break,
            }
        }
        debug!("[Supervisor] Stopped");
    }

    async fn open(&mut self, mode: Mode) -> Box<dyn EventSource> {
        if !mode.offline && !self.live_failed {
            match self.open_live() {
                Ok(source) => return Box::new(source),
                Err(err) => {
                    log_stream_error(&err, "SourceSupervisor::open");
                    warn!("[Supervisor] Falling back to synthetic events for this session");
                    self.live_failed = true;
                    let _ = self
                        .send(ConsoleMessage::LiveUnavailable {
                            reason: err.to_string(),
                        })
                        .await;
                }
            }
        }

        info!(
            "[Supervisor] Starting synthetic events (seed {}, every {} ms)",
            self.config.synthetic.seed, self.config.synthetic.interval_ms
        );
        Box::new(SyntheticEventSource::new(
            self.config.synthetic.seed,
            Duration::from_millis(self.config.synthetic.interval_ms),
        ))
    }

    fn open_live(&self) -> Result<LiveEventSource, StreamError> {
        match &self.transport {
            Some(transport) => Ok(LiveEventSource::with_transport(
                Arc::clone(transport),
                ReconnectBackoff::new(
                    self.config.stream.initial_backoff_ms,
                    self.config.stream.max_backoff_ms,
                ),
            )),
            None => LiveEventSource::open(&self.config.endpoints.events_url(), &self.config.stream),
        }
    }

    async fn pump(&mut self, source: &mut dyn EventSource, mode: Mode) -> Exit {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Exit::Stop,
                changed = self.mode.changed() => {
                    if changed.is_err() {
                        return Exit::Stop;
                    }
                    if self.mode.borrow_and_update().epoch != mode.epoch {
                        return Exit::ModeChanged;
                    }
                }
                next = source.next_event() => match next {
                    Some(SourceEvent::Failed(err)) => return Exit::LiveFailed(err),
                    Some(event) => {
                        let message = ConsoleMessage::Source { epoch: mode.epoch, event };
                        if !self.send(message).await {
                            return Exit::Stop;
                        }
                    }
                    None if source.kind() == SourceKind::Live => {
                        return Exit::LiveFailed(StreamError::Closed);
                    }
                    None => return Exit::Stop,
                },
            }
        }
    }

    async fn send(&self, message: ConsoleMessage) -> bool {
        self.messages.send(message).await.is_ok()
    }
}
