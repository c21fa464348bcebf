//! EventStreamClient: connection lifecycle of the live event feed.
//!
//! A background driver owns the transport, the SSE decoder and the
//! [`ConnectionMachine`]. Parsed events and connection signals are delivered
//! through a bounded channel; disposal cancels the driver wherever it is
//! (connecting, reading, or waiting out a backoff).

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::error::{log_stream_error, StreamError};
use crate::model::Event;

use super::backoff::ReconnectBackoff;
use super::sse::SseDecoder;
use super::state::{ConnectionMachine, ConnectionState};
use super::transport::{EventTransport, HttpTransport};

const SIGNAL_CAPACITY: usize = 64;

/// Output of an event source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Event(Event),
    Connected,
    Disconnected { retry_in_ms: u64 },
    /// The source gave up for the rest of the session.
    Failed(StreamError),
}

pub struct EventStreamClient {
    signals: mpsc::Receiver<SourceEvent>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl EventStreamClient {
    /// Build an HTTP transport for `url` and start connecting.
    ///
    /// A URL or client that cannot be built is reported here and is not retried.
    pub fn connect(url: &str, config: &StreamConfig) -> Result<Self, StreamError> {
        let transport = HttpTransport::new(url, Duration::from_millis(config.connect_timeout_ms))?;
        info!("[EventStream] Connecting to {}", url);
        Ok(Self::with_transport(
            Arc::new(transport),
            ReconnectBackoff::new(config.initial_backoff_ms, config.max_backoff_ms),
        ))
    }

    pub fn with_transport(transport: Arc<dyn EventTransport>, backoff: ReconnectBackoff) -> Self {
        let (signal_tx, signals) = mpsc::channel(SIGNAL_CAPACITY);
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let cancel = CancellationToken::new();

        let driver = StreamDriver {
            transport,
            machine: ConnectionMachine::new(backoff),
            decoder: SseDecoder::new(),
            signals: signal_tx,
            state: state_tx,
            cancel: cancel.clone(),
        };
        let driver = tokio::spawn(driver.run());

        Self {
            signals,
            state,
            cancel,
            driver: Some(driver),
        }
    }

    /// Next event or signal. `None` once the client is disposed or failed.
    pub async fn recv(&mut self) -> Option<SourceEvent> {
        self.signals.recv().await
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn dispose(&mut self) {
        if let Some(driver) = self.driver.take() {
            debug!("[EventStream] Disposing client");
            self.cancel.cancel();
            driver.abort();
        }
        self.signals.close();
    }
}

impl Drop for EventStreamClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct StreamDriver {
    transport: Arc<dyn EventTransport>,
    machine: ConnectionMachine,
    decoder: SseDecoder,
    signals: mpsc::Sender<SourceEvent>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl StreamDriver {
    async fn run(mut self) {
        loop {
            self.publish_state();

            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => break,
                attempt = self.transport.connect() => attempt,
            };

            let lost = match attempt {
                Ok(stream) => {
                    self.machine.on_open();
                    self.publish_state();
                    info!("[EventStream] Connected to {}", self.transport.describe());
                    if !self.emit(SourceEvent::Connected).await {
                        break;
                    }
                    match self.read(stream).await {
                        Some(err) => err,
                        None => break,
                    }
                }
                Err(err) if err.is_permanent() => {
                    log_stream_error(&err, "EventStreamClient::connect");
                    self.machine.on_transport_unavailable();
                    self.publish_state();
                    let _ = self.emit(SourceEvent::Failed(err)).await;
                    break;
                }
                Err(err) => err,
            };

            let Some(delay) = self.machine.on_connection_lost() else {
                break;
            };
            self.publish_state();
            warn!(
                "[EventStream] Connection lost ({}); retrying in {} ms",
                lost,
                delay.as_millis()
            );
            let retry_in_ms = delay.as_millis() as u64;
            if !self.emit(SourceEvent::Disconnected { retry_in_ms }).await {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            self.machine.on_retry_due();
        }
        debug!("[EventStream] Driver stopped in state {:?}", self.machine.state());
    }

    /// Read an open stream until it ends. Returns the reason the connection
    /// was lost, or `None` if the driver should stop.
    async fn read(&mut self, mut stream: super::transport::ByteStream) -> Option<StreamError> {
        self.decoder.reset();
        loop {
            let chunk = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                chunk = stream.next() => chunk,
            };
            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(err)) => return Some(err),
                None => return Some(StreamError::Closed),
            };

            for message in self.decoder.push(&bytes) {
                match Event::from_json(&message) {
                    Some(event) => {
                        if !self.emit(SourceEvent::Event(event)).await {
                            return None;
                        }
                    }
                    None => debug!(
                        "[EventStream] Dropping malformed event ({} bytes)",
                        message.len()
                    ),
                }
            }
        }
    }

    async fn emit(&self, signal: SourceEvent) -> bool {
        self.signals.send(signal).await.is_ok()
    }

    fn publish_state(&self) {
        self.state.send_replace(self.machine.state());
    }
}
