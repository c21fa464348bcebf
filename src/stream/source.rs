//! Interchangeable event producers.
//!
//! The console consumes whichever [`EventSource`] is active without knowing
//! whether events come from the network or from the seeded generator.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, Sleep};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::synthetic::SyntheticEventGenerator;

use super::backoff::ReconnectBackoff;
use super::client::{EventStreamClient, SourceEvent};
use super::state::ConnectionState;
use super::transport::EventTransport;

pub const SYNTHETIC_INTERVAL_MS: u64 = 220;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Live,
    Synthetic,
}

pub trait EventSource: Send {
    fn kind(&self) -> SourceKind;

    /// Next event or connection signal; `None` once the source is exhausted
    /// or disposed. Dropping the returned future loses nothing.
    fn next_event(&mut self) -> BoxFuture<'_, Option<SourceEvent>>;

    fn dispose(&mut self);
}

/// Live SSE feed.
pub struct LiveEventSource {
    client: EventStreamClient,
}

impl LiveEventSource {
    pub fn open(url: &str, config: &StreamConfig) -> Result<Self, StreamError> {
        Ok(Self {
            client: EventStreamClient::connect(url, config)?,
        })
    }

    pub fn with_transport(transport: Arc<dyn EventTransport>, backoff: ReconnectBackoff) -> Self {
        Self {
            client: EventStreamClient::with_transport(transport, backoff),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }
}

impl EventSource for LiveEventSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<SourceEvent>> {
        self.client.recv().boxed()
    }

    fn dispose(&mut self) {
        self.client.dispose();
    }
}

/// Seeded generator paced at a fixed interval.
///
/// Announces itself as connected first, so intentional offline mode never
/// reads as a lost connection.
pub struct SyntheticEventSource {
    generator: SyntheticEventGenerator,
    interval: Duration,
    announced: bool,
    disposed: bool,
    next_tick: Pin<Box<Sleep>>,
}

impl SyntheticEventSource {
    pub fn new(seed: u32, interval: Duration) -> Self {
        Self {
            generator: SyntheticEventGenerator::new(seed),
            interval,
            announced: false,
            disposed: false,
            next_tick: Box::pin(tokio::time::sleep(interval)),
        }
    }

    async fn produce(&mut self) -> Option<SourceEvent> {
        if self.disposed {
            return None;
        }
        if !self.announced {
            self.announced = true;
            return Some(SourceEvent::Connected);
        }

        // The deadline lives in `self`, so a dropped call resumes the same wait.
        self.next_tick.as_mut().await;
        let event = self.generator.next()?;
        let deadline = Instant::now() + self.interval;
        self.next_tick.as_mut().reset(deadline);
        Some(SourceEvent::Event(event))
    }
}

impl EventSource for SyntheticEventSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<SourceEvent>> {
        self.produce().boxed()
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
