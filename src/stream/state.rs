use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backoff::ReconnectBackoff;

/// Lifecycle of the live event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Reconnecting,
    /// Terminal: the transport could not be built for this session.
    Failed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Open
    }
}

/// Transition table for [`ConnectionState`] plus the reconnect backoff.
///
/// Transitions out of `Failed` are ignored.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    backoff: ReconnectBackoff,
}

impl ConnectionMachine {
    pub fn new(backoff: ReconnectBackoff) -> Self {
        Self {
            state: ConnectionState::Connecting,
            backoff,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current backoff in milliseconds (the delay the next failure would use).
    pub fn backoff_ms(&self) -> u64 {
        self.backoff.current_ms()
    }

    pub fn on_open(&mut self) {
        if self.state == ConnectionState::Failed {
            return;
        }
        self.state = ConnectionState::Open;
        self.backoff.reset();
    }

    /// A failed attempt or a dropped stream. Returns the delay before retrying,
    /// or `None` once the machine has failed.
    pub fn on_connection_lost(&mut self) -> Option<Duration> {
        if self.state == ConnectionState::Failed {
            return None;
        }
        self.state = ConnectionState::Reconnecting;
        Some(self.backoff.next_delay())
    }

    pub fn on_retry_due(&mut self) {
        if self.state == ConnectionState::Reconnecting {
            self.state = ConnectionState::Connecting;
        }
    }

    pub fn on_transport_unavailable(&mut self) {
        self.state = ConnectionState::Failed;
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new(ReconnectBackoff::default())
    }
}
