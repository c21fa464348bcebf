// Event stream error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Event stream error code constants
///
/// Error code range: 3001-3005
pub struct StreamErrorCodes {}

impl StreamErrorCodes {
    /// Transport could not be constructed at all (bad URL, client build failure)
    pub const TRANSPORT_INIT: i32 = 3001;

    /// Connection attempt failed before the stream opened
    pub const CONNECT: i32 = 3002;

    /// Upstream answered with a non-success status
    pub const STATUS: i32 = 3003;

    /// Transport error while the stream was open
    pub const TRANSPORT: i32 = 3004;

    /// Upstream closed the stream
    pub const CLOSED: i32 = 3005;
}

/// Log a stream error with structured context
pub fn log_stream_error(err: &StreamError, context: &str) {
    error!(
        "Stream error in {}: code={}, component=EventStream, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the live event stream transport.
///
/// Every variant except `TransportInit` is recovered by the reconnect loop;
/// `TransportInit` moves the client to `Failed` and the console to synthetic mode.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// Transport could not be built for this session
    TransportInit { reason: String },

    /// Connection attempt failed
    Connect { reason: String },

    /// Non-success HTTP status on the handshake
    Status { status: u16 },

    /// Error while reading an open stream
    Transport { reason: String },

    /// Upstream closed the stream
    Closed,
}

impl StreamError {
    /// Construction failures are permanent for the session; everything else is retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self, StreamError::TransportInit { .. })
    }
}

impl ErrorCode for StreamError {
    fn code(&self) -> i32 {
        match self {
            StreamError::TransportInit { .. } => StreamErrorCodes::TRANSPORT_INIT,
            StreamError::Connect { .. } => StreamErrorCodes::CONNECT,
            StreamError::Status { .. } => StreamErrorCodes::STATUS,
            StreamError::Transport { .. } => StreamErrorCodes::TRANSPORT,
            StreamError::Closed => StreamErrorCodes::CLOSED,
        }
    }

    fn message(&self) -> String {
        match self {
            StreamError::TransportInit { reason } => {
                format!("Event stream transport unavailable: {}", reason)
            }
            StreamError::Connect { reason } => format!("Failed to connect: {}", reason),
            StreamError::Status { status } => {
                format!("Event source answered with HTTP {}", status)
            }
            StreamError::Transport { reason } => format!("Stream read failed: {}", reason),
            StreamError::Closed => "Event source closed the stream".to_string(),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StreamError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StreamError {}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            StreamError::TransportInit {
                reason: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            StreamError::Status {
                status: status.as_u16(),
            }
        } else if err.is_connect() || err.is_timeout() {
            StreamError::Connect {
                reason: err.to_string(),
            }
        } else {
            StreamError::Transport {
                reason: err.to_string(),
            }
        }
    }
}
