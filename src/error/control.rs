// Control command error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Control command error code constants
///
/// Error code range: 4001-4004
pub struct ControlErrorCodes {}

impl ControlErrorCodes {
    /// Service could not be reached
    pub const UNREACHABLE: i32 = 4001;

    /// Service answered with a non-success status
    pub const REJECTED: i32 = 4002;

    /// Response body was not valid JSON
    pub const INVALID_RESPONSE: i32 = 4003;

    /// HTTP client could not be built
    pub const CLIENT_INIT: i32 = 4004;
}

/// Log a control error with structured context
///
/// Control failures are never fatal, so they are logged at warn level.
pub fn log_control_error(err: &ControlError, context: &str) {
    warn!(
        "Control error in {}: code={}, component=ControlClient, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by outbound control calls (start, PATCH /config).
#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    Unreachable { endpoint: String, reason: String },
    Rejected { endpoint: String, status: u16 },
    InvalidResponse { endpoint: String, reason: String },
    ClientInit { reason: String },
}

impl ErrorCode for ControlError {
    fn code(&self) -> i32 {
        match self {
            ControlError::Unreachable { .. } => ControlErrorCodes::UNREACHABLE,
            ControlError::Rejected { .. } => ControlErrorCodes::REJECTED,
            ControlError::InvalidResponse { .. } => ControlErrorCodes::INVALID_RESPONSE,
            ControlError::ClientInit { .. } => ControlErrorCodes::CLIENT_INIT,
        }
    }

    fn message(&self) -> String {
        match self {
            ControlError::Unreachable { endpoint, reason } => {
                format!("{} unreachable: {}", endpoint, reason)
            }
            ControlError::Rejected { endpoint, status } => {
                format!("{} rejected the request (HTTP {})", endpoint, status)
            }
            ControlError::InvalidResponse { endpoint, reason } => {
                format!("{} returned an unreadable body: {}", endpoint, reason)
            }
            ControlError::ClientInit { reason } => {
                format!("Control client unavailable: {}", reason)
            }
        }
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ControlError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ControlError {}
