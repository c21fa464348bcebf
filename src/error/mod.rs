// Error types for the operator console core
//
// This module defines custom error types for the event stream and control
// operations, providing structured error handling with stable error codes.
// None of them is fatal: callers recover locally or surface a notice.

mod control;
mod stream;

pub use control::{log_control_error, ControlError, ControlErrorCodes};
pub use stream::{log_stream_error, StreamError, StreamErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent reporting in logs,
/// operator notices and the diagnostics CLI.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_trait() {
        let stream_err: &dyn ErrorCode = &StreamError::Closed;
        assert_eq!(stream_err.code(), StreamErrorCodes::CLOSED);

        let control_err: &dyn ErrorCode = &ControlError::ClientInit {
            reason: "test".to_string(),
        };
        assert_eq!(control_err.code(), ControlErrorCodes::CLIENT_INIT);
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), StreamError> {
            Err(StreamError::Status { status: 500 })
        }

        fn caller() -> Result<(), StreamError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }
}
