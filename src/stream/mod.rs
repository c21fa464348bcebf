//! Live event stream: SSE decoding, reconnect backoff, connection state and
//! the interchangeable event sources built on top of them.

pub mod backoff;
pub mod client;
pub mod source;
pub mod sse;
pub mod state;
pub mod transport;

pub use backoff::ReconnectBackoff;
pub use client::{EventStreamClient, SourceEvent};
pub use source::{EventSource, LiveEventSource, SourceKind, SyntheticEventSource};
pub use sse::SseDecoder;
pub use state::{ConnectionMachine, ConnectionState};
pub use transport::{ByteStream, EventTransport, HttpTransport};
