// EdgeSight Console Core - telemetry ingestion and overlay engine
// Live event stream with synthetic fallback, multi-source telemetry polling,
// and scripted overlay geometry for the operator console

// Module declarations
pub mod buffer;
pub mod config;
pub mod console;
pub mod control;
pub mod error;
pub mod legend;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod overlay;
pub mod scheduler;
pub mod stream;
pub mod synthetic;
pub mod telemetry;

// Re-exports for convenience
pub use buffer::EventBuffer;
pub use config::ConsoleConfig;
pub use console::{ConsoleHandle, ConsoleView, Mode};
pub use model::{BBox, Detection, Event};
pub use overlay::{OverlayAnimator, OverlayFrame};
pub use stream::{ConnectionState, EventStreamClient, SourceEvent, SourceKind};
pub use synthetic::{Prng, SyntheticEventGenerator};
pub use telemetry::{Gauge, Service, TelemetrySnapshot};
