//! Deterministic synthetic data used when upstream services are unavailable
//! or offline mode is forced.

pub mod events;
pub mod gauges;
pub mod prng;

pub use events::SyntheticEventGenerator;
pub use gauges::OfflineGaugeSynth;
pub use prng::Prng;
