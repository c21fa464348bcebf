//! Configuration for the console core
//!
//! Endpoints, cadences and limits are loaded from a JSON file so the console
//! can be pointed at another deployment without recompilation. Every field has
//! a default matching the stock docker-compose layout, and a missing or broken
//! file falls back to those defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment override for the results adapter base URL.
pub const API_BASE_ENV: &str = "EDGESIGHT_API_BASE";
/// Environment override that starts the console in offline mode.
pub const FORCE_OFFLINE_ENV: &str = "EDGESIGHT_FORCE_OFFLINE";

/// Complete console configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

/// Base URLs of the upstream services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Results adapter: event stream, metrics, governance summary, OPC UA flag
    pub adapter: String,
    /// Inference service: threshold and demo/offline flag
    pub inference: String,
    /// Capture service: `/start`, fps and dropped frames
    pub capture: String,
    /// Preprocessing service: preprocessing time histogram
    pub preprocess: String,
    /// Path of the event stream on the adapter
    pub events_path: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            adapter: "http://localhost:9004".to_string(),
            inference: "http://localhost:9003".to_string(),
            capture: "http://localhost:9001".to_string(),
            preprocess: "http://localhost:9002".to_string(),
            events_path: "/events".to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn events_url(&self) -> String {
        join_url(&self.adapter, &self.events_path)
    }
}

/// Live event stream parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// First reconnect delay, restored after every successful open
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubling reconnect delay
    pub max_backoff_ms: u64,
    /// Number of recent events retained
    pub event_buffer_capacity: usize,
    /// Handshake timeout for a single connection attempt
    pub connect_timeout_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 15_000,
            event_buffer_capacity: 50,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Telemetry polling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Per-request timeout; kept below the interval so ticks do not pile up
    pub request_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            request_timeout_ms: 800,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Synthetic fallback parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Seed of the synthetic event sequence
    pub seed: u32,
    /// Pull cadence of the synthetic event loop
    pub interval_ms: u64,
    /// Seed of the offline gauge random walks
    pub gauge_seed: u64,
    /// Start in forced offline mode
    pub force_offline: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            interval_ms: 220,
            gauge_seed: 7,
            force_offline: false,
        }
    }
}

/// Overlay canvas parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub width: f64,
    pub height: f64,
    /// Seed of the noise box randomness
    pub noise_seed: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 360.0,
            noise_seed: 2024,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load the bundled configuration and apply environment overrides.
    pub fn load() -> Self {
        Self::load_from_file("assets/console_config.json").with_env_overrides()
    }

    /// Apply `EDGESIGHT_API_BASE` and `EDGESIGHT_FORCE_OFFLINE`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                log::info!("[Config] Adapter base overridden by {}: {}", API_BASE_ENV, base);
                self.endpoints.adapter = base.trim().to_string();
            }
        }
        if let Ok(flag) = std::env::var(FORCE_OFFLINE_ENV) {
            self.synthetic.force_offline = matches!(flag.trim(), "1" | "true" | "yes");
        }
        self
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.endpoints.adapter, "http://localhost:9004");
        assert_eq!(config.stream.initial_backoff_ms, 1_000);
        assert_eq!(config.stream.max_backoff_ms, 15_000);
        assert_eq!(config.stream.event_buffer_capacity, 50);
        assert_eq!(config.polling.interval_ms, 1_000);
        assert_eq!(config.synthetic.interval_ms, 220);
        assert_eq!(config.overlay.width, 640.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"endpoints":{"adapter":"http://edge:9004"},"synthetic":{"seed":7}}"#;
        let config: ConsoleConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.endpoints.adapter, "http://edge:9004");
        assert_eq!(config.endpoints.capture, "http://localhost:9001");
        assert_eq!(config.synthetic.seed, 7);
        assert_eq!(config.synthetic.interval_ms, 220);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ConsoleConfig::load_from_file("does/not/exist.json");
        assert_eq!(config.endpoints.events_path, "/events");
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        let bundled = ConsoleConfig::load_from_file(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/console_config.json"),
        );
        let defaults = ConsoleConfig::default();
        assert_eq!(bundled.endpoints.inference, defaults.endpoints.inference);
        assert_eq!(bundled.stream.max_backoff_ms, defaults.stream.max_backoff_ms);
        assert_eq!(bundled.synthetic.gauge_seed, defaults.synthetic.gauge_seed);
        assert_eq!(bundled.overlay.noise_seed, defaults.overlay.noise_seed);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a:1/", "/events"), "http://a:1/events");
        assert_eq!(join_url("http://a:1", "healthz"), "http://a:1/healthz");
        assert_eq!(
            ConsoleConfig::default().endpoints.events_url(),
            "http://localhost:9004/events"
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ConsoleConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: ConsoleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stream.connect_timeout_ms, config.stream.connect_timeout_ms);
    }
}
