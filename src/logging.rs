//! Log subscriber setup for binaries.
//!
//! Library code logs through the `log` facade; the fmt subscriber installed
//! here picks those records up through its `tracing-log` bridge.
//!
//! Filter priority: `EDGESIGHT_LOG`, then `RUST_LOG`, then the verbosity
//! passed by the caller.

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "EDGESIGHT_LOG";

static INIT: Once = Once::new();

/// Verbosity chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

fn build_filter(verbosity: Verbosity) -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity.default_level().as_str()))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbosity: Verbosity) {
    INIT.call_once(|| {
        let result = tracing_subscriber::fmt()
            .with_env_filter(build_filter(verbosity))
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
        if let Err(err) = result {
            eprintln!("logging already initialized: {err}");
        }
    });
}
