//! Configuration management for replbridge
//!
//! TOML-based configuration with built-in defaults, covering which REPL
//! executable to spawn and how the capture protocol recognizes completion.

pub mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default REPL executable, invoked with no arguments.
pub const DEFAULT_COMMAND: &str = "pyvisa-shell";

/// Default ready-prompt pattern for the default executable.
pub const DEFAULT_PROMPT_PATTERN: &str = r"\(visa\) ";

/// Default sentinel sent as a deliberately invalid command; its "unknown
/// syntax" echo is the end-of-evaluation signal.
pub const DEFAULT_EOE_MARKER: &str = "replbridge-eoe";

/// Main configuration structure for replbridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Subprocess configuration
    pub repl: ReplConfig,

    /// Output capture configuration
    pub capture: CaptureConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repl: ReplConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

/// Which executable to run and how sessions are named
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    /// Executable name, resolved via PATH
    pub command: String,

    /// Session name used when the caller does not supply one
    pub default_session: String,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            default_session: "default".to_string(),
        }
    }
}

/// How the capture protocol detects completion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Regex recognizing the subprocess's ready-prompt
    pub prompt_pattern: String,

    /// Sentinel marker string
    pub eoe_marker: String,

    /// Pause before the first completion check, in milliseconds
    pub settle_delay_ms: u64,

    /// Capture timeout in seconds; 0 blocks indefinitely
    pub timeout_secs: u64,

    /// Whether echoed input is stripped from captured output
    pub strip_echo: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            prompt_pattern: DEFAULT_PROMPT_PATTERN.to_string(),
            eoe_marker: DEFAULT_EOE_MARKER.to_string(),
            settle_delay_ms: 100,
            timeout_secs: 0,
            strip_echo: true,
        }
    }
}

impl CaptureConfig {
    /// Settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Timeout as a [`Duration`], `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Config {
    /// Validate configuration values that cannot be checked by serde alone.
    pub fn validate(&self) -> Result<()> {
        if self.repl.command.trim().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "repl.command".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.repl.default_session.is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "repl.default_session".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if let Err(e) = regex::Regex::new(&self.capture.prompt_pattern) {
            return Err(Error::ConfigValidationFailed {
                field: "capture.prompt_pattern".to_string(),
                reason: e.to_string(),
            });
        }
        if self.capture.eoe_marker.trim().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "capture.eoe_marker".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
