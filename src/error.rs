//! Error types and Result aliases for replbridge

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for replbridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for replbridge
#[derive(Debug)]
pub enum Error {
    // === Session errors ===
    /// The REPL executable could not be started
    SpawnFailed {
        command: String,
        reason: String,
    },

    /// The REPL executable was not found on PATH
    CommandNotFound {
        command: String,
    },

    /// No session registered under the given name
    SessionNotFound {
        name: String,
    },

    /// Failed to deliver input to the subprocess stdin
    InputSendFailed {
        reason: String,
    },

    // === Capture errors ===
    /// Subprocess exited while a capture was waiting for output
    StreamClosed {
        session: String,
    },

    /// A capture is already in flight on this session
    CaptureBusy {
        session: String,
    },

    /// Caller aborted the capture mid-wait
    CaptureCancelled,

    /// The completion condition did not appear within the configured timeout
    CaptureTimeout {
        duration: Duration,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound,

    // === I/O and pattern errors ===
    /// I/O errors
    Io(std::io::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors (for cases not yet categorized)
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Session errors
            Error::SpawnFailed { command, reason } => {
                write!(f, "Failed to spawn REPL command '{}': {}", command, reason)
            }
            Error::CommandNotFound { command } => {
                write!(f, "Command '{}' not found in PATH", command)
            }
            Error::SessionNotFound { name } => {
                write!(f, "Session '{}' not found", name)
            }
            Error::InputSendFailed { reason } => {
                write!(f, "Failed to send input to subprocess: {}", reason)
            }

            // Capture errors
            Error::StreamClosed { session } => {
                write!(f, "Subprocess for session '{}' exited mid-capture", session)
            }
            Error::CaptureBusy { session } => {
                write!(f, "A capture is already in flight on session '{}'", session)
            }
            Error::CaptureCancelled => {
                write!(f, "Capture cancelled by caller")
            }
            Error::CaptureTimeout { duration } => {
                write!(f, "Capture timed out after {:?}", duration)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigNotFound => {
                write!(f, "Configuration file not found")
            }

            // I/O and pattern errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
