//! replbridge - synchronous command execution over prompt-driven REPLs
//!
//! Turns a persistent interactive subprocess (a REPL that prints unframed
//! text and periodically emits a recognizable prompt) into a synchronous
//! request/response channel: submit a command, block, and receive exactly the
//! output it produced. Completion is detected by submitting a sentinel
//! command whose error echo, followed by a fresh prompt, marks the end of
//! evaluation. No byte that arrives outside a capture window is ever lost.
//!
//! ## Module Organization
//!
//! - [`session`] - Named subprocess sessions, spawning, and the registry
//! - [`capture`] - The output capture protocol (the core)
//! - [`template`] - `$name` variable substitution and body wrapping
//! - [`exec`] - The executor composing the above
//! - [`config`] - Configuration loading
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use replbridge::{Config, ExecParams, Executor};
//!
//! # async fn run() -> replbridge::Result<()> {
//! let executor = Executor::new(Config::default())?;
//! let result = executor.execute("query $chan", &ExecParams {
//!     variables: vec![("chan".into(), "CH1".into())],
//!     ..Default::default()
//! }).await?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! One capture may be in flight per session; a second concurrent call on the
//! same session fails with `CaptureBusy` rather than interleaving buffers.
//! The wait for completion is the sole suspension point and is safe to abort:
//! cleanup runs on every exit path, so the session stays usable.

pub mod capture;
pub mod config;
pub mod error;
pub mod exec;
pub mod session;
pub mod template;

// Re-exports for core functionality
pub use capture::{capture_output, CaptureSpec};
pub use config::{Config, ConfigLoader};
pub use error::{Error, Result};
pub use exec::{ExecParams, Executor};
pub use session::{Session, SessionInfo, SessionManager};

/// The current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");
