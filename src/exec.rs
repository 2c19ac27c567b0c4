//! Execution orchestration
//!
//! Composes templating, the session registry, and the capture protocol into
//! the one caller-facing operation: [`Executor::execute`] submits a command
//! body to a named session and returns its output as a single string.
//!
//! The interactive tool has no native "done" signal, so after the body the
//! orchestrator submits the sentinel marker as its own input line. The
//! marker's deliberately unrecognizable syntax provokes a predictable
//! "unknown syntax" error echo, and that echo followed by a fresh prompt is
//! the completion condition.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::capture::{capture_output, CaptureSpec};
use crate::config::Config;
use crate::error::Result;
use crate::session::SessionManager;
use crate::template;

/// ANSI color/style sequences some REPLs sprinkle into their output.
static ANSI_CODES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[mGKH]").expect("static pattern compiles"));

/// Per-call parameters recognized by [`Executor::execute`].
///
/// `session` accepts a target session name, with `None` or the literal
/// `"none"` selecting the configured default session.
#[derive(Debug, Clone, Default)]
pub struct ExecParams {
    /// Target session name
    pub session: Option<String>,
    /// Text prepended to the body before submission
    pub prologue: Option<String>,
    /// Text appended to the body before submission
    pub epilogue: Option<String>,
    /// `$name` substitution values, applied in order
    pub variables: Vec<(String, String)>,
}

/// Synchronous command executor over named REPL sessions.
pub struct Executor {
    manager: SessionManager,
    prompt: Regex,
    config: Config,
}

impl Executor {
    /// Build an executor from validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let prompt = Regex::new(&config.capture.prompt_pattern)?;
        let manager = SessionManager::new(config.repl.command.clone());
        Ok(Self {
            manager,
            prompt,
            config,
        })
    }

    /// The session registry, exposed so embedders can pre-register sessions
    /// or inspect live ones.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Execute `body` on the session named in `params` and return its output.
    ///
    /// Blocks until the subprocess has printed the sentinel echo and a fresh
    /// prompt. The returned string is the trimmed, echo-stripped output with
    /// sentinel artifacts removed.
    pub async fn execute(&self, body: &str, params: &ExecParams) -> Result<String> {
        let name = params
            .session
            .as_deref()
            .filter(|s| !s.is_empty() && *s != "none")
            .unwrap_or(&self.config.repl.default_session);

        let session = self.manager.open(name).await?;
        let expanded = template::expand_body(
            body,
            &params.variables,
            params.prologue.as_deref(),
            params.epilogue.as_deref(),
        );
        debug!(session = %name, bytes = expanded.len(), "submitting expanded body");

        let capture = &self.config.capture;
        let spec = CaptureSpec {
            eoe_marker: &capture.eoe_marker,
            prompt: &self.prompt,
            strip_echo: capture.strip_echo,
            full_body: &expanded,
            settle_delay: capture.settle_delay(),
            timeout: capture.timeout(),
        };

        let submitted = expanded.clone();
        let marker_line = capture.eoe_marker.clone();
        let segments = capture_output(&session, spec, move |s| {
            s.send(&submitted)?;
            s.send(&marker_line)
        })
        .await?;

        Ok(assemble_result(&segments, &capture.eoe_marker))
    }
}

/// Reduce captured segments to the final result string: strip stray ANSI
/// codes, trim each segment, drop sentinel artifacts and empty remnants
/// (banner text predates the capture window and never appears here), and
/// rejoin with newlines.
fn assemble_result(segments: &[String], eoe_marker: &str) -> String {
    segments
        .iter()
        .map(|segment| ANSI_CODES.replace_all(segment, "").trim().to_string())
        .filter(|segment| !segment.is_empty() && !segment.contains(eoe_marker))
        .collect::<Vec<_>>()
        .join("\n")
}
