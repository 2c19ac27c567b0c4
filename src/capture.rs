//! Synchronous output capture over a session's raw text stream
//!
//! The subprocess offers no framing: output is plain interleaved text with a
//! recurring ready-prompt. [`capture_output`] turns one command submission
//! into a bounded capture window:
//!
//! 1. quarantine dangling text (output that predates this call),
//! 2. run the caller's submit action,
//! 3. wait until the end-of-evaluation marker and a subsequent prompt both
//!    appear (or the stream closes, or an optional timeout fires),
//! 4. restore the quarantined text after the captured output,
//! 5. strip the echoed input, and
//! 6. split the remainder on the prompt pattern.
//!
//! Steps 1 and 4 are tied together by a guard whose `Drop` runs on every exit
//! path, so an aborted capture never loses bytes or leaves the session in a
//! state the next caller cannot use.

use regex::Regex;
use std::pin::pin;
use std::time::Duration;
use tokio::time;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::session::Session;

/// Parameters for one capture window.
#[derive(Debug, Clone)]
pub struct CaptureSpec<'a> {
    /// Literal marker whose echo signals end of evaluation
    pub eoe_marker: &'a str,
    /// Pattern recognizing the subprocess's ready-prompt
    pub prompt: &'a Regex,
    /// Whether to strip the echoed input from the captured output
    pub strip_echo: bool,
    /// The exact submitted text, needed to recognize its echo
    pub full_body: &'a str,
    /// Pause before the first completion check
    pub settle_delay: Duration,
    /// Fail with `CaptureTimeout` instead of waiting forever; `None` blocks
    /// indefinitely
    pub timeout: Option<Duration>,
}

/// Submit a command through `action` and capture everything the subprocess
/// prints in response, split on the prompt pattern.
///
/// `action` is the only step allowed to write to the subprocess's input; it
/// receives the session so callers decide what to send. At most one capture
/// may be in flight per session; a concurrent call fails with
/// [`Error::CaptureBusy`].
pub async fn capture_output<F>(
    session: &Session,
    spec: CaptureSpec<'_>,
    action: F,
) -> Result<Vec<String>>
where
    F: FnOnce(&Session) -> Result<()>,
{
    let _gate = session.try_begin_capture()?;
    let mut window = CaptureWindow::quarantine(session);
    trace!(session = %session.name(), "capture window opened");

    action(session)?;

    // The subprocess may need a moment before it starts responding.
    time::sleep(spec.settle_delay).await;

    let wait = wait_for_completion(session, spec.eoe_marker, spec.prompt);
    match spec.timeout {
        Some(limit) => match time::timeout(limit, wait).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::CaptureTimeout { duration: limit }),
        },
        None => wait.await?,
    }

    let captured = window.finish();
    trace!(session = %session.name(), bytes = captured.len(), "capture window closed");

    let captured = if spec.strip_echo && !spec.full_body.is_empty() {
        strip_echo(&captured, spec.full_body)
    } else {
        captured
    };

    Ok(split_segments(&captured, spec.prompt))
}

/// Quarantined dangling text plus the obligation to put it back.
///
/// On the success path [`finish`](CaptureWindow::finish) consumes the captured
/// output and re-appends the dangling text after it. If the capture is
/// abandoned (error or cancellation) `Drop` re-appends the dangling text after
/// whatever partial output arrived, leaving every byte unconsumed for the next
/// caller.
struct CaptureWindow {
    session: Session,
    dangling: Option<String>,
}

impl CaptureWindow {
    fn quarantine(session: &Session) -> Self {
        let mut st = session.state();
        // Output consumed by previous calls is history; release it so the
        // buffer does not grow without bound across captures.
        let consumed = st.consumed;
        st.buffer.drain(..consumed);
        st.consumed = 0;
        let dangling = std::mem::take(&mut st.buffer);
        if !dangling.is_empty() {
            debug!(bytes = dangling.len(), "quarantined dangling text");
        }
        drop(st);
        Self {
            session: session.clone(),
            dangling: Some(dangling),
        }
    }

    /// Consume the captured output and restore the dangling text after it.
    fn finish(&mut self) -> String {
        let dangling = self.dangling.take().unwrap_or_default();
        let mut st = self.session.state();
        st.consumed = st.buffer.len();
        let captured = st.buffer.clone();
        st.buffer.push_str(&dangling);
        captured
    }
}

impl Drop for CaptureWindow {
    fn drop(&mut self) {
        // `finish` already ran if this is None.
        if let Some(dangling) = self.dangling.take() {
            debug!("capture abandoned; restoring quarantined text");
            let mut st = self.session.state();
            st.buffer.push_str(&dangling);
        }
    }
}

/// Block until `marker` appears in the output produced during this capture
/// and the prompt pattern matches somewhere after it.
///
/// Wakes on every appended chunk; detects end-of-stream (not just "no new
/// data yet") and fails instead of waiting forever.
async fn wait_for_completion(session: &Session, marker: &str, prompt: &Regex) -> Result<()> {
    loop {
        // Register for wakeup before inspecting the buffer so a chunk that
        // lands between the check and the await is not missed.
        let mut notified = pin!(session.data_ready().notified());
        notified.as_mut().enable();

        {
            let st = session.state();
            if let Some(pos) = st.buffer.find(marker) {
                if prompt.is_match(&st.buffer[pos + marker.len()..]) {
                    return Ok(());
                }
            }
            if st.eof {
                return Err(Error::StreamClosed {
                    session: session.name().to_string(),
                });
            }
        }

        notified.await;
    }
}

/// Remove the echoed input from the front of the captured output.
///
/// Interactive tools may echo `\n` as `\r\n`, so newlines in the submitted
/// text match any newline run. A failed match is not an error: the unstripped
/// output is returned and the mismatch logged.
fn strip_echo(captured: &str, full_body: &str) -> String {
    let mut pattern = regex::escape(full_body).replace('\n', "[\r\n]+");
    pattern.push_str("[\r\n]*");

    if let Ok(re) = Regex::new(&pattern) {
        if let Some(m) = re.find(captured) {
            return captured[m.end()..].to_string();
        }
    }

    debug!("echoed input not found in captured output; returning it unstripped");
    captured.to_string()
}

/// Split captured text on the prompt pattern; each prompt occurrence is a
/// record delimiter, so n prompts yield n+1 segments.
fn split_segments(captured: &str, prompt: &Regex) -> Vec<String> {
    prompt.split(captured).map(str::to_string).collect()
}
