//! Session management for REPL subprocesses
//!
//! A [`Session`] is a named, reusable handle to one live interactive
//! subprocess. Its stdin is fed through an input channel and a writer task;
//! its stdout/stderr are pumped by background reader tasks into a single
//! append-only output buffer. Every appended chunk wakes waiters, so the
//! capture protocol can block until more output arrives without polling.
//!
//! Bytes that arrive while no capture is active stay in the buffer past the
//! consumed mark ("dangling text") and are never discarded.

pub mod manager;
pub mod process;

pub use manager::{SessionInfo, SessionManager};

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, Notify};
use tracing::debug;

use crate::error::{Error, Result};

/// Accumulated output stream state for one session.
///
/// `buffer` is append-only while a capture is active; `consumed` marks the
/// end of output already handed to a caller. Everything after `consumed` is
/// dangling text.
#[derive(Debug)]
pub(crate) struct StreamState {
    pub buffer: String,
    pub consumed: usize,
    pub eof: bool,
}

#[derive(Debug)]
struct SessionInner {
    name: String,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    input_tx: mpsc::UnboundedSender<Vec<u8>>,
    state: Mutex<StreamState>,
    data_ready: Notify,
    capture_gate: tokio::sync::Mutex<()>,
}

/// Handle to one live REPL subprocess and its output stream.
///
/// Cheap to clone; all clones share the same subprocess and buffer.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new_spawned(
        name: String,
        pid: Option<u32>,
        input_tx: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                name,
                pid,
                started_at: Utc::now(),
                input_tx,
                state: Mutex::new(StreamState {
                    buffer: String::new(),
                    consumed: 0,
                    eof: false,
                }),
                data_ready: Notify::new(),
                capture_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Build a session backed by plain channels instead of a subprocess.
    ///
    /// Returns the session, a sender that feeds the session's output buffer
    /// (stands in for the subprocess's stdout) and a receiver yielding the
    /// raw bytes written via [`Session::send`] (stands in for its stdin).
    /// Closing the feed sender is observed as end-of-stream, exactly like
    /// subprocess exit. Used by tests and embedders that already own the
    /// process.
    pub fn from_channels(
        name: &str,
    ) -> (
        Self,
        mpsc::UnboundedSender<Vec<u8>>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        let (feed_tx, mut feed_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (input_tx, input_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let session = Self::new_spawned(name.to_string(), None, input_tx);
        let inner = session.inner.clone();
        tokio::spawn(async move {
            while let Some(chunk) = feed_rx.recv().await {
                inner.push_chunk(&chunk);
            }
            inner.mark_eof();
        });

        (session, feed_tx, input_rx)
    }

    /// Session name (the key it is registered under).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Process id of the subprocess, if one was spawned.
    pub fn pid(&self) -> Option<u32> {
        self.inner.pid
    }

    /// When the subprocess was started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Whether the output stream is still open.
    pub fn is_alive(&self) -> bool {
        !self.state().eof && !self.inner.input_tx.is_closed()
    }

    /// Write `text` followed by a line terminator to the subprocess stdin.
    pub fn send(&self, text: &str) -> Result<()> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(b'\n');
        self.inner
            .input_tx
            .send(bytes)
            .map_err(|e| Error::InputSendFailed {
                reason: e.to_string(),
            })
    }

    /// Output that has arrived but has not been consumed by any capture
    /// (the current dangling text).
    pub fn pending_output(&self) -> String {
        let st = self.state();
        st.buffer[st.consumed..].to_string()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, StreamState> {
        // Reader tasks hold this lock only long enough to append a chunk,
        // so poisoning would mean a panic mid-append; propagate it.
        self.inner.state.lock().expect("session stream state poisoned")
    }

    pub(crate) fn data_ready(&self) -> &Notify {
        &self.inner.data_ready
    }

    /// Acquire the per-session capture window, refusing if one is in flight.
    pub(crate) fn try_begin_capture(&self) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        self.inner
            .capture_gate
            .try_lock()
            .map_err(|_| Error::CaptureBusy {
                session: self.inner.name.clone(),
            })
    }
}

impl SessionInner {
    fn push_chunk(&self, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        {
            let mut st = self.state.lock().expect("session stream state poisoned");
            st.buffer.push_str(&text);
        }
        self.data_ready.notify_waiters();
    }

    fn mark_eof(&self) {
        {
            let mut st = self.state.lock().expect("session stream state poisoned");
            st.eof = true;
        }
        self.data_ready.notify_waiters();
    }
}

/// Pump an async byte stream into the session buffer until it closes.
///
/// `mark_eof_on_close` is set for the stdout pump only; stderr closing on its
/// own does not end the session.
pub(crate) fn spawn_output_pump<R>(session: &Session, mut reader: R, mark_eof_on_close: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let inner = session.inner.clone();
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => inner.push_chunk(&buf[..n]),
                Err(e) => {
                    debug!(session = %inner.name, error = %e, "output stream read error");
                    break;
                }
            }
        }
        if mark_eof_on_close {
            inner.mark_eof();
        }
    });
}
