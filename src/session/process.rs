//! Subprocess spawning for REPL sessions
//!
//! Spawns the configured REPL executable with stdin/stdout/stderr connected
//! over plain byte pipes (no pseudo-terminal) and wires the pipes to a
//! [`Session`]: a writer task drains the input channel into stdin, and both
//! output pipes are pumped into the shared session buffer.

use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{spawn_output_pump, Session};
use crate::error::{Error, Result};

/// Check that `command` names something we can plausibly execute.
///
/// Commands containing a path separator are checked directly; bare names are
/// resolved against PATH. This surfaces a descriptive error before spawn
/// instead of an opaque OS error afterwards.
pub fn validate_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(Error::SpawnFailed {
            command: command.to_string(),
            reason: "empty command".to_string(),
        });
    }

    if command.contains(std::path::MAIN_SEPARATOR) {
        if Path::new(command).is_file() {
            return Ok(());
        }
        return Err(Error::CommandNotFound {
            command: command.to_string(),
        });
    }

    let path = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path) {
        if dir.join(command).is_file() {
            return Ok(());
        }
    }

    Err(Error::CommandNotFound {
        command: command.to_string(),
    })
}

/// Spawn the REPL executable and return a live session registered under `name`.
///
/// The command is invoked with no arguments. The child is reaped by a
/// background task; its exit is observed by the session as end-of-stream on
/// stdout.
pub async fn spawn_repl_session(name: &str, command: &str) -> Result<Session> {
    validate_command(command)?;

    let mut child = Command::new(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::SpawnFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| Error::SpawnFailed {
        command: command.to_string(),
        reason: "stdin pipe unavailable".to_string(),
    })?;
    let stdout = child.stdout.take().ok_or_else(|| Error::SpawnFailed {
        command: command.to_string(),
        reason: "stdout pipe unavailable".to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| Error::SpawnFailed {
        command: command.to_string(),
        reason: "stderr pipe unavailable".to_string(),
    })?;

    let pid = child.id();
    info!(session = %name, command = %command, pid = ?pid, "REPL subprocess spawned");

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let session = Session::new_spawned(name.to_string(), pid, input_tx);

    // Writer task: drain queued input lines into the child's stdin.
    let writer_session = name.to_string();
    tokio::spawn(async move {
        while let Some(bytes) = input_rx.recv().await {
            if let Err(e) = stdin.write_all(&bytes).await {
                debug!(session = %writer_session, error = %e, "stdin write failed");
                break;
            }
            if let Err(e) = stdin.flush().await {
                debug!(session = %writer_session, error = %e, "stdin flush failed");
                break;
            }
        }
    });

    // stdout closing ends the session; stderr is merged into the same buffer.
    spawn_output_pump(&session, stdout, true);
    spawn_output_pump(&session, stderr, false);

    // Keep the child handle alive until the process exits.
    let reaper_session = name.to_string();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(session = %reaper_session, %status, "REPL subprocess exited"),
            Err(e) => debug!(session = %reaper_session, error = %e, "wait on REPL subprocess failed"),
        }
    });

    Ok(session)
}
