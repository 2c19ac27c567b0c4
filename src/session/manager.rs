//! Session registry
//!
//! Named session registry with get-or-spawn semantics. Each name maps to at
//! most one live subprocess; opening a name whose subprocess has exited
//! replaces it with a fresh spawn.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{process, Session};
use crate::error::{Error, Result};

/// Snapshot of one registered session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Registered name
    pub name: String,
    /// Subprocess pid, if spawned
    pub pid: Option<u32>,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Whether the output stream is still open
    pub is_alive: bool,
}

/// Registry of named REPL sessions.
pub struct SessionManager {
    /// Executable spawned for sessions created through [`SessionManager::open`]
    command: String,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionManager {
    /// Create a registry that spawns `command` for new sessions.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the live session registered under `name`, spawning one if the
    /// name is unknown or its subprocess has exited.
    pub async fn open(&self, name: &str) -> Result<Session> {
        // Write lock for the whole call so two concurrent opens of the same
        // name cannot both spawn.
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(name) {
            if existing.is_alive() {
                debug!(session = %name, "reusing live session");
                return Ok(existing.clone());
            }
            info!(session = %name, "session dead, respawning");
        }

        let session = process::spawn_repl_session(name, &self.command).await?;
        sessions.insert(name.to_string(), session.clone());
        Ok(session)
    }

    /// Look up a session without spawning.
    pub async fn get(&self, name: &str) -> Option<Session> {
        self.sessions.read().await.get(name).cloned()
    }

    /// Register a pre-built session (e.g. one created via
    /// [`Session::from_channels`]) under its own name, replacing any
    /// previous entry.
    pub async fn insert(&self, session: Session) {
        let name = session.name().to_string();
        self.sessions.write().await.insert(name, session);
    }

    /// Remove and return the session registered under `name`.
    pub async fn remove(&self, name: &str) -> Option<Session> {
        self.sessions.write().await.remove(name)
    }

    /// Names of all registered sessions.
    pub async fn list(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Number of registered sessions (live or dead).
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Information about the session registered under `name`.
    pub async fn info(&self, name: &str) -> Result<SessionInfo> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(name).ok_or_else(|| Error::SessionNotFound {
            name: name.to_string(),
        })?;
        Ok(SessionInfo {
            name: session.name().to_string(),
            pid: session.pid(),
            started_at: session.started_at(),
            is_alive: session.is_alive(),
        })
    }
}
