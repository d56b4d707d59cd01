use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::io_thread::IoThread;
use crate::output::{Outlet, Subscription};
use crate::pty::{default_shell, PtyError};
use crate::session::{Session, SessionId, SessionInfo};

/// Geometry every new session starts with.
pub const DEFAULT_COLS: u16 = 120;
pub const DEFAULT_ROWS: u16 = 30;

/// Smallest geometry a resize may apply.
pub const MIN_COLS: u16 = 20;
pub const MIN_ROWS: u16 = 5;

/// Clamp a requested geometry to the registry minimums.
pub fn clamp_geometry(cols: u16, rows: u16) -> (u16, u16) {
    (cols.max(MIN_COLS), rows.max(MIN_ROWS))
}

/// How new sessions are launched.
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Shell override from configuration. `None` means `$SHELL` or the
    /// platform default.
    pub shell: Option<String>,
    /// Working directory for new shells. `None` means the home directory.
    pub working_dir: Option<PathBuf>,
}

/// What a successful `create_session` reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub id: SessionId,
    pub shell: String,
}

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    outlet: Arc<Mutex<Outlet>>,
}

pub(crate) struct RegistryInner {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    next_id: AtomicU64,
    options: RegistryOptions,
}

impl RegistryInner {
    fn lookup(&self, id: SessionId) -> Option<Arc<Mutex<Session>>> {
        let sessions = self.sessions.lock().ok()?;
        sessions.get(&id).map(|entry| Arc::clone(&entry.session))
    }

    /// Drop a session whose process already exited.
    pub(crate) fn forget(&self, id: SessionId) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(&id);
        }
    }
}

/// Owns every live shell session: assigns ids, spawns and kills processes,
/// and routes input, resizes, and output subscriptions.
///
/// Cloning is cheap; all clones share the same session table.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                options,
            }),
        }
    }

    /// Spawn a new shell and register it.
    ///
    /// `desired_shell` wins over the configured shell, which wins over the
    /// platform default. Nothing is registered when the spawn fails.
    pub fn create_session(&self, desired_shell: Option<&str>) -> Result<CreatedSession, PtyError> {
        self.spawn_session(desired_shell, false).map(|(created, _)| created)
    }

    /// Like [`create_session`](Self::create_session), but also hands back a
    /// subscription taken before the shell's output is read.
    ///
    /// The subscription sees every byte and the final `Exited`, even when
    /// the shell exits before this returns.
    pub fn create_subscribed(
        &self,
        desired_shell: Option<&str>,
    ) -> Result<(CreatedSession, Subscription), PtyError> {
        match self.spawn_session(desired_shell, true)? {
            (created, Some(subscription)) => Ok((created, subscription)),
            (created, None) => {
                self.close(created.id);
                Err(PtyError::SpawnFailed("output subscription unavailable".to_string()))
            }
        }
    }

    fn spawn_session(
        &self,
        desired_shell: Option<&str>,
        subscribe: bool,
    ) -> Result<(CreatedSession, Option<Subscription>), PtyError> {
        let shell = desired_shell
            .map(str::to_string)
            .or_else(|| self.inner.options.shell.clone())
            .unwrap_or_else(default_shell);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut session = Session::spawn(
            id,
            &shell,
            DEFAULT_COLS,
            DEFAULT_ROWS,
            self.inner.options.working_dir.as_deref(),
        )?;
        let reader = session
            .take_pty_reader()
            .ok_or_else(|| PtyError::SpawnFailed("PTY reader unavailable".to_string()))?;

        let session = Arc::new(Mutex::new(session));
        let outlet = Arc::new(Mutex::new(Outlet::new(id)));
        // Taken before the reader starts so an early exit cannot slip past.
        let subscription = if subscribe {
            outlet
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .subscribe()
        } else {
            None
        };

        // Registered as Starting: input and resizes are ignored until the
        // reader is running.
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                SessionEntry {
                    session: Arc::clone(&session),
                    outlet: Arc::clone(&outlet),
                },
            );

        let io = IoThread {
            id,
            reader,
            session: Arc::clone(&session),
            outlet,
            registry: Arc::downgrade(&self.inner),
        };
        if let Err(e) = io.start() {
            self.close(id);
            return Err(PtyError::SpawnFailed(format!("failed to start I/O thread: {e}")));
        }

        if let Ok(mut session) = session.lock() {
            session.activate();
        }

        log::info!("session {id} started: {shell} ({DEFAULT_COLS}x{DEFAULT_ROWS})");
        Ok((CreatedSession { id, shell }, subscription))
    }

    /// Forward input bytes to the session's shell.
    ///
    /// Silently ignored unless the session is active: a keystroke racing a
    /// close is not an error.
    pub fn write(&self, id: SessionId, data: &[u8]) {
        let Some(session) = self.inner.lookup(id) else {
            return;
        };
        let Ok(mut session) = session.lock() else {
            return;
        };
        if !session.is_active() {
            return;
        }
        if let Err(e) = session.write_input(data) {
            log::debug!("write to session {id} failed: {e}");
        }
    }

    /// Resize the session's terminal, clamped to [`MIN_COLS`] x [`MIN_ROWS`].
    ///
    /// No-op unless the session is active.
    pub fn resize(&self, id: SessionId, cols: u16, rows: u16) {
        let Some(session) = self.inner.lookup(id) else {
            return;
        };
        let Ok(mut session) = session.lock() else {
            return;
        };
        if !session.is_active() {
            return;
        }

        let (cols, rows) = clamp_geometry(cols, rows);
        match session.resize(cols, rows) {
            Ok(()) => log::debug!("session {id} resized to {cols}x{rows}"),
            Err(e) => log::debug!("resize of session {id} failed: {e}"),
        }
    }

    /// Register for the session's output.
    ///
    /// The first subscriber also receives whatever the shell printed before
    /// it subscribed. Returns `None` for unknown or closed sessions.
    pub fn subscribe(&self, id: SessionId) -> Option<Subscription> {
        let outlet = {
            let sessions = self.inner.sessions.lock().ok()?;
            Arc::clone(&sessions.get(&id)?.outlet)
        };
        let mut outlet = outlet.lock().ok()?;
        outlet.subscribe()
    }

    /// Kill the session's process and forget it.
    ///
    /// Returns once the child has been reaped. Unknown or already closed ids
    /// are ignored.
    pub fn close(&self, id: SessionId) {
        let entry = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        if let Some(entry) = entry {
            shut_down(id, entry);
        }
    }

    /// Close every session. No spawned process is left running once this
    /// returns.
    pub fn close_all(&self) {
        let entries: Vec<(SessionId, SessionEntry)> = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        if !entries.is_empty() {
            log::info!("closing {} session(s)", entries.len());
        }
        for (id, entry) in entries {
            shut_down(id, entry);
        }
    }

    /// Whether `id` names a session that currently accepts input.
    pub fn is_active(&self, id: SessionId) -> bool {
        self.inner
            .lookup(id)
            .and_then(|session| session.lock().ok().map(|s| s.is_active()))
            .unwrap_or(false)
    }

    /// Snapshot of a registered session.
    pub fn info(&self, id: SessionId) -> Option<SessionInfo> {
        let session = self.inner.lookup(id)?;
        let session = session.lock().ok()?;
        Some(session.info())
    }

    /// List all registered session IDs in creation order.
    pub fn list_sessions(&self) -> Vec<SessionId> {
        let Ok(sessions) = self.inner.sessions.lock() else {
            return Vec::new();
        };
        let mut ids: Vec<SessionId> = sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RegistryOptions::default())
    }
}

/// Silence subscribers first so nothing is delivered after close, then kill
/// and reap the child.
fn shut_down(id: SessionId, entry: SessionEntry) {
    entry
        .outlet
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retire();

    let code = entry
        .session
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .terminate();

    log::info!("session {id} closed (code {code:?})");
}
