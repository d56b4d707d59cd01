use std::io::Read;
use std::path::Path;

use crate::pty::{PtyError, PtyHandle};

/// Unique identifier for a terminal session.
pub type SessionId = u64;

/// Lifecycle of a session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Process spawned, output reader not running yet.
    Starting,
    /// Accepting input, resizes, and producing output.
    Active,
    /// Killed, torn down, or exited on its own.
    Closed,
}

/// Read-only snapshot of a session for listing and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub shell: String,
    pub state: SessionState,
    pub cols: u16,
    pub rows: u16,
}

/// One interactive shell process running on its own PTY.
///
/// The session is the only owner of the PTY handle; nothing else may write
/// to or signal the process.
pub struct Session {
    id: SessionId,
    shell: String,
    state: SessionState,
    cols: u16,
    rows: u16,
    pty: PtyHandle,
    exit_code: Option<u32>,
}

impl Session {
    /// Spawn `shell` with the given geometry. The session starts in
    /// [`SessionState::Starting`].
    pub fn spawn(
        id: SessionId,
        shell: &str,
        cols: u16,
        rows: u16,
        cwd: Option<&Path>,
    ) -> Result<Self, PtyError> {
        let pty = PtyHandle::spawn(shell, cols, rows, cwd)?;

        Ok(Self {
            id,
            shell: shell.to_string(),
            state: SessionState::Starting,
            cols,
            rows,
            pty,
            exit_code: None,
        })
    }

    /// Returns the session's unique identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The shell command this session was started with.
    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last applied geometry as `(cols, rows)`.
    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// OS process id of the shell.
    pub fn process_id(&self) -> Option<u32> {
        self.pty.process_id()
    }

    /// Whether the shell process is still running, independent of `state`.
    pub fn is_process_alive(&mut self) -> bool {
        self.pty.is_alive()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            shell: self.shell.clone(),
            state: self.state,
            cols: self.cols,
            rows: self.rows,
        }
    }

    /// Move from `Starting` to `Active`. Has no effect in any other state.
    pub fn activate(&mut self) {
        if self.state == SessionState::Starting {
            self.state = SessionState::Active;
        }
    }

    /// Extract the PTY reader for use in a dedicated I/O thread.
    pub fn take_pty_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.pty.take_reader()
    }

    /// Write user input to the PTY.
    pub fn write_input(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.pty.write(data)
    }

    /// Resize the PTY and record the new geometry.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.pty.resize(cols, rows)?;
        self.cols = cols;
        self.rows = rows;
        Ok(())
    }

    /// Kill the process (if still running), reap it, and mark the session
    /// closed. Calling this on a closed session returns the recorded code.
    pub fn terminate(&mut self) -> Option<u32> {
        if self.state == SessionState::Closed {
            return self.exit_code;
        }
        self.state = SessionState::Closed;
        self.exit_code = self.pty.terminate();
        self.exit_code
    }
}
