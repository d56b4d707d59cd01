//! haven-pty: shell session lifecycle for the Haven console.
//!
//! This crate owns every spawned shell. Nothing outside it ever touches a
//! process handle; callers talk in session ids and byte slices.
//!
//! # Architecture
//!
//! - [`PtyHandle`]: Low-level PTY process management (spawn, write, resize, kill).
//! - [`Session`]: One shell on a PTY plus its lifecycle state and geometry.
//! - [`SessionRegistry`]: The session table: id assignment, input routing,
//!   resizes, close/close-all, and output subscriptions.
//! - [`Subscription`]: Ordered stream of [`SessionEvent`]s for one session,
//!   fed by that session's dedicated I/O thread.

mod io_thread;
pub mod output;
pub mod pty;
pub mod registry;
pub mod session;

pub use output::{SessionEvent, Subscription, BACKLOG_LIMIT};
pub use pty::{default_shell, PtyError, PtyHandle};
pub use registry::{
    clamp_geometry, CreatedSession, RegistryOptions, SessionRegistry, DEFAULT_COLS, DEFAULT_ROWS,
    MIN_COLS, MIN_ROWS,
};
pub use session::{Session, SessionId, SessionInfo, SessionState};
