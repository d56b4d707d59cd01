//! Wire types for the session boundary.
//!
//! Only session ids, text, and geometry appear here. Requests come from the
//! display side; push events go to it.

use haven_pty::SessionId;
use serde::{Deserialize, Serialize};

/// A request from the display side.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionRequest {
    /// Start a new shell.
    Create,
    /// Keystrokes or pasted text for a session.
    Write { id: SessionId, data: String },
    /// The session's pane changed size.
    Resize { id: SessionId, cols: u16, rows: u16 },
    /// End a session.
    Close { id: SessionId },
}

/// The answer to a [`SessionRequest`].
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionResponse {
    Created { id: SessionId, shell: String },
    Ack,
}

/// Output text from a session.
///
/// Event name: `terminal:data`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DataNotification {
    pub id: SessionId,
    pub data: String,
}

/// The session's shell is gone.
///
/// Event name: `terminal:exit`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExitNotification {
    pub id: SessionId,
    pub code: Option<u32>,
}

/// Everything pushed from the session side to the display.
///
/// Serializes as the bare notification payload; the variant is carried by
/// the event name.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum PushEvent {
    Data(DataNotification),
    Exited(ExitNotification),
}

impl PushEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            PushEvent::Data(_) => event_names::TERMINAL_DATA,
            PushEvent::Exited(_) => event_names::TERMINAL_EXIT,
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            PushEvent::Data(n) => n.id,
            PushEvent::Exited(n) => n.id,
        }
    }
}

/// Event name constants.
pub mod event_names {
    pub const TERMINAL_DATA: &str = "terminal:data";
    pub const TERMINAL_EXIT: &str = "terminal:exit";
}
