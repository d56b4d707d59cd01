//! haven-mux: tab list and two-pane layout for the Haven console.
//!
//! Every tab is bound one-to-one to a shell session (the tab id *is* the
//! session id). Closing a tab always closes its session, so there is no way
//! to end up with a live session that no tab refers to.

pub mod multiplexer;
pub mod panes;

/// Identifier of a tab; equal to the id of the session it is bound to.
pub type TabId = u64;

pub use multiplexer::{
    pane_geometry, BackendSession, Layout, MuxError, Multiplexer, SessionBackend, Tab,
    CELL_HEIGHT_PX, CELL_WIDTH_PX, MIN_COLS, MIN_ROWS, SPLIT_TAB_LABEL,
};
pub use panes::{after_close, backfill, PaneAssignment, PaneSlot};
