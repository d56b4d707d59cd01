//! haven-ipc: the boundary between the display and the session side.
//!
//! Requests flow in as [`SessionRequest`]s; output and exits flow out as
//! [`PushEvent`]s through a [`PushSink`]. Nothing but session ids, text, and
//! geometry crosses.

pub mod adapter;
pub mod bridge;
pub mod messages;

pub use adapter::{Boundary, BoundaryClient, BoundaryError};
pub use bridge::{OutputBridge, PushSink, Utf8Stream};
pub use messages::{
    event_names, DataNotification, ExitNotification, PushEvent, SessionRequest, SessionResponse,
};
