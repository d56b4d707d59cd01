//! The session side of the boundary.
//!
//! [`Boundary`] answers [`SessionRequest`]s against a [`SessionRegistry`]
//! and wires every new session into the [`OutputBridge`]. [`BoundaryClient`]
//! is the display side's handle to it, usable as a multiplexer backend.

use std::sync::Arc;

use haven_mux::{BackendSession, SessionBackend, TabId};
use haven_pty::{CreatedSession, SessionId, SessionRegistry};

use crate::bridge::OutputBridge;
use crate::messages::{SessionRequest, SessionResponse};

/// Errors reported across the boundary.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("failed to start shell: {0}")]
    Spawn(String),
    #[error("unexpected response from session side: {0:?}")]
    UnexpectedResponse(SessionResponse),
}

impl serde::Serialize for BoundaryError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub struct Boundary {
    registry: SessionRegistry,
    bridge: OutputBridge,
}

impl Boundary {
    pub fn new(registry: SessionRegistry, bridge: OutputBridge) -> Self {
        Self { registry, bridge }
    }

    /// Dispatch one request.
    ///
    /// Only `Create` can fail. Requests naming unknown or closed sessions
    /// are acknowledged and otherwise ignored.
    pub fn handle(&self, request: SessionRequest) -> Result<SessionResponse, BoundaryError> {
        match request {
            SessionRequest::Create => {
                let created = self.create(None)?;
                Ok(SessionResponse::Created {
                    id: created.id,
                    shell: created.shell,
                })
            }
            SessionRequest::Write { id, data } => {
                self.write(id, &data);
                Ok(SessionResponse::Ack)
            }
            SessionRequest::Resize { id, cols, rows } => {
                self.resize(id, cols, rows);
                Ok(SessionResponse::Ack)
            }
            SessionRequest::Close { id } => {
                self.close(id);
                Ok(SessionResponse::Ack)
            }
        }
    }

    /// Start a session and begin forwarding its output, including the exit
    /// of a shell that quits right away.
    pub fn create(&self, desired_shell: Option<&str>) -> Result<CreatedSession, BoundaryError> {
        let (created, subscription) = self
            .registry
            .create_subscribed(desired_shell)
            .map_err(|e| BoundaryError::Spawn(e.to_string()))?;

        self.bridge.attach(subscription);
        Ok(created)
    }

    pub fn write(&self, id: SessionId, data: &str) {
        self.registry.write(id, data.as_bytes());
    }

    pub fn resize(&self, id: SessionId, cols: u16, rows: u16) {
        self.registry.resize(id, cols, rows);
    }

    pub fn close(&self, id: SessionId) {
        self.registry.close(id);
    }

    /// Close every session. Called when the console shuts down.
    pub fn close_all(&self) {
        self.registry.close_all();
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn client(self: &Arc<Self>) -> BoundaryClient {
        BoundaryClient {
            boundary: Arc::clone(self),
        }
    }
}

/// Display-side handle to a shared [`Boundary`].
#[derive(Clone)]
pub struct BoundaryClient {
    boundary: Arc<Boundary>,
}

impl BoundaryClient {
    pub fn request(&self, request: SessionRequest) -> Result<SessionResponse, BoundaryError> {
        self.boundary.handle(request)
    }
}

impl SessionBackend for BoundaryClient {
    type Error = BoundaryError;

    fn create_session(&mut self) -> Result<BackendSession, BoundaryError> {
        match self.request(SessionRequest::Create)? {
            SessionResponse::Created { id, shell } => Ok(BackendSession { id, shell }),
            other => Err(BoundaryError::UnexpectedResponse(other)),
        }
    }

    fn close_session(&mut self, id: TabId) {
        if let Err(e) = self.request(SessionRequest::Close { id }) {
            log::debug!("close of session {id} failed: {e}");
        }
    }

    fn resize_session(&mut self, id: TabId, cols: u16, rows: u16) {
        if let Err(e) = self.request(SessionRequest::Resize { id, cols, rows }) {
            log::debug!("resize of session {id} failed: {e}");
        }
    }
}
