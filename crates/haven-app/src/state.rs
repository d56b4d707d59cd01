//! Application state shared between Tauri commands and shutdown hooks.

use std::sync::{Arc, Mutex, PoisonError};

use haven_config::LoadedConfig;
use haven_ipc::{Boundary, BoundaryClient};
use haven_mux::Multiplexer;

/// Global app state managed by Tauri.
pub struct AppState {
    /// Session side of the boundary; owns every shell.
    pub boundary: Arc<Boundary>,
    /// Tabs and panes, driven by the window's UI actions.
    pub mux: Mutex<Multiplexer<BoundaryClient>>,
    /// Configuration as loaded at startup.
    pub config: LoadedConfig,
}

impl AppState {
    pub fn new(boundary: Boundary, config: LoadedConfig) -> Self {
        let boundary = Arc::new(boundary);
        let mux = Mutex::new(Multiplexer::new(boundary.client()));
        Self {
            boundary,
            mux,
            config,
        }
    }

    /// Close every tab and every session. Safe to call more than once.
    pub fn shutdown(&self) {
        self.mux
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .close_all();
        self.boundary.close_all();
    }
}
