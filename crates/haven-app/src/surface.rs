//! Push sink backed by the main webview window.

use haven_ipc::{PushEvent, PushSink};
use tauri::{AppHandle, Emitter, Manager};

/// Label of the console window in `tauri.conf.json`.
pub const MAIN_WINDOW: &str = "main";

pub struct WindowSink {
    app: AppHandle,
}

impl WindowSink {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl PushSink for WindowSink {
    fn deliver(&self, event: &PushEvent) -> bool {
        // The window is gone (or not yet built): nothing to show it on.
        let Some(window) = self.app.get_webview_window(MAIN_WINDOW) else {
            return false;
        };
        match window.emit(event.event_name(), event) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("emit {} failed: {e}", event.event_name());
                false
            }
        }
    }
}
