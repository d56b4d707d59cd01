//! Tauri commands for terminal sessions.
//!
//! Creating and closing go through the multiplexer so every session stays
//! bound to a tab. Input and resizes go straight to the boundary.

use haven_mux::Layout;
use haven_pty::SessionId;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedTerminal {
    pub id: SessionId,
    pub shell: String,
}

/// Open a new tab with its own shell. The tab becomes active.
#[tauri::command]
pub async fn create_terminal(
    state: tauri::State<'_, AppState>,
    label: Option<String>,
) -> Result<CreatedTerminal, String> {
    let mut mux = state.mux.lock().map_err(|e| format!("Lock error: {e}"))?;
    let tab = mux.create_tab(label.as_deref()).map_err(|e| e.to_string())?;
    Ok(CreatedTerminal {
        id: tab.id,
        shell: tab.shell.clone(),
    })
}

/// Send keystrokes or pasted text to a session.
#[tauri::command]
pub async fn write_terminal(
    state: tauri::State<'_, AppState>,
    id: SessionId,
    data: String,
) -> Result<(), String> {
    state.boundary.write(id, &data);
    Ok(())
}

#[tauri::command]
pub async fn resize_terminal(
    state: tauri::State<'_, AppState>,
    id: SessionId,
    cols: u16,
    rows: u16,
) -> Result<(), String> {
    state.boundary.resize(id, cols, rows);
    Ok(())
}

/// Close a tab and its session, returning the layout afterwards.
#[tauri::command]
pub async fn close_terminal(
    state: tauri::State<'_, AppState>,
    id: SessionId,
) -> Result<Layout, String> {
    let mut mux = state.mux.lock().map_err(|e| format!("Lock error: {e}"))?;
    if !mux.close_tab(id) {
        log::debug!("close for unknown tab {id} ignored");
    }
    Ok(mux.layout())
}
