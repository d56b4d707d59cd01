//! Tauri commands for tab selection and the split view.

use haven_mux::{Layout, PaneSlot, TabId};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaneGeometry {
    pub cols: u16,
    pub rows: u16,
}

#[tauri::command]
pub async fn select_tab(state: tauri::State<'_, AppState>, id: TabId) -> Result<Layout, String> {
    let mut mux = state.mux.lock().map_err(|e| format!("Lock error: {e}"))?;
    mux.select_tab(id);
    Ok(mux.layout())
}

/// The split button.
///
/// If the split view needed a new shell and it failed to start, the error is
/// returned; the layout is still consistent and can be re-read with
/// [`layout`].
#[tauri::command]
pub async fn toggle_split(state: tauri::State<'_, AppState>) -> Result<Layout, String> {
    let mut mux = state.mux.lock().map_err(|e| format!("Lock error: {e}"))?;
    mux.toggle_split().map_err(|e| e.to_string())?;
    Ok(mux.layout())
}

/// Fit the session shown in `pane` to its new pixel size.
///
/// `None` when nothing was resized (empty, hidden, or zero-sized pane).
#[tauri::command]
pub async fn resize_pane(
    state: tauri::State<'_, AppState>,
    pane: PaneSlot,
    width: u32,
    height: u32,
) -> Result<Option<PaneGeometry>, String> {
    let mut mux = state.mux.lock().map_err(|e| format!("Lock error: {e}"))?;
    Ok(mux
        .resize_pane(pane, width, height)
        .map(|(cols, rows)| PaneGeometry { cols, rows }))
}

#[tauri::command]
pub async fn layout(state: tauri::State<'_, AppState>) -> Result<Layout, String> {
    let mux = state.mux.lock().map_err(|e| format!("Lock error: {e}"))?;
    Ok(mux.layout())
}
