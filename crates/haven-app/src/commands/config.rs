use haven_config::LoadedConfig;

use crate::state::AppState;

/// The configuration the console started with, plus the file path.
#[tauri::command]
pub async fn get_config(state: tauri::State<'_, AppState>) -> Result<LoadedConfig, String> {
    Ok(state.config.clone())
}
