// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod commands;
mod state;
mod surface;

use std::str::FromStr;
use std::sync::Arc;

use haven_config::{ConfigError, ConsoleConfig, LoadedConfig};
use haven_ipc::{Boundary, OutputBridge, PushSink};
use haven_pty::{RegistryOptions, SessionRegistry};
use log::LevelFilter;
use state::AppState;
use surface::{WindowSink, MAIN_WINDOW};
use tauri::{Manager, RunEvent, WindowEvent};
use tauri_plugin_log::{Target, TargetKind};

/// Environment variable holding the log level (`error` .. `trace`).
const LOG_ENV: &str = "HAVEN_LOG";

fn main() {
    let (loaded, config_error) = config_or_default(haven_config::load());
    let log_level = parse_log_level(std::env::var(LOG_ENV).ok().as_deref());

    tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::default()
                .level(log_level)
                .targets([
                    Target::new(TargetKind::Stdout),
                    Target::new(TargetKind::LogDir { file_name: None }),
                ])
                .build(),
        )
        .setup(move |app| {
            match config_error {
                Some(e) => log::warn!("{e}; using default configuration"),
                None => log::info!("config: {}", loaded.config_path.display()),
            }

            let sink: Arc<dyn PushSink> = Arc::new(WindowSink::new(app.handle().clone()));
            let runtime = tauri::async_runtime::handle().inner().clone();
            let bridge = OutputBridge::start(runtime, sink);

            let registry = SessionRegistry::new(RegistryOptions {
                shell: loaded.config.shell.clone(),
                working_dir: loaded.config.working_dir.clone(),
            });
            app.manage(AppState::new(Boundary::new(registry, bridge), loaded));
            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                if window.label() == MAIN_WINDOW {
                    log::info!("main window closed, closing all sessions");
                    if let Some(state) = window.try_state::<AppState>() {
                        state.shutdown();
                    }
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::terminal::create_terminal,
            commands::terminal::write_terminal,
            commands::terminal::resize_terminal,
            commands::terminal::close_terminal,
            commands::panes::select_tab,
            commands::panes::toggle_split,
            commands::panes::resize_pane,
            commands::panes::layout,
            commands::config::get_config,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| {
            if let RunEvent::Exit = event {
                log::info!("shutting down, closing all sessions");
                if let Some(state) = app.try_state::<AppState>() {
                    state.shutdown();
                }
            }
        });
}

/// Fall back to built-in defaults when the config cannot be loaded.
///
/// A broken config file should not keep the console from starting. The
/// error is handed back so it can be logged once logging is up.
fn config_or_default(
    result: Result<LoadedConfig, ConfigError>,
) -> (LoadedConfig, Option<ConfigError>) {
    match result {
        Ok(loaded) => (loaded, None),
        Err(e) => {
            let mut config = ConsoleConfig::default();
            haven_config::apply_shell_override(
                &mut config,
                std::env::var(haven_config::SHELL_ENV).ok(),
            );
            let loaded = LoadedConfig {
                config,
                config_path: haven_config::user_config_path().unwrap_or_default(),
            };
            (loaded, Some(e))
        }
    }
}

fn parse_log_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}
