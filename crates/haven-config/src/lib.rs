//! haven-config: the console's configuration file.
//!
//! The file lives at `~/.haven/config.json` and is created from the built-in
//! defaults on first run, next to empty `themes/` and `plugins/` directories.
//! It is read once at startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the per-user directory under the home directory.
pub const APP_DIR_NAME: &str = ".haven";
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Environment variable that overrides the configured shell.
pub const SHELL_ENV: &str = "HAVEN_SHELL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Effective console settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// Shell to start in new sessions; the platform default when unset.
    pub shell: Option<String>,
    /// Starting directory for new sessions; the home directory when unset.
    pub working_dir: Option<PathBuf>,
    pub theme: String,
    pub plugin_dirs: Vec<String>,
    pub theme_dirs: Vec<String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            shell: None,
            working_dir: None,
            theme: "haven-dark".to_string(),
            plugin_dirs: vec![format!("~/{APP_DIR_NAME}/plugins")],
            theme_dirs: vec![format!("~/{APP_DIR_NAME}/themes")],
        }
    }
}

/// The user's file as written: every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserConfig {
    shell: Option<String>,
    working_dir: Option<PathBuf>,
    theme: Option<String>,
    #[serde(default)]
    plugin_dirs: Vec<String>,
    #[serde(default)]
    theme_dirs: Vec<String>,
}

/// Loaded configuration plus the file it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedConfig {
    #[serde(flatten)]
    pub config: ConsoleConfig,
    pub config_path: PathBuf,
}

/// `~/.haven` for the given home directory.
pub fn app_dir(home: &Path) -> PathBuf {
    home.join(APP_DIR_NAME)
}

pub fn config_path(home: &Path) -> PathBuf {
    app_dir(home).join(CONFIG_FILE_NAME)
}

/// `~/.haven/config.json` for the current user, if a home directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| config_path(&home))
}

/// Expand a leading `~` to `home`. Other paths are returned unchanged.
pub fn expand_home(path: &str, home: &Path) -> String {
    if path == "~" {
        return home.to_string_lossy().into_owned();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest).to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

/// Create the app directory, `themes/`, `plugins/` and a default config
/// file if any of them are missing. An existing file is never touched.
pub fn ensure_user_config(home: &Path) -> Result<PathBuf, ConfigError> {
    let dir = app_dir(home);
    for sub in [dir.clone(), dir.join("themes"), dir.join("plugins")] {
        fs::create_dir_all(&sub).map_err(|source| ConfigError::Io { path: sub, source })?;
    }

    let path = config_path(home);
    if !path.exists() {
        let defaults = serde_json::to_string_pretty(&ConsoleConfig::default()).map_err(|source| {
            ConfigError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, defaults).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("wrote default config to {}", path.display());
    }
    Ok(path)
}

/// Load the configuration for `home`, creating it on first run.
///
/// User values override the defaults key by key. The directory lists are
/// the defaults followed by the user's entries, `~`-expanded, with
/// duplicates removed keeping the first occurrence.
pub fn load_from_home(home: &Path) -> Result<LoadedConfig, ConfigError> {
    let path = ensure_user_config(home)?;
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let user: UserConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    Ok(LoadedConfig {
        config: merge(ConsoleConfig::default(), user, home),
        config_path: path,
    })
}

/// Load the configuration from the current user's home directory, then
/// apply the `HAVEN_SHELL` override.
pub fn load() -> Result<LoadedConfig, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    let mut loaded = load_from_home(&home)?;
    apply_shell_override(&mut loaded.config, std::env::var(SHELL_ENV).ok());
    Ok(loaded)
}

/// Replace the configured shell with `value` when it is non-empty.
pub fn apply_shell_override(config: &mut ConsoleConfig, value: Option<String>) {
    if let Some(shell) = value.filter(|s| !s.trim().is_empty()) {
        log::info!("shell overridden by {SHELL_ENV}: {shell}");
        config.shell = Some(shell);
    }
}

fn merge(defaults: ConsoleConfig, user: UserConfig, home: &Path) -> ConsoleConfig {
    let working_dir = user
        .working_dir
        .or(defaults.working_dir)
        .map(|dir| PathBuf::from(expand_home(&dir.to_string_lossy(), home)));

    ConsoleConfig {
        shell: user.shell.or(defaults.shell),
        working_dir,
        theme: user.theme.unwrap_or(defaults.theme),
        plugin_dirs: merge_dirs(defaults.plugin_dirs, user.plugin_dirs, home),
        theme_dirs: merge_dirs(defaults.theme_dirs, user.theme_dirs, home),
    }
}

fn merge_dirs(defaults: Vec<String>, user: Vec<String>, home: &Path) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(defaults.len() + user.len());
    for dir in defaults.into_iter().chain(user) {
        let dir = expand_home(&dir, home);
        if !merged.contains(&dir) {
            merged.push(dir);
        }
    }
    merged
}
