use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const MAX_RECENT_FILES: usize = 8;
const APP_DIR: &str = "lay-editor";
const CONFIG_FILE: &str = "editor_config.json";

/// Editor preferences persisted between runs. Projects themselves are never
/// stored here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub last_directory: Option<PathBuf>,
    pub recent_files: Vec<PathBuf>,
    pub show_grid: bool,
    pub grid_spacing: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            last_directory: None,
            recent_files: Vec::new(),
            show_grid: true,
            grid_spacing: 32.0,
        }
    }
}

impl EditorConfig {
    /// `lay-editor/editor_config.json` under the user's config folder, or
    /// next to the binary when no such folder exists.
    pub fn default_path() -> PathBuf {
        match config_root() {
            Some(root) => root.join(APP_DIR).join(CONFIG_FILE),
            None => PathBuf::from(CONFIG_FILE),
        }
    }

    /// A missing file is not an error; it just means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {:?}", path))?;
        let config = serde_json::from_str(&json).context("Invalid config format")?;
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write config at {:?}", path))?;
        Ok(())
    }

    /// Move `path` to the top of the recent list and remember its folder.
    pub fn remember_file(&mut self, path: &Path) {
        self.recent_files.retain(|p| p != path);
        self.recent_files.insert(0, path.to_path_buf());
        self.recent_files.truncate(MAX_RECENT_FILES);
        if let Some(parent) = path.parent() {
            self.last_directory = Some(parent.to_path_buf());
        }
    }
}

pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Per-user settings folder for the current platform, if one can be found.
fn config_root() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        return home::home_dir().map(|h| h.join("Library").join("Application Support"));
    }
    if cfg!(target_os = "windows") {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
    }
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .or_else(|| home::home_dir().map(|h| h.join(".config")))
}
