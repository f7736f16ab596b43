use adw::Application;
use directories::{BaseDirs, ProjectDirs};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConsoleError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_STATUS_POLL_SECS: u64 = 10;
pub const DEFAULT_WALLBOARD_POLL_SECS: u64 = 15;

/// Connection settings, the only thing the console keeps on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub token: Option<String>,
    pub request_timeout_secs: u64,
    pub status_poll_secs: u64,
    pub wallboard_poll_secs: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            status_poll_secs: DEFAULT_STATUS_POLL_SECS,
            wallboard_poll_secs: DEFAULT_WALLBOARD_POLL_SECS,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    // TOML is the settings format; an older JSON file is converted on first load.
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("flexpbx-console.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("com", "flexpbx", "FlexPBXConsole")?;
        Some(proj.data_dir().join("state.json"))
    }

    /// Settings from disk with environment overrides applied.
    pub fn load() -> Self {
        let mut state = Self::toml_path()
            .and_then(|path| Self::load_from(&path))
            .or_else(|| {
                let legacy = Self::legacy_json_path()?;
                let state = Self::load_legacy(&legacy)?;
                info!("migrating settings from {}", legacy.display());
                if let Err(e) = state.save() {
                    warn!("could not write migrated settings: {e}");
                }
                Some(state)
            })
            .unwrap_or_default();
        state.apply_env(|key| std::env::var(key).ok());
        state
    }

    /// The JSON settings file written by older builds.
    pub fn load_legacy(path: &Path) -> Option<Self> {
        let bytes = fs::read(path).ok()?;
        match serde_json::from_slice::<AppState>(&bytes) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("ignoring unreadable legacy settings at {}: {e}", path.display());
                None
            }
        }
    }

    pub fn load_from(path: &Path) -> Option<Self> {
        let text = fs::read_to_string(path).ok()?;
        match toml::from_str::<AppState>(&text) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("ignoring unreadable settings at {}: {e}", path.display());
                None
            }
        }
    }

    /// `FLEXPBX_URL`, `FLEXPBX_USERNAME` and `FLEXPBX_PASSWORD` win over the file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("FLEXPBX_URL").filter(|v| !v.trim().is_empty()) {
            debug!("server URL taken from environment");
            self.base_url = crate::utils::normalize_url(&url);
        }
        if let Some(user) = var("FLEXPBX_USERNAME").filter(|v| !v.trim().is_empty()) {
            self.username = user;
        }
        if let Some(pass) = var("FLEXPBX_PASSWORD").filter(|v| !v.is_empty()) {
            self.password = pass;
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::toml_path().ok_or_else(|| ConsoleError::Config("no config directory".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConsoleError::Config(e.to_string()))?;
        }
        let toml = toml::to_string_pretty(self).map_err(|e| ConsoleError::Config(e.to_string()))?;
        fs::write(path, toml).map_err(|e| ConsoleError::Config(e.to_string()))
    }

    /// Keeps the token of a fresh sign-in; servers that issue none leave
    /// the session to the cookie.
    pub fn remember_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn has_credentials(&self) -> bool {
        !self.base_url.is_empty() && (!self.password.is_empty() || self.token.is_some())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_secs.max(1))
    }

    pub fn wallboard_poll_interval(&self) -> Duration {
        Duration::from_secs(self.wallboard_poll_secs.max(1))
    }
}

pub fn build_ui(app: &Application) {
    let state = AppState::load();
    if state.has_credentials() {
        crate::ui::main_window::show_main_window(app);
    } else {
        crate::ui::login::show_login_window(app);
    }
}
