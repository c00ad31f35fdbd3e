//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/hints/config.json`
//! (falling back to `~/.config/hints/config.json`).  A missing file is not
//! an error: every section falls back to its compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "alphabet": "asdfghjkl",
//!   "backends": {
//!     "enable": ["atspi", "opencv"],
//!     "atspi": {
//!       "match_rules": {
//!         "applications": {
//!           "firefox": { "states_match_type": "ANY" }
//!         }
//!       }
//!     }
//!   },
//!   "overlay_y_offset": -4,
//!   "niri": { "gaps": 8, "strut_left": 0 },
//!   "query_timeout_ms": 2000
//! }
//! ```

use crate::backends::{BackendKind, BackendsConfig};
use crate::navigation::NavigationConfig;
use crate::overlay::OverlayConfig;
use crate::selector::KeysConfig;
use crate::window_system::niri::NiriConfig;
use crate::window_system::sway::SwayConfig;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Top-level configuration.
///
/// Every field is optional, a minimal `{}` file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Symbols hint labels are built from, in priority order.  Typed keys
    /// are matched lower-cased, so upper-case symbols are rejected.
    pub alphabet: String,

    /// Element discovery backends and their settings.
    pub backends: BackendsConfig,

    /// Force a window system (`x11`, `sway`, `hyprland`, `niri`,
    /// `plasmashell`).  Empty means detect.
    pub window_system: String,

    /// Shift applied to the overlay position, for compositors that report
    /// window origins slightly off.
    pub overlay_x_offset: i32,
    pub overlay_y_offset: i32,

    pub niri: NiriConfig,

    pub sway: SwayConfig,

    /// Timeout for window-system queries in milliseconds.  `0` waits
    /// forever.
    pub query_timeout_ms: u64,

    /// Socket of the `hints-mouse` service.  Defaults to
    /// `$XDG_RUNTIME_DIR/hints-mouse.sock`.
    pub mouse_socket: Option<PathBuf>,

    pub keys: KeysConfig,

    pub navigation: NavigationConfig,

    pub overlay: OverlayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alphabet: "asdfgqwertzxcvbhjklyuiopnm".to_string(),
            backends: BackendsConfig::default(),
            window_system: String::new(),
            overlay_x_offset: 0,
            overlay_y_offset: 0,
            niri: NiriConfig::default(),
            sway: SwayConfig::default(),
            query_timeout_ms: 3000,
            mouse_socket: None,
            keys: KeysConfig::default(),
            navigation: NavigationConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/hints/config.json`, or `None` when neither
    /// `XDG_CONFIG_HOME` nor `HOME` is set.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hints").join("config.json"))
    }

    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) if p.exists() => {
                info!("loading config from {}", p.display());
                Self::load(p)
            }
            Some(p) => {
                info!("no config at {}, using defaults", p.display());
                Ok(Self::default())
            }
            None => {
                info!("no config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject settings that cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let symbols: Vec<char> = self.alphabet.chars().collect();
        if symbols.len() < 2 {
            return Err(ConfigError(format!(
                "alphabet {:?} needs at least two symbols",
                self.alphabet
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = symbols.iter().find(|c| !seen.insert(**c)) {
            return Err(ConfigError(format!(
                "alphabet {:?} contains {:?} more than once",
                self.alphabet, dup
            )));
        }
        if let Some(upper) = symbols.iter().find(|c| c.is_uppercase()) {
            return Err(ConfigError(format!(
                "alphabet {:?} contains upper-case {:?}; use lower-case symbols",
                self.alphabet, upper
            )));
        }
        for id in &self.backends.enable {
            BackendKind::from_id(id).map_err(|e| ConfigError(e.to_string()))?;
        }
        Ok(())
    }

    /// Socket path of the `hints-mouse` service.
    pub fn mouse_socket_path(&self) -> PathBuf {
        self.mouse_socket
            .clone()
            .unwrap_or_else(crate::mouse::default_socket_path)
    }
}

/// Error from loading, parsing or validating a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
