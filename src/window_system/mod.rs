//! Window-system providers.
//!
//! One provider per desktop family answers "which window is focused and
//! where is it".  The provider is detected once at startup
//! ([`detect`]), constructed by [`connect`] and then passed by reference to
//! everything that needs it.
//!
//! All providers fetch their data through an [`IpcPort`] so they can be
//! driven from JSON fixtures in tests.

pub mod hyprland;
pub mod niri;
pub mod plasma;
pub mod port;
pub mod sway;
pub mod x11;

pub use port::{CommandPort, HyprlandSocket, IpcPort};

use crate::config::Config;
use crate::traits::WindowSystem;
use crate::types::{FocusedWindow, SessionType};
use log::debug;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Errors that can occur while talking to a window system.
#[derive(Debug, thiserror::Error)]
pub enum WindowSystemError {
    #[error("could not identify the session type: XDG_SESSION_TYPE is not set")]
    UnknownSessionType,

    #[error("window system {name:?} is not supported (supported: {})", .supported.join(", "))]
    NotSupported {
        name: String,
        supported: Vec<&'static str>,
    },

    #[error("{request}: {message}")]
    Query { request: String, message: String },

    #[error("{request}: no response within {timeout_ms} ms")]
    Timeout { request: String, timeout_ms: u64 },

    #[error("{request}: could not parse response: {source}")]
    Parse {
        request: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{request}: malformed response: {message}")]
    Malformed { request: String, message: String },

    #[error("no window is focused")]
    NoFocusedWindow,

    #[error("d-bus error: {0}")]
    Dbus(#[from] zbus::Error),
}

impl WindowSystemError {
    pub fn query(request: &str, message: impl fmt::Display) -> Self {
        Self::Query {
            request: request.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed(request: &str, message: impl fmt::Display) -> Self {
        Self::Malformed {
            request: request.to_string(),
            message: message.to_string(),
        }
    }
}

/// Deserialize a JSON response, attributing failures to `request`.
pub(crate) fn parse_json<T: DeserializeOwned>(
    request: &str,
    response: &str,
) -> Result<T, WindowSystemError> {
    serde_json::from_str(response).map_err(|source| WindowSystemError::Parse {
        request: request.to_string(),
        source,
    })
}

//  Kinds and detection

/// The closed set of supported window systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSystemKind {
    X11,
    Sway,
    Hyprland,
    Niri,
    Plasmashell,
}

impl WindowSystemKind {
    pub const ALL: [WindowSystemKind; 5] = [
        WindowSystemKind::X11,
        WindowSystemKind::Sway,
        WindowSystemKind::Hyprland,
        WindowSystemKind::Niri,
        WindowSystemKind::Plasmashell,
    ];

    pub fn id(self) -> &'static str {
        match self {
            WindowSystemKind::X11 => "x11",
            WindowSystemKind::Sway => "sway",
            WindowSystemKind::Hyprland => "hyprland",
            WindowSystemKind::Niri => "niri",
            WindowSystemKind::Plasmashell => "plasmashell",
        }
    }

    /// Parse a (case-insensitive) identifier.
    pub fn from_id(id: &str) -> Result<Self, WindowSystemError> {
        let lower = id.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.id() == lower)
            .ok_or_else(|| WindowSystemError::NotSupported {
                name: id.to_string(),
                supported: Self::supported(),
            })
    }

    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.id()).collect()
    }

    /// Session type implied by the kind alone.
    fn implied_session(self) -> SessionType {
        match self {
            WindowSystemKind::X11 => SessionType::X11,
            _ => SessionType::Wayland,
        }
    }
}

impl fmt::Display for WindowSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Compositor process names looked for on Wayland, in priority order.
const WAYLAND_COMPOSITORS: [&str; 4] = ["sway", "Hyprland", "niri", "plasmashell"];

/// Read `XDG_SESSION_TYPE`.  `wayland` is Wayland, any other non-empty
/// value is X11.
pub fn session_type_from(value: Option<&str>) -> Result<SessionType, WindowSystemError> {
    match value {
        None | Some("") => Err(WindowSystemError::UnknownSessionType),
        Some(v) if v.eq_ignore_ascii_case("wayland") => Ok(SessionType::Wayland),
        Some(_) => Ok(SessionType::X11),
    }
}

/// Pure detection logic.
///
/// `override_id` is the configured `window_system` (empty means detect),
/// `session` is the value of `XDG_SESSION_TYPE` and `processes` the names
/// of running processes in scan order.
pub fn detect_from<I, S>(
    override_id: &str,
    session: Option<&str>,
    processes: I,
) -> Result<(SessionType, WindowSystemKind), WindowSystemError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if !override_id.is_empty() {
        let kind = WindowSystemKind::from_id(override_id)?;
        let session = session_type_from(session).unwrap_or_else(|_| kind.implied_session());
        return Ok((session, kind));
    }

    match session_type_from(session)? {
        SessionType::X11 => Ok((SessionType::X11, WindowSystemKind::X11)),
        SessionType::Wayland => {
            let found = processes
                .into_iter()
                .find(|p| WAYLAND_COMPOSITORS.contains(&p.as_ref()))
                .ok_or_else(|| WindowSystemError::NotSupported {
                    name: "unknown wayland compositor".into(),
                    supported: WindowSystemKind::supported(),
                })?;
            let kind = WindowSystemKind::from_id(found.as_ref())?;
            Ok((SessionType::Wayland, kind))
        }
    }
}

/// Names of running processes from `/proc/<pid>/comm`, ordered by pid.
fn running_processes(proc_root: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(proc_root) else {
        return Vec::new();
    };
    let mut pids: Vec<u32> = entries
        .flatten()
        .filter_map(|e| e.file_name().to_str().and_then(|n| n.parse().ok()))
        .collect();
    pids.sort_unstable();
    pids.into_iter()
        .filter_map(|pid| std::fs::read_to_string(proc_root.join(pid.to_string()).join("comm")).ok())
        .map(|comm| comm.trim().to_string())
        .collect()
}

/// Detect the window system of the running session.
pub fn detect(override_id: &str) -> Result<(SessionType, WindowSystemKind), WindowSystemError> {
    let session = std::env::var("XDG_SESSION_TYPE").ok();
    let (session, kind) = if override_id.is_empty()
        && session_type_from(session.as_deref()).ok() == Some(SessionType::Wayland)
    {
        detect_from("", session.as_deref(), running_processes(Path::new("/proc")))?
    } else {
        detect_from(override_id, session.as_deref(), std::iter::empty::<String>())?
    };
    debug!("detected window system {} ({:?} session)", kind, session);
    Ok((session, kind))
}

//  Closed dispatch

/// The window system of the running session.
pub enum AnyWindowSystem {
    X11(x11::X11<CommandPort>),
    Sway(sway::Sway<CommandPort>),
    Hyprland(hyprland::Hyprland<HyprlandSocket>),
    Niri(niri::Niri<CommandPort>),
    Plasmashell(plasma::Plasmashell<plasma::KwinDbus>),
}

impl AnyWindowSystem {
    fn inner(&self) -> &dyn WindowSystem {
        match self {
            AnyWindowSystem::X11(w) => w,
            AnyWindowSystem::Sway(w) => w,
            AnyWindowSystem::Hyprland(w) => w,
            AnyWindowSystem::Niri(w) => w,
            AnyWindowSystem::Plasmashell(w) => w,
        }
    }
}

impl WindowSystem for AnyWindowSystem {
    fn window_system_name(&self) -> &'static str {
        self.inner().window_system_name()
    }

    fn session_type(&self) -> SessionType {
        self.inner().session_type()
    }

    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
        self.inner().focused_window()
    }

    fn bar_height(&self) -> Result<i32, WindowSystemError> {
        self.inner().bar_height()
    }
}

/// A window system frozen at one instant.
///
/// Reads the focused window and bar height once and answers every later
/// query from that read, so discovery, the overlay and the dispatcher of
/// one invocation all see the same window.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    name: &'static str,
    session: SessionType,
    window: FocusedWindow,
    bar_height: i32,
}

impl WindowSnapshot {
    pub fn take(window_system: &dyn WindowSystem) -> Result<Self, WindowSystemError> {
        let window = window_system.focused_window()?;
        let bar_height = window_system.bar_height()?;
        debug!(
            "focused window {:?} (pid {}) at {} on {:?}",
            window.application, window.pid, window.extents, window.monitor
        );
        Ok(Self {
            name: window_system.window_system_name(),
            session: window_system.session_type(),
            window,
            bar_height,
        })
    }

    pub fn window(&self) -> &FocusedWindow {
        &self.window
    }
}

impl WindowSystem for WindowSnapshot {
    fn window_system_name(&self) -> &'static str {
        self.name
    }

    fn session_type(&self) -> SessionType {
        self.session
    }

    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
        Ok(self.window.clone())
    }

    fn bar_height(&self) -> Result<i32, WindowSystemError> {
        Ok(self.bar_height)
    }
}

/// Build the configured request timeout; `0` disables it.
pub fn query_timeout(config: &Config) -> Option<Duration> {
    match config.query_timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

/// Detect and construct the window system for this session.
pub fn connect(config: &Config) -> Result<AnyWindowSystem, WindowSystemError> {
    let (session, kind) = detect(&config.window_system)?;
    let timeout = query_timeout(config);
    Ok(match kind {
        WindowSystemKind::X11 => {
            AnyWindowSystem::X11(x11::X11::new(CommandPort::new("xdotool", timeout), session))
        }
        WindowSystemKind::Sway => AnyWindowSystem::Sway(sway::Sway::new(
            CommandPort::new("swaymsg", timeout),
            config.sway.clone(),
        )),
        WindowSystemKind::Hyprland => {
            AnyWindowSystem::Hyprland(hyprland::Hyprland::new(HyprlandSocket::new(timeout)))
        }
        WindowSystemKind::Niri => AnyWindowSystem::Niri(niri::Niri::new(
            CommandPort::new("niri", timeout),
            config.niri.clone(),
        )),
        WindowSystemKind::Plasmashell => AnyWindowSystem::Plasmashell(plasma::Plasmashell::new(
            plasma::KwinDbus::new(CommandPort::new("journalctl", timeout)),
        )),
    })
}
