//! [`WindowSystem`] implementation backed by Hyprland IPC.
//!
//! Talks to Hyprland through its command socket (see
//! [`HyprlandSocket`](super::HyprlandSocket)) with the `j/` JSON queries.

use super::{parse_json, IpcPort, WindowSystemError};
use crate::traits::WindowSystem;
use crate::types::{Extents, FocusedWindow, SessionType};
use serde::Deserialize;

/// Hyprland-backed window system.
pub struct Hyprland<P> {
    port: P,
}

impl<P: IpcPort> Hyprland<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Send a JSON data query (`j/<command>`) and return the raw JSON string.
    fn ipc_json(&self, data_command: &str) -> Result<String, WindowSystemError> {
        self.port.request(&[&format!("j/{}", data_command)])
    }

    /// Resolve a Hyprland monitor numeric id to its name.
    fn monitor_name_by_id(&self, id: i64) -> Result<String, WindowSystemError> {
        let json = self.ipc_json("monitors")?;
        let monitors: Vec<MonitorJson> = parse_json("j/monitors", &json)?;
        monitors
            .into_iter()
            .find(|m| m.id == id)
            .map(|m| m.name)
            .ok_or_else(|| WindowSystemError::malformed("j/monitors", format!("unknown monitor id: {}", id)))
    }
}

//  Minimal serde structs for the JSON we care about

/// Subset of the JSON object returned by `j/monitors`.
#[derive(Deserialize)]
struct MonitorJson {
    id: i64,
    name: String,
}

/// Subset of the JSON object returned by `j/activewindow`.
#[derive(Deserialize)]
struct ActiveWindowJson {
    at: (i32, i32),
    size: (i32, i32),
    pid: u32,
    monitor: i64,
    #[serde(default)]
    class: String,
}

impl<P: IpcPort> WindowSystem for Hyprland<P> {
    fn window_system_name(&self) -> &'static str {
        "hyprland"
    }

    fn session_type(&self) -> SessionType {
        SessionType::Wayland
    }

    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
        let json = self.ipc_json("activewindow")?;
        // Hyprland returns an empty object `{}` when no window is focused.
        if json.trim() == "{}" {
            return Err(WindowSystemError::NoFocusedWindow);
        }
        let w: ActiveWindowJson = parse_json("j/activewindow", &json)?;
        let monitor = self.monitor_name_by_id(w.monitor)?;
        Ok(FocusedWindow {
            extents: Extents::new(w.at.0, w.at.1, w.size.0, w.size.1),
            pid: w.pid,
            monitor,
            application: w.class,
        })
    }
}
