//! Niri provider backed by `niri msg --json`.
//!
//! Niri does not report a screen position for tiled windows.  When
//! `tile_pos_in_workspace_view` is absent the position is derived from the
//! output's logical size and the layout gaps and struts, which must match
//! the user's niri configuration (see [`NiriConfig`]).

use super::{parse_json, IpcPort, WindowSystemError};
use crate::traits::WindowSystem;
use crate::types::{Extents, FocusedWindow, SessionType};
use serde::{Deserialize, Serialize};

const FOCUSED_WINDOW: [&str; 3] = ["msg", "--json", "focused-window"];
const FOCUSED_OUTPUT: [&str; 3] = ["msg", "--json", "focused-output"];

/// Layout values mirrored from the niri configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NiriConfig {
    /// `layout.gaps` in logical pixels.
    pub gaps: f64,
    /// `layout.struts.left`.
    pub strut_left: f64,
    /// `layout.struts.top`.
    pub strut_top: f64,
    /// Whether a lone tiled column is anchored to the left edge of the
    /// output rather than to the right.
    pub anchor_left: bool,
}

impl Default for NiriConfig {
    fn default() -> Self {
        Self {
            gaps: 16.0,
            strut_left: 25.0,
            strut_top: 0.0,
            anchor_left: false,
        }
    }
}

//  Minimal serde structs for the JSON we care about

#[derive(Debug, Deserialize)]
struct Layout {
    tile_size: (f64, f64),
    window_size: (i32, i32),
    tile_pos_in_workspace_view: Option<(f64, f64)>,
    window_offset_in_tile: (f64, f64),
}

#[derive(Debug, Deserialize)]
struct WindowJson {
    pid: Option<u32>,
    app_id: Option<String>,
    layout: Layout,
}

#[derive(Debug, Deserialize)]
struct Logical {
    x: f64,
    y: f64,
    width: f64,
}

#[derive(Debug, Deserialize)]
struct OutputJson {
    name: String,
    logical: Logical,
}

/// Compute the screen extents of the focused window.
fn window_extents(layout: &Layout, output: &Logical, config: &NiriConfig) -> Extents {
    let (x, y) = match layout.tile_pos_in_workspace_view {
        Some(pos) => pos,
        None => {
            let x_gap = config.gaps + config.strut_left;
            let x = if config.anchor_left {
                x_gap
            } else {
                output.width - x_gap - layout.tile_size.0
            };
            (x, config.gaps + config.strut_top)
        }
    };
    let x = x + output.x + layout.window_offset_in_tile.0;
    let y = y + output.y + layout.window_offset_in_tile.1;
    Extents::new(
        x.round() as i32,
        y.round() as i32,
        layout.window_size.0,
        layout.window_size.1,
    )
}

pub struct Niri<P> {
    port: P,
    config: NiriConfig,
}

impl<P: IpcPort> Niri<P> {
    pub fn new(port: P, config: NiriConfig) -> Self {
        Self { port, config }
    }
}

impl<P: IpcPort> WindowSystem for Niri<P> {
    fn window_system_name(&self) -> &'static str {
        "niri"
    }

    fn session_type(&self) -> SessionType {
        SessionType::Wayland
    }

    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
        let response = self.port.request(&FOCUSED_WINDOW)?;
        let window: Option<WindowJson> = parse_json("niri msg focused-window", &response)?;
        let window = window.ok_or(WindowSystemError::NoFocusedWindow)?;

        let response = self.port.request(&FOCUSED_OUTPUT)?;
        let output: OutputJson = parse_json("niri msg focused-output", &response)?;

        let pid = window.pid.ok_or_else(|| {
            WindowSystemError::malformed("niri msg focused-window", "window has no pid")
        })?;

        Ok(FocusedWindow {
            extents: window_extents(&window.layout, &output.logical, &self.config),
            pid,
            monitor: output.name,
            application: window.app_id.unwrap_or_default(),
        })
    }
}
