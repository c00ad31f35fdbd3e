//! Sway provider backed by `swaymsg -r`.
//!
//! The focused node's rect does not include the offset of the top bar, so
//! the bar height is derived from the focused output and workspace rects
//! (or taken from `sway.bar_height` in the config) and subtracted here.
//! The dispatcher adds it back.

use super::{parse_json, IpcPort, WindowSystemError};
use crate::traits::WindowSystem;
use crate::types::{Extents, FocusedWindow, SessionType};
use serde::{Deserialize, Serialize};

const TREE: [&str; 3] = ["-r", "-t", "get_tree"];
const WORKSPACES: [&str; 3] = ["-r", "-t", "get_workspaces"];
const OUTPUTS: [&str; 3] = ["-r", "-t", "get_outputs"];

/// Sway-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwayConfig {
    /// Fixed bar height in pixels.  `None` derives it from the focused
    /// output and workspace.
    pub bar_height: Option<i32>,
}

//  Minimal serde structs for the JSON we care about

#[derive(Debug, Clone, Copy, Deserialize)]
struct Rect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

#[derive(Debug, Deserialize)]
struct WindowProperties {
    class: Option<String>,
}

/// A node of `get_tree`.
#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    focused: bool,
    rect: Rect,
    pid: Option<u32>,
    app_id: Option<String>,
    window_properties: Option<WindowProperties>,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    floating_nodes: Vec<Node>,
}

impl Node {
    /// Depth-first search over tiled then floating children.
    fn find_focused(&self) -> Option<&Node> {
        if self.focused {
            return Some(self);
        }
        self.nodes
            .iter()
            .chain(self.floating_nodes.iter())
            .find_map(Node::find_focused)
    }

    fn application(&self) -> String {
        self.app_id
            .clone()
            .or_else(|| {
                self.window_properties
                    .as_ref()
                    .and_then(|p| p.class.clone())
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Workspace {
    focused: bool,
    rect: Rect,
    output: String,
}

#[derive(Debug, Deserialize)]
struct Output {
    #[serde(default)]
    focused: bool,
    rect: Rect,
}

pub struct Sway<P> {
    port: P,
    config: SwayConfig,
}

impl<P: IpcPort> Sway<P> {
    pub fn new(port: P, config: SwayConfig) -> Self {
        Self { port, config }
    }

    fn query<T: serde::de::DeserializeOwned>(&self, args: &[&str]) -> Result<T, WindowSystemError> {
        let response = self.port.request(args)?;
        parse_json(&format!("swaymsg {}", args.join(" ")), &response)
    }

    fn focused_workspace(&self) -> Result<Workspace, WindowSystemError> {
        let workspaces: Vec<Workspace> = self.query(&WORKSPACES)?;
        workspaces
            .into_iter()
            .find(|w| w.focused)
            .ok_or_else(|| WindowSystemError::malformed("swaymsg get_workspaces", "no focused workspace"))
    }

    fn focused_output(&self) -> Result<Output, WindowSystemError> {
        let outputs: Vec<Output> = self.query(&OUTPUTS)?;
        outputs
            .into_iter()
            .find(|o| o.focused)
            .ok_or_else(|| WindowSystemError::malformed("swaymsg get_outputs", "no focused output"))
    }
}

impl<P: IpcPort> WindowSystem for Sway<P> {
    fn window_system_name(&self) -> &'static str {
        "sway"
    }

    fn session_type(&self) -> SessionType {
        SessionType::Wayland
    }

    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
        let tree: Node = self.query(&TREE)?;
        let node = tree.find_focused().ok_or(WindowSystemError::NoFocusedWindow)?;
        let pid = node.pid.ok_or_else(|| {
            WindowSystemError::malformed("swaymsg get_tree", "focused node has no pid")
        })?;
        let monitor = self.focused_workspace()?.output;
        let bar_height = self.bar_height()?;

        Ok(FocusedWindow {
            extents: Extents::new(
                node.rect.x,
                node.rect.y - bar_height,
                node.rect.width,
                node.rect.height,
            ),
            pid,
            monitor,
            application: node.application(),
        })
    }

    fn bar_height(&self) -> Result<i32, WindowSystemError> {
        if let Some(height) = self.config.bar_height {
            return Ok(height);
        }
        let output = self.focused_output()?;
        let workspace = self.focused_workspace()?;
        Ok(output.rect.height - workspace.rect.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window_system::port::FixturePort;

    const TREE_JSON: &str = r#"{
        "type": "root", "focused": false,
        "rect": {"x": 0, "y": 0, "width": 1920, "height": 1080},
        "nodes": [{
            "type": "output", "focused": false,
            "rect": {"x": 0, "y": 0, "width": 1920, "height": 1080},
            "nodes": [{
                "type": "workspace", "focused": false,
                "rect": {"x": 0, "y": 30, "width": 1920, "height": 1050},
                "nodes": [
                    {"type": "con", "focused": false, "pid": 10, "app_id": "foot",
                     "rect": {"x": 0, "y": 30, "width": 960, "height": 1050}, "nodes": []}
                ],
                "floating_nodes": [
                    {"type": "floating_con", "focused": true, "pid": 77, "app_id": null,
                     "window_properties": {"class": "Gimp"},
                     "rect": {"x": 200, "y": 130, "width": 640, "height": 480}, "nodes": []}
                ]
            }]
        }]
    }"#;

    const WORKSPACES_JSON: &str = r#"[
        {"name": "1", "focused": false, "output": "HDMI-A-1",
         "rect": {"x": 1920, "y": 30, "width": 1920, "height": 1050}},
        {"name": "2", "focused": true, "output": "DP-1",
         "rect": {"x": 0, "y": 30, "width": 1920, "height": 1050}}
    ]"#;

    const OUTPUTS_JSON: &str = r#"[
        {"name": "DP-1", "focused": true, "rect": {"x": 0, "y": 0, "width": 1920, "height": 1080}},
        {"name": "HDMI-A-1", "focused": false, "rect": {"x": 1920, "y": 0, "width": 1920, "height": 1080}}
    ]"#;

    fn port() -> FixturePort {
        FixturePort::new()
            .with("-r -t get_tree", TREE_JSON)
            .with("-r -t get_workspaces", WORKSPACES_JSON)
            .with("-r -t get_outputs", OUTPUTS_JSON)
    }

    #[test]
    fn bar_height_from_output_and_workspace() {
        let ws = Sway::new(port(), SwayConfig::default());
        assert_eq!(ws.bar_height().unwrap(), 30);
    }

    #[test]
    fn focused_floating_node_found_and_shifted_by_bar() {
        let ws = Sway::new(port(), SwayConfig::default());
        let w = ws.focused_window().unwrap();
        assert_eq!(w.extents, Extents::new(200, 100, 640, 480));
        assert_eq!(w.pid, 77);
        assert_eq!(w.monitor, "DP-1");
        assert_eq!(w.application, "Gimp");
    }

    #[test]
    fn configured_bar_height_overrides_derivation() {
        let ws = Sway::new(port(), SwayConfig { bar_height: Some(0) });
        assert_eq!(ws.bar_height().unwrap(), 0);
        assert_eq!(ws.focused_window().unwrap().extents.y, 130);
    }

    #[test]
    fn no_focused_node() {
        let tree = r#"{"focused": false, "rect": {"x":0,"y":0,"width":1,"height":1}, "nodes": []}"#;
        let ws = Sway::new(
            FixturePort::new().with("-r -t get_tree", tree),
            SwayConfig::default(),
        );
        assert!(matches!(
            ws.focused_window(),
            Err(WindowSystemError::NoFocusedWindow)
        ));
    }

    #[test]
    fn malformed_tree_is_a_parse_error() {
        let ws = Sway::new(
            FixturePort::new().with("-r -t get_tree", "not json"),
            SwayConfig::default(),
        );
        assert!(matches!(
            ws.focused_window(),
            Err(WindowSystemError::Parse { .. })
        ));
    }
}
