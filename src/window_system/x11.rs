//! X11 provider backed by `xdotool`.

use super::{IpcPort, WindowSystemError};
use crate::traits::WindowSystem;
use crate::types::{Extents, FocusedWindow, SessionType};
use std::collections::HashMap;

const GEOMETRY: [&str; 3] = ["getactivewindow", "getwindowgeometry", "--shell"];
const PID: [&str; 2] = ["getactivewindow", "getwindowpid"];
const CLASS: [&str; 2] = ["getactivewindow", "getwindowclassname"];

pub struct X11<P> {
    port: P,
    session: SessionType,
}

impl<P: IpcPort> X11<P> {
    pub fn new(port: P, session: SessionType) -> Self {
        Self { port, session }
    }
}

/// Parse `xdotool --shell` output (`KEY=value` per line).
fn parse_shell(output: &str) -> HashMap<&str, &str> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect()
}

fn field<T: std::str::FromStr>(
    fields: &HashMap<&str, &str>,
    key: &str,
) -> Result<T, WindowSystemError> {
    let request = GEOMETRY.join(" ");
    fields
        .get(key)
        .ok_or_else(|| WindowSystemError::malformed(&request, format!("missing {}", key)))?
        .parse()
        .map_err(|_| WindowSystemError::malformed(&request, format!("bad {}", key)))
}

impl<P: IpcPort> WindowSystem for X11<P> {
    fn window_system_name(&self) -> &'static str {
        "x11"
    }

    fn session_type(&self) -> SessionType {
        self.session
    }

    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
        let geometry = self.port.request(&GEOMETRY)?;
        let fields = parse_shell(&geometry);
        let extents = Extents::new(
            field(&fields, "X")?,
            field(&fields, "Y")?,
            field(&fields, "WIDTH")?,
            field(&fields, "HEIGHT")?,
        );
        let monitor = fields.get("SCREEN").copied().unwrap_or("0").to_string();

        let pid_text = self.port.request(&PID)?;
        let pid = pid_text
            .trim()
            .parse()
            .map_err(|_| WindowSystemError::malformed(&PID.join(" "), pid_text.trim()))?;

        let application = self.port.request(&CLASS)?.trim().to_string();

        Ok(FocusedWindow {
            extents,
            pid,
            monitor,
            application,
        })
    }
}
