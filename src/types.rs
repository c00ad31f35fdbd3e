//! Geometry and element types shared by every component.
//!
//! [`Extents`] and [`WindowGeometry`] describe the focused window,
//! [`ActionableElement`] describes one clickable target inside it.  All of
//! them are plain values: produced once per invocation and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An on-screen rectangle in absolute pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extents {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Extents {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `true` when the rectangle has a positive area.
    ///
    /// A zero-sized window cannot host an overlay, so the orchestrator
    /// treats it the same as "no extents".
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for Extents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Display server family, read from `XDG_SESSION_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    X11,
    Wayland,
}

/// Everything a window system reports about the focused window in one
/// query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedWindow {
    pub extents: Extents,
    pub pid: u32,
    /// Output / screen the window lives on (`"DP-1"`, `"0"`, …).
    pub monitor: String,
    /// Application identifier used to look up per-application rules
    /// (`app_id` on Wayland, WM class on X11).
    pub application: String,
}

/// Geometry of the focused window for one hint-mode invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub monitor: String,
    pub process_id: u32,
}

impl WindowGeometry {
    pub fn from_focused(window: &FocusedWindow) -> Self {
        Self {
            x: window.extents.x,
            y: window.extents.y,
            width: window.extents.width,
            height: window.extents.height,
            monitor: window.monitor.clone(),
            process_id: window.pid,
        }
    }

    /// A 1×1 region at `(x, y)`, used by the scroll and grab interceptors.
    pub fn point(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            width: 1,
            height: 1,
            monitor: String::new(),
            process_id: 0,
        }
    }

    pub fn extents(&self) -> Extents {
        Extents::new(self.x, self.y, self.width, self.height)
    }

    /// Shift the origin by the configured overlay offsets.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }
}

/// One clickable / focusable target inside the focused window.
///
/// Both positions refer to the same point (the centre of the element's
/// bounding box): once in screen coordinates and once relative to the
/// window origin.  The overlay draws with the relative one, the dispatcher
/// injects at the absolute one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionableElement {
    pub absolute_position: (f64, f64),
    pub relative_position: (f64, f64),
    pub width: f64,
    pub height: f64,
}

impl ActionableElement {
    /// Build an element from a bounding box given in window-relative
    /// coordinates and the window origin.
    pub fn from_relative_box(
        origin: (f64, f64),
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        let rel = (x + width / 2.0, y + height / 2.0);
        Self {
            absolute_position: (rel.0 + origin.0, rel.1 + origin.1),
            relative_position: rel,
            width,
            height,
        }
    }

    /// Build an element from a bounding box given in screen coordinates and
    /// the window origin.
    pub fn from_absolute_box(
        origin: (f64, f64),
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self::from_relative_box(origin, x - origin.0, y - origin.1, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extents_validity() {
        assert!(Extents::new(0, 0, 10, 10).is_valid());
        assert!(!Extents::new(0, 0, 0, 10).is_valid());
        assert!(!Extents::new(5, 5, 10, -1).is_valid());
    }

    #[test]
    fn extents_display() {
        assert_eq!(Extents::new(10, 20, 800, 600).to_string(), "800x600+10+20");
    }

    #[test]
    fn element_from_relative_box_uses_centre() {
        let e = ActionableElement::from_relative_box((100.0, 50.0), 10.0, 20.0, 30.0, 40.0);
        assert_eq!(e.relative_position, (25.0, 40.0));
        assert_eq!(e.absolute_position, (125.0, 90.0));
        assert_eq!((e.width, e.height), (30.0, 40.0));
    }

    #[test]
    fn element_from_absolute_box_matches_relative() {
        let a = ActionableElement::from_absolute_box((100.0, 50.0), 110.0, 70.0, 30.0, 40.0);
        let b = ActionableElement::from_relative_box((100.0, 50.0), 10.0, 20.0, 30.0, 40.0);
        assert_eq!(a, b);
    }

    #[test]
    fn geometry_offset_keeps_size() {
        let g = WindowGeometry {
            x: 10,
            y: 20,
            width: 300,
            height: 200,
            monitor: "DP-1".into(),
            process_id: 42,
        };
        let o = g.offset(5, -5);
        assert_eq!((o.x, o.y, o.width, o.height), (15, 15, 300, 200));
        assert_eq!(o.monitor, "DP-1");
        assert_eq!(o.process_id, 42);
    }

    #[test]
    fn session_type_serde() {
        let s: SessionType = serde_json::from_str("\"wayland\"").unwrap();
        assert_eq!(s, SessionType::Wayland);
    }
}
