//! Mouse actions produced by the overlay and consumed by the dispatcher.
//!
//! A [`MouseAction`] is transient: it exists between the moment the user
//! finishes typing a hint and the moment the
//! [`dispatch`](crate::dispatch::dispatch) call has injected it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do at the chosen point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Press and release, `repeat` times.
    #[default]
    Click,
    /// Move the pointer only.
    Hover,
    /// Press without releasing, then hand over to the grab interceptor.
    Grab,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Click => write!(f, "click"),
            ActionKind::Hover => write!(f, "hover"),
            ActionKind::Grab => write!(f, "grab"),
        }
    }
}

/// Mouse button.  The values match the Linux input event codes so the
/// mouse service can write them straight to uinput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
}

impl MouseButton {
    /// `BTN_LEFT` / `BTN_RIGHT` from `linux/input-event-codes.h`.
    pub fn code(self) -> u16 {
        match self {
            MouseButton::Left => 0x110,
            MouseButton::Right => 0x111,
        }
    }
}

/// Button transition written to the input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonState {
    Down,
    Up,
}

impl ButtonState {
    pub fn value(self) -> i32 {
        match self {
            ButtonState::Down => 1,
            ButtonState::Up => 0,
        }
    }
}

/// A fully resolved user choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouseAction {
    pub action: ActionKind,
    pub x: f64,
    pub y: f64,
    pub button: MouseButton,
    pub repeat: u32,
}

impl MouseAction {
    /// A single left click at `(x, y)`.
    pub fn click(x: f64, y: f64) -> Self {
        Self {
            action: ActionKind::Click,
            x,
            y,
            button: MouseButton::Left,
            repeat: 1,
        }
    }

    /// Button transitions the dispatcher must issue for this action.
    pub fn button_states(&self) -> &'static [ButtonState] {
        match self.action {
            ActionKind::Click => &[ButtonState::Down, ButtonState::Up],
            ActionKind::Hover => &[],
            ActionKind::Grab => &[ButtonState::Down],
        }
    }
}
