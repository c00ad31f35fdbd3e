//! Core traits that decouple hints from any specific desktop, discovery
//! strategy, overlay toolkit or input transport.
//!
//! Every concrete implementation (Sway over `swaymsg`, AT-SPI over D-Bus,
//! the GTK overlay, the `hints-mouse` socket client, a test harness, …)
//! implements one of these traits.  The
//! [`Session`](crate::session::Session) only depends on these abstractions.

use crate::action::{ButtonState, MouseAction, MouseButton};
use crate::backends::BackendError;
use crate::hints::HintMap;
use crate::mouse::InjectError;
use crate::overlay::PresentError;
use crate::types::{ActionableElement, Extents, FocusedWindow, SessionType, WindowGeometry};
use crate::window_system::WindowSystemError;

/// Abstraction over the desktop environment that owns the focused window.
///
/// Providers answer every query fresh; a session freezes one answer in a
/// [`WindowSnapshot`](crate::window_system::WindowSnapshot).  Only [`focused_window`](WindowSystem::focused_window) must be
/// implemented, the narrower getters are views onto it.
pub trait WindowSystem {
    /// Stable identifier: `x11`, `sway`, `hyprland`, `niri`, `plasmashell`.
    fn window_system_name(&self) -> &'static str;

    fn session_type(&self) -> SessionType;

    /// Snapshot of the focused window.
    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError>;

    fn focused_window_extents(&self) -> Result<Extents, WindowSystemError> {
        Ok(self.focused_window()?.extents)
    }

    fn focused_window_pid(&self) -> Result<u32, WindowSystemError> {
        Ok(self.focused_window()?.pid)
    }

    fn focused_window_monitor(&self) -> Result<String, WindowSystemError> {
        Ok(self.focused_window()?.monitor)
    }

    /// Name used to look up per-application rules.
    fn focused_application_name(&self) -> Result<String, WindowSystemError> {
        Ok(self.focused_window()?.application)
    }

    /// Height of shell chrome the provider subtracted from the window's
    /// `y` coordinate.  The dispatcher adds it back before injecting.
    fn bar_height(&self) -> Result<i32, WindowSystemError> {
        Ok(0)
    }
}

/// A strategy for discovering the actionable elements of the focused
/// window.
pub trait ElementBackend {
    /// Identifier used in `backends.enable` and in log lines.
    fn name(&self) -> &'static str;

    /// Discover the elements of the focused window in canonical order.
    ///
    /// [`BackendError::NoChildren`] is the expected "nothing here" outcome
    /// and makes the session fall through to the next backend.  Every
    /// other error aborts the invocation.
    fn get_children(
        &mut self,
        window_system: &dyn WindowSystem,
    ) -> Result<Vec<ActionableElement>, BackendError>;
}

//  Presentation

/// What the presentation collaborator should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// Draw the hint labels and wait for a selection.
    Hints,
    /// Invisible key interceptor that turns navigation keys into scroll
    /// events.
    Scroll,
    /// Invisible key interceptor that moves the pointer while a button is
    /// held down; releases the button on exit.
    Grab,
}

/// One presentation request.
#[derive(Debug, Clone, Copy)]
pub struct PresentRequest<'a> {
    /// Region the overlay covers, already shifted by the configured
    /// overlay offsets.
    pub geometry: &'a WindowGeometry,
    pub hints: &'a HintMap,
    pub mode: OverlayMode,
}

/// A blocking overlay: shows the request, waits for the user, returns the
/// selection.
///
/// # Contract
///
/// * `present` returns only after every overlay surface it created is
///   gone, so input injected afterwards reaches the application.
/// * `Ok(None)` means the user cancelled (or the interceptor finished
///   without producing an action).
pub trait Presenter {
    fn present(&mut self, request: PresentRequest<'_>) -> Result<Option<MouseAction>, PresentError>;
}

//  Input injection

/// Synthetic pointer input.
pub trait InputInjector {
    /// Move to the absolute position `(x, y)`, then issue `states` for
    /// `button` `repeat` times.  An empty `states` slice only moves.
    fn click(
        &mut self,
        x: f64,
        y: f64,
        button: MouseButton,
        states: &[ButtonState],
        repeat: u32,
    ) -> Result<(), InjectError>;

    /// Move relative to the current pointer position.
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError>;

    /// Scroll by `(dx, dy)` wheel steps.  Positive `dy` scrolls up.
    fn scroll(&mut self, dx: i32, dy: i32) -> Result<(), InjectError>;

    /// Release a held button at the current pointer position.
    fn release(&mut self, button: MouseButton) -> Result<(), InjectError>;
}
