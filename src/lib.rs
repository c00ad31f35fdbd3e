//! **hints**: click, hover and drag GUI elements from the keyboard.
//!
//! One invocation finds the actionable elements of the focused window,
//! labels each with a short hint, draws the labels over the window and
//! injects pointer input at the element whose label the user typed.
//!
//! # Architecture
//!
//! The crate is organised around the traits in [`traits`]:
//!
//! * [`traits::WindowSystem`]: where the focused window is.  Concrete
//!   providers for X11, Sway, Hyprland, Niri and Plasma live in
//!   [`window_system`].
//! * [`traits::ElementBackend`]: what can be clicked inside it.  The
//!   AT-SPI and computer-vision strategies live in [`backends`].
//! * [`traits::Presenter`]: the blocking overlay ([`overlay`]).
//! * [`traits::InputInjector`]: synthetic pointer input ([`mouse`]).
//!
//! [`session::Session`] ties them together; [`hints::allocate`] and
//! [`dispatch::dispatch`] are the pure steps in between.

pub mod action;
pub mod backends;
pub mod config;
pub mod dispatch;
pub mod hints;
pub mod mouse;
pub mod navigation;
pub mod overlay;
pub mod selector;
pub mod session;
pub mod traits;
pub mod types;
pub mod window_system;

#[cfg(test)]
pub(crate) mod testing;
