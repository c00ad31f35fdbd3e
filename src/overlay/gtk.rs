//! GTK4 overlay that runs on the **main thread**.
//!
//! Each [`present`](Presenter::present) call builds a window, runs a GLib
//! main loop until the user is done, destroys the window and drains the
//! main context before returning.  Nothing of the overlay is left on
//! screen once the dispatcher starts injecting.
//!
//! # Surfaces
//!
//! * Hints: a transparent surface covering the monitor of the focused
//!   window (a layer-shell overlay on Wayland, a fullscreen window on X11).
//!   Labels are placed in a [`gtk4::Fixed`] at the element centres.
//! * Scroll / grab: an invisible 1×1 surface that only grabs the keyboard.
//!
//! # CSS selectors
//!
//! | Selector        | Targets                                   |
//! |-----------------|-------------------------------------------|
//! | `window.hints`  | The overlay window (keep transparent)     |
//! | `.hint`         | Every label                               |

use super::{label_markup, output_relative, OverlayConfig, PresentError};
use crate::action::{MouseAction, MouseButton};
use crate::navigation::{NavigationConfig, NavigationMode, Navigator};
use crate::selector::{HintSelector, Key, KeyInput, KeysConfig, Modifiers, Selection};
use crate::traits::{InputInjector, OverlayMode, PresentRequest, Presenter};
use crate::types::{SessionType, WindowGeometry};
use gtk4::prelude::*;
use gtk4::{gdk, glib};
use gtk4_layer_shell::LayerShell;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

//  Default CSS

const DEFAULT_CSS: &str = r#"
window.hints,
window.hints.background {
    background-color: transparent;
    background: none;
}

.hint {
    font-family: sans-serif;
    font-size: 13px;
    font-weight: bold;
    color: #1d1d1d;
    background-color: rgba(255, 224, 102, 0.9);
    border: 1px solid rgba(0, 0, 0, 0.4);
    border-radius: 3px;
    padding: 0 3px;
}
"#;

/// [`Presenter`] drawing with GTK4.
///
/// The scroll and grab interceptors inject through their own handle on
/// the injector; the hint overlay itself never injects.
pub struct GtkPresenter<I: InputInjector> {
    injector: Rc<RefCell<I>>,
    session: SessionType,
    keys: KeysConfig,
    navigation: NavigationConfig,
    config: OverlayConfig,
    css_loaded: bool,
}

impl<I: InputInjector + 'static> GtkPresenter<I> {
    pub fn new(
        injector: I,
        session: SessionType,
        keys: KeysConfig,
        navigation: NavigationConfig,
        config: OverlayConfig,
    ) -> Self {
        Self {
            injector: Rc::new(RefCell::new(injector)),
            session,
            keys,
            navigation,
            config,
            css_loaded: false,
        }
    }

    fn init(&mut self) -> Result<(), PresentError> {
        gtk4::init().map_err(|e| PresentError::Init(e.to_string()))?;
        if !self.css_loaded {
            load_css(&self.config);
            self.css_loaded = true;
        }
        Ok(())
    }

    fn new_window(&self) -> gtk4::Window {
        let window = gtk4::Window::new();
        window.set_decorated(false);
        window.add_css_class("hints");
        if self.uses_layer_shell() {
            window.init_layer_shell();
            window.set_layer(gtk4_layer_shell::Layer::Overlay);
            window.set_namespace("hints");
            window.set_keyboard_mode(gtk4_layer_shell::KeyboardMode::Exclusive);
        }
        window
    }

    fn uses_layer_shell(&self) -> bool {
        self.session == SessionType::Wayland && gtk4_layer_shell::is_supported()
    }
}

impl<I: InputInjector + 'static> Presenter for GtkPresenter<I> {
    fn present(&mut self, request: PresentRequest<'_>) -> Result<Option<MouseAction>, PresentError> {
        self.init()?;
        let window = self.new_window();
        let main_loop = glib::MainLoop::new(None, false);
        let outcome: Rc<RefCell<Outcome>> = Rc::default();

        match request.mode {
            OverlayMode::Hints => self.build_hints(&window, &request, &main_loop, &outcome)?,
            OverlayMode::Scroll => {
                self.build_interceptor(&window, request.geometry, NavigationMode::Scroll, &main_loop, &outcome)
            }
            OverlayMode::Grab => {
                self.build_interceptor(&window, request.geometry, NavigationMode::Move, &main_loop, &outcome)
            }
        }

        {
            let main_loop = main_loop.clone();
            window.connect_close_request(move |_| {
                main_loop.quit();
                glib::Propagation::Proceed
            });
        }

        window.present();
        debug!("{:?} overlay shown", request.mode);
        main_loop.run();

        window.destroy();
        let context = glib::MainContext::default();
        while context.iteration(false) {}
        debug!("{:?} overlay closed", request.mode);

        let outcome = outcome.take();
        match outcome {
            Outcome::Open | Outcome::Cancelled => Ok(None),
            Outcome::Selected(action) => Ok(Some(action)),
            Outcome::Failed(e) => Err(e),
        }
    }
}

//  Loop outcome

#[derive(Default)]
enum Outcome {
    #[default]
    Open,
    Cancelled,
    Selected(MouseAction),
    Failed(PresentError),
}

//  Hint overlay

impl<I: InputInjector + 'static> GtkPresenter<I> {
    fn build_hints(
        &self,
        window: &gtk4::Window,
        request: &PresentRequest<'_>,
        main_loop: &glib::MainLoop,
        outcome: &Rc<RefCell<Outcome>>,
    ) -> Result<(), PresentError> {
        let geometry = request.geometry;
        let display = gdk::Display::default()
            .ok_or_else(|| PresentError::Init("no display".into()))?;
        let monitor = monitor_at(&display, geometry.x, geometry.y)
            .ok_or_else(|| PresentError::Init(format!("no monitor at ({}, {})", geometry.x, geometry.y)))?;
        let area = monitor.geometry();

        if self.uses_layer_shell() {
            window.set_monitor(&monitor);
            for edge in [
                gtk4_layer_shell::Edge::Left,
                gtk4_layer_shell::Edge::Right,
                gtk4_layer_shell::Edge::Top,
                gtk4_layer_shell::Edge::Bottom,
            ] {
                window.set_anchor(edge, true);
            }
            window.set_exclusive_zone(-1);
        } else {
            window.fullscreen_on_monitor(&monitor);
        }
        window.set_cursor_from_name(Some("none"));

        let (ox, oy) = output_relative(geometry.x, geometry.y, (area.x(), area.y()));
        let origin = (ox as f64, oy as f64);
        let fixed = gtk4::Fixed::new();
        let mut labels = Vec::with_capacity(request.hints.len());
        for (text, element) in request.hints.iter() {
            let (rx, ry) = element.relative_position;
            if rx < 0.0 || ry < 0.0 {
                continue;
            }
            let label = gtk4::Label::new(None);
            label.add_css_class("hint");
            label.set_markup(&label_markup(text, "", self.config.uppercase));
            let (_, width, _, _) = label.measure(gtk4::Orientation::Horizontal, -1);
            let (_, height, _, _) = label.measure(gtk4::Orientation::Vertical, -1);
            fixed.put(
                &label,
                origin.0 + rx - width as f64 / 2.0,
                origin.1 + ry - height as f64 / 2.0,
            );
            labels.push((text.to_string(), label));
        }
        window.set_child(Some(&fixed));
        info!(
            "{} hints on {}x{}+{}+{}",
            labels.len(),
            area.width(),
            area.height(),
            area.x(),
            area.y()
        );

        let selector = RefCell::new(HintSelector::new(request.hints.clone(), self.keys.clone()));
        let exit_key = self.keys.exit.clone();
        let uppercase = self.config.uppercase;
        let main_loop = main_loop.clone();
        let outcome = outcome.clone();

        let controller = gtk4::EventControllerKey::new();
        controller.connect_key_pressed(move |_, keyval, _, state| {
            let input = key_input(keyval, state, &exit_key);
            let mut selector = selector.borrow_mut();
            match selector.handle(input) {
                Selection::Pending => {
                    let typed = selector.typed();
                    for (text, label) in &labels {
                        let visible = text.starts_with(typed);
                        label.set_visible(visible);
                        if visible {
                            label.set_markup(&label_markup(text, typed, uppercase));
                        }
                    }
                }
                Selection::Cancelled => {
                    *outcome.borrow_mut() = Outcome::Cancelled;
                    main_loop.quit();
                }
                Selection::Selected(action) => {
                    debug!("selected {:?}", action);
                    *outcome.borrow_mut() = Outcome::Selected(action);
                    main_loop.quit();
                }
            }
            glib::Propagation::Stop
        });
        window.add_controller(controller);
        Ok(())
    }
}

//  Scroll / grab interceptor

impl<I: InputInjector + 'static> GtkPresenter<I> {
    fn build_interceptor(
        &self,
        window: &gtk4::Window,
        geometry: &WindowGeometry,
        mode: NavigationMode,
        main_loop: &glib::MainLoop,
        outcome: &Rc<RefCell<Outcome>>,
    ) {
        window.set_default_size(1, 1);
        if self.uses_layer_shell() {
            let (mut x, mut y) = (geometry.x, geometry.y);
            let monitor = gdk::Display::default().and_then(|d| monitor_at(&d, x, y));
            if let Some(monitor) = monitor {
                let area = monitor.geometry();
                window.set_monitor(&monitor);
                (x, y) = output_relative(x, y, (area.x(), area.y()));
            }
            window.set_anchor(gtk4_layer_shell::Edge::Left, true);
            window.set_anchor(gtk4_layer_shell::Edge::Top, true);
            window.set_margin(gtk4_layer_shell::Edge::Left, x.max(0));
            window.set_margin(gtk4_layer_shell::Edge::Top, y.max(0));
        }

        let navigator = Rc::new(RefCell::new(Navigator::new(mode, &self.navigation)));
        let exit_key = self.keys.exit.clone();

        let controller = gtk4::EventControllerKey::new();
        {
            let navigator = navigator.clone();
            let injector = self.injector.clone();
            let main_loop = main_loop.clone();
            let outcome = outcome.clone();
            controller.connect_key_pressed(move |_, keyval, _, state| {
                let input = key_input(keyval, state, &exit_key);
                let result = match input.key {
                    Key::Exit => {
                        let released = match mode {
                            NavigationMode::Move => injector.borrow_mut().release(MouseButton::Left),
                            NavigationMode::Scroll => Ok(()),
                        };
                        *outcome.borrow_mut() = match released {
                            Ok(()) => Outcome::Cancelled,
                            Err(e) => Outcome::Failed(e.into()),
                        };
                        main_loop.quit();
                        return glib::Propagation::Stop;
                    }
                    Key::Char { ch, .. } => match navigator.borrow_mut().key_pressed(ch, Instant::now()) {
                        Some((dx, dy)) => match mode {
                            NavigationMode::Move => injector.borrow_mut().move_by(dx, dy),
                            NavigationMode::Scroll => injector.borrow_mut().scroll(dx, dy),
                        },
                        None => Ok(()),
                    },
                    Key::Other => Ok(()),
                };
                if let Err(e) = result {
                    warn!("interceptor injection failed: {}", e);
                    *outcome.borrow_mut() = Outcome::Failed(e.into());
                    main_loop.quit();
                }
                glib::Propagation::Stop
            });
        }
        controller.connect_key_released(move |_, _, _, _| {
            navigator.borrow_mut().key_released();
        });
        window.add_controller(controller);
    }
}

//  Helpers

/// Translate a GDK key event.  Shift is folded into the character, so an
/// upper-case keyval reports `shifted` and no Shift modifier.
fn key_input(keyval: gdk::Key, state: gdk::ModifierType, exit_key: &str) -> KeyInput {
    let modifiers = Modifiers {
        control: state.contains(gdk::ModifierType::CONTROL_MASK),
        alt: state.contains(gdk::ModifierType::ALT_MASK),
        super_key: state.contains(gdk::ModifierType::SUPER_MASK),
    };
    let lower = keyval.to_lower();
    if lower.name().is_some_and(|name| name.eq_ignore_ascii_case(exit_key)) {
        return KeyInput {
            key: Key::Exit,
            modifiers,
        };
    }
    match (keyval.to_unicode(), lower.to_unicode()) {
        (Some(ch), Some(lower_ch)) if !ch.is_control() => KeyInput {
            key: Key::Char {
                ch: lower_ch,
                shifted: keyval != lower,
            },
            modifiers,
        },
        _ => KeyInput {
            key: Key::Other,
            modifiers,
        },
    }
}

fn monitor_at(display: &gdk::Display, x: i32, y: i32) -> Option<gdk::Monitor> {
    let monitors = display.monitors();
    (0..monitors.n_items())
        .filter_map(|i| monitors.item(i).and_downcast::<gdk::Monitor>())
        .find(|m| {
            let g = m.geometry();
            x >= g.x() && x < g.x() + g.width() && y >= g.y() && y < g.y() + g.height()
        })
        .or_else(|| monitors.item(0).and_downcast::<gdk::Monitor>())
}

//  CSS loading

fn load_css(config: &OverlayConfig) {
    let provider = gtk4::CssProvider::new();

    let css_content = match config.css.as_ref().filter(|p| p.exists()) {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(content) => {
                info!("user CSS: {} ({} bytes)", p.display(), content.len());
                content
            }
            Err(e) => {
                warn!("CSS read failed ({}): {}, using built-in", p.display(), e);
                DEFAULT_CSS.to_string()
            }
        },
        None => DEFAULT_CSS.to_string(),
    };

    #[allow(deprecated)]
    provider.load_from_data(&css_content);

    if let Some(display) = gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    } else {
        warn!("no GDK display, CSS will not be applied");
    }
}
