//! Hand-written collaborators shared by the unit tests.

use crate::action::{ButtonState, MouseAction, MouseButton};
use crate::backends::BackendError;
use crate::mouse::InjectError;
use crate::overlay::PresentError;
use crate::traits::{ElementBackend, InputInjector, OverlayMode, PresentRequest, Presenter, WindowSystem};
use crate::types::{ActionableElement, Extents, FocusedWindow, SessionType, WindowGeometry};
use crate::window_system::WindowSystemError;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Window system with a fixed focused window.
#[derive(Debug)]
pub struct MockWindowSystem {
    window: FocusedWindow,
    bar_height: i32,
    pub queries: Cell<usize>,
}

impl MockWindowSystem {
    pub fn new(extents: Extents, pid: u32, application: &str) -> Self {
        Self {
            window: FocusedWindow {
                extents,
                pid,
                monitor: "DP-1".into(),
                application: application.into(),
            },
            bar_height: 0,
            queries: Cell::new(0),
        }
    }

    pub fn with_bar_height(mut self, bar_height: i32) -> Self {
        self.bar_height = bar_height;
        self
    }
}

impl WindowSystem for MockWindowSystem {
    fn window_system_name(&self) -> &'static str {
        "mock"
    }

    fn session_type(&self) -> SessionType {
        SessionType::Wayland
    }

    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
        self.queries.set(self.queries.get() + 1);
        Ok(self.window.clone())
    }

    fn bar_height(&self) -> Result<i32, WindowSystemError> {
        Ok(self.bar_height)
    }
}

/// One recorded injector call.
#[derive(Debug, Clone, PartialEq)]
pub enum Injected {
    Click {
        x: f64,
        y: f64,
        button: MouseButton,
        states: Vec<ButtonState>,
        repeat: u32,
    },
    MoveBy(i32, i32),
    Scroll(i32, i32),
    Release(MouseButton),
}

/// Injector that records every call; fails when `fail` is set.
#[derive(Debug, Default)]
pub struct MockInjector {
    pub log: Vec<Injected>,
    pub fail: bool,
}

impl MockInjector {
    fn record(&mut self, call: Injected) -> Result<(), InjectError> {
        if self.fail {
            return Err(InjectError::Io(std::io::Error::other("injector down")));
        }
        self.log.push(call);
        Ok(())
    }
}

impl InputInjector for MockInjector {
    fn click(
        &mut self,
        x: f64,
        y: f64,
        button: MouseButton,
        states: &[ButtonState],
        repeat: u32,
    ) -> Result<(), InjectError> {
        self.record(Injected::Click {
            x,
            y,
            button,
            states: states.to_vec(),
            repeat,
        })
    }

    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        self.record(Injected::MoveBy(dx, dy))
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        self.record(Injected::Scroll(dx, dy))
    }

    fn release(&mut self, button: MouseButton) -> Result<(), InjectError> {
        self.record(Injected::Release(button))
    }
}

/// What a [`MockPresenter`] saw.
#[derive(Debug, Clone, PartialEq)]
pub struct Presented {
    pub mode: OverlayMode,
    pub geometry: WindowGeometry,
    pub labels: Vec<String>,
}

/// Presenter that answers from a queue; an empty queue means "cancelled".
#[derive(Debug, Default)]
pub struct MockPresenter {
    pub responses: VecDeque<Option<MouseAction>>,
    pub requests: Vec<Presented>,
}

impl MockPresenter {
    pub fn answering(responses: impl IntoIterator<Item = Option<MouseAction>>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            requests: Vec::new(),
        }
    }
}

impl Presenter for MockPresenter {
    fn present(&mut self, request: PresentRequest<'_>) -> Result<Option<MouseAction>, PresentError> {
        self.requests.push(Presented {
            mode: request.mode,
            geometry: request.geometry.clone(),
            labels: request.hints.labels().map(String::from).collect(),
        });
        Ok(self.responses.pop_front().flatten())
    }
}

/// What a [`MockBackend`] returns on every call.
#[derive(Debug, Clone)]
pub enum Discovery {
    Elements(Vec<ActionableElement>),
    NoChildren,
    Fails,
}

/// Backend with a canned answer and a shared call counter.
pub struct MockBackend {
    name: &'static str,
    discovery: Discovery,
    pub calls: Rc<Cell<usize>>,
}

impl MockBackend {
    pub fn new(name: &'static str, discovery: Discovery) -> Self {
        Self {
            name,
            discovery,
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl ElementBackend for MockBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn get_children(
        &mut self,
        window_system: &dyn WindowSystem,
    ) -> Result<Vec<ActionableElement>, BackendError> {
        self.calls.set(self.calls.get() + 1);
        match &self.discovery {
            Discovery::Elements(elements) => Ok(elements.clone()),
            Discovery::NoChildren => Err(BackendError::NoChildren {
                application: window_system.focused_application_name()?,
            }),
            Discovery::Fails => Err(BackendError::Accessibility("bus gone".into())),
        }
    }
}
