//! The orchestrator that ties window system, backends, overlay and
//! injector together for one invocation.
//!
//! [`Session`] walks the enabled backends in priority order.  The first
//! backend that yields elements for a window with a usable size gets its
//! hints presented; the user's choice is dispatched and the session ends.
//! Backends reporting [`BackendError::NoChildren`] are skipped.

use crate::action::MouseAction;
use crate::backends::BackendError;
use crate::dispatch::{dispatch, DispatchError};
use crate::hints::{allocate, HintError, HintMap};
use crate::overlay::PresentError;
use crate::traits::{ElementBackend, InputInjector, OverlayMode, PresentRequest, Presenter, WindowSystem};
use crate::types::WindowGeometry;
use crate::window_system::{WindowSnapshot, WindowSystemError};
use log::{debug, info};
use std::time::Instant;

/// Possible errors from a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error(transparent)]
    WindowSystem(#[from] WindowSystemError),
    #[error(transparent)]
    Hint(#[from] HintError),
    #[error("overlay error: {0}")]
    Present(#[from] PresentError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutcome {
    /// The user picked a hint and its action was injected.
    Dispatched(MouseAction),
    /// The overlay was closed without a selection.
    Cancelled,
    /// No backend found anything to hint.
    NothingFound,
}

/// One hints invocation.
///
/// Generic over the [`Presenter`] and [`InputInjector`], so it runs the
/// same against the GTK overlay and the `hints-mouse` client as against
/// the recorders in the tests.
pub struct Session<'a, P: Presenter, I: InputInjector> {
    window_system: &'a dyn WindowSystem,
    presenter: P,
    injector: I,
    alphabet: String,
    overlay_offset: (i32, i32),
}

impl<'a, P: Presenter, I: InputInjector> Session<'a, P, I> {
    pub fn new(window_system: &'a dyn WindowSystem, presenter: P, injector: I, alphabet: &str) -> Self {
        Self {
            window_system,
            presenter,
            injector,
            alphabet: alphabet.to_string(),
            overlay_offset: (0, 0),
        }
    }

    /// Shift applied to the overlay region (not to injected input).
    pub fn set_overlay_offset(&mut self, x: i32, y: i32) {
        self.overlay_offset = (x, y);
    }

    /// Discover, present and dispatch.
    ///
    /// The focused window is read once up front; backends, the overlay and
    /// the dispatcher all work from that snapshot.
    pub fn hint_mode(
        &mut self,
        backends: &mut [Box<dyn ElementBackend>],
    ) -> Result<SessionOutcome, SessionError> {
        let snapshot = WindowSnapshot::take(self.window_system)?;
        let window = snapshot.window();

        for backend in backends.iter_mut() {
            let start = Instant::now();
            debug!("trying backend {}", backend.name());

            let elements = match backend.get_children(&snapshot) {
                Ok(elements) => elements,
                Err(BackendError::NoChildren { application }) => {
                    info!("{}: nothing found in {:?}", backend.name(), application);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            debug!(
                "{}: {} elements in {:?}",
                backend.name(),
                elements.len(),
                start.elapsed()
            );

            let hints = allocate(&elements, &self.alphabet)?;
            if hints.is_empty() {
                continue;
            }
            if !window.extents.is_valid() {
                info!("focused window has no usable extents ({})", window.extents);
                continue;
            }

            let (dx, dy) = self.overlay_offset;
            let geometry = WindowGeometry::from_focused(window).offset(dx, dy);
            let selection = self.presenter.present(PresentRequest {
                geometry: &geometry,
                hints: &hints,
                mode: OverlayMode::Hints,
            })?;

            return match selection {
                Some(action) => {
                    dispatch(&action, &snapshot, &mut self.injector, &mut self.presenter)?;
                    Ok(SessionOutcome::Dispatched(action))
                }
                None => {
                    info!("selection cancelled");
                    Ok(SessionOutcome::Cancelled)
                }
            };
        }

        info!("no backend found anything to hint");
        Ok(SessionOutcome::NothingFound)
    }

    /// Run the scroll interceptor until the user exits it.
    pub fn scroll_mode(&mut self) -> Result<SessionOutcome, SessionError> {
        let geometry = WindowGeometry::point(0, 0);
        let hints = HintMap::default();
        let selection = self.presenter.present(PresentRequest {
            geometry: &geometry,
            hints: &hints,
            mode: OverlayMode::Scroll,
        })?;
        Ok(match selection {
            Some(action) => SessionOutcome::Dispatched(action),
            None => SessionOutcome::Cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, ButtonState, MouseButton};
    use crate::testing::{Discovery, Injected, MockBackend, MockInjector, MockPresenter, MockWindowSystem};
    use crate::types::{ActionableElement, Extents, FocusedWindow, SessionType};
    use std::cell::Cell;
    use std::rc::Rc;

    fn elements(n: usize) -> Vec<ActionableElement> {
        (0..n)
            .map(|i| ActionableElement::from_relative_box((100.0, 50.0), i as f64 * 20.0, 0.0, 10.0, 10.0))
            .collect()
    }

    fn ws() -> MockWindowSystem {
        MockWindowSystem::new(Extents::new(100, 50, 800, 600), 42, "gedit")
    }

    fn backend(name: &'static str, discovery: Discovery) -> (Box<dyn ElementBackend>, Rc<Cell<usize>>) {
        let b = MockBackend::new(name, discovery);
        let calls = b.calls.clone();
        (Box::new(b), calls)
    }

    #[test]
    fn falls_through_to_next_backend_on_no_children() {
        let ws = ws();
        let (first, first_calls) = backend("atspi", Discovery::NoChildren);
        let (second, second_calls) = backend("opencv", Discovery::Elements(elements(3)));
        let (third, third_calls) = backend("spare", Discovery::Elements(elements(5)));
        let mut backends = vec![first, second, third];

        let pick = MouseAction::click(110.0, 55.0);
        let mut s = Session::new(&ws, MockPresenter::answering([Some(pick)]), MockInjector::default(), "ab");
        let outcome = s.hint_mode(&mut backends).unwrap();

        assert_eq!(outcome, SessionOutcome::Dispatched(pick));
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 1);
        assert_eq!(third_calls.get(), 0);
        assert_eq!(s.presenter.requests.len(), 1);
        assert_eq!(s.presenter.requests[0].labels, vec!["aa", "ab", "ba"]);
        assert_eq!(s.injector.log.len(), 1);
    }

    #[test]
    fn first_successful_backend_short_circuits() {
        let ws = ws();
        let (first, first_calls) = backend("atspi", Discovery::Elements(elements(1)));
        let (second, second_calls) = backend("opencv", Discovery::Elements(elements(2)));
        let mut backends = vec![first, second];

        let mut s = Session::new(&ws, MockPresenter::default(), MockInjector::default(), "ab");
        assert_eq!(s.hint_mode(&mut backends).unwrap(), SessionOutcome::Cancelled);
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 0);
        assert!(s.injector.log.is_empty());
    }

    #[test]
    fn exhausting_backends_ends_silently() {
        let ws = ws();
        let (first, _) = backend("atspi", Discovery::NoChildren);
        let (second, _) = backend("opencv", Discovery::Elements(Vec::new()));
        let mut backends = vec![first, second];

        let mut s = Session::new(&ws, MockPresenter::default(), MockInjector::default(), "ab");
        assert_eq!(s.hint_mode(&mut backends).unwrap(), SessionOutcome::NothingFound);
        assert!(s.presenter.requests.is_empty());
        assert!(s.injector.log.is_empty());
    }

    #[test]
    fn backend_failure_aborts() {
        let ws = ws();
        let (first, _) = backend("atspi", Discovery::Fails);
        let (second, second_calls) = backend("opencv", Discovery::Elements(elements(1)));
        let mut backends = vec![first, second];

        let mut s = Session::new(&ws, MockPresenter::default(), MockInjector::default(), "ab");
        assert!(matches!(
            s.hint_mode(&mut backends),
            Err(SessionError::Backend(BackendError::Accessibility(_)))
        ));
        assert_eq!(second_calls.get(), 0);
    }

    #[test]
    fn zero_sized_window_is_skipped() {
        let ws = MockWindowSystem::new(Extents::new(0, 0, 0, 0), 1, "app");
        let (only, calls) = backend("atspi", Discovery::Elements(elements(2)));
        let mut backends = vec![only];

        let mut s = Session::new(&ws, MockPresenter::default(), MockInjector::default(), "ab");
        assert_eq!(s.hint_mode(&mut backends).unwrap(), SessionOutcome::NothingFound);
        assert_eq!(calls.get(), 1);
        assert!(s.presenter.requests.is_empty());
    }

    #[test]
    fn overlay_offset_shifts_presented_geometry_only() {
        let ws = ws();
        let (only, _) = backend("atspi", Discovery::Elements(elements(1)));
        let mut backends = vec![only];

        let pick = MouseAction::click(105.0, 55.0);
        let mut s = Session::new(&ws, MockPresenter::answering([Some(pick)]), MockInjector::default(), "ab");
        s.set_overlay_offset(3, -4);
        s.hint_mode(&mut backends).unwrap();

        let g = &s.presenter.requests[0].geometry;
        assert_eq!((g.x, g.y, g.width, g.height), (103, 46, 800, 600));
        assert_eq!(g.process_id, 42);
        assert_eq!(
            s.injector.log,
            vec![Injected::Click {
                x: 105.0,
                y: 55.0,
                button: MouseButton::Left,
                states: vec![ButtonState::Down, ButtonState::Up],
                repeat: 1,
            }]
        );
    }

    #[test]
    fn grab_selection_runs_interceptor_after_hints() {
        let ws = ws();
        let (only, _) = backend("atspi", Discovery::Elements(elements(2)));
        let mut backends = vec![only];

        let grab = MouseAction {
            action: ActionKind::Grab,
            ..MouseAction::click(125.0, 55.0)
        };
        let mut s = Session::new(&ws, MockPresenter::answering([Some(grab), None]), MockInjector::default(), "ab");
        s.hint_mode(&mut backends).unwrap();

        let modes: Vec<OverlayMode> = s.presenter.requests.iter().map(|r| r.mode).collect();
        assert_eq!(modes, vec![OverlayMode::Hints, OverlayMode::Grab]);
    }

    /// Focus moves to another window after the first query.
    struct FocusMoves {
        queries: Cell<usize>,
    }

    impl WindowSystem for FocusMoves {
        fn window_system_name(&self) -> &'static str {
            "moving"
        }

        fn session_type(&self) -> SessionType {
            SessionType::Wayland
        }

        fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
            let n = self.queries.get();
            self.queries.set(n + 1);
            let x = if n == 0 { 100 } else { 900 };
            Ok(FocusedWindow {
                extents: Extents::new(x, 50, 800, 600),
                pid: 42,
                monitor: "DP-1".into(),
                application: "gedit".into(),
            })
        }
    }

    /// Places one element at the window origin it is shown.
    struct OriginBackend {
        seen: Rc<Cell<(i32, i32)>>,
    }

    impl ElementBackend for OriginBackend {
        fn name(&self) -> &'static str {
            "origin"
        }

        fn get_children(
            &mut self,
            window_system: &dyn WindowSystem,
        ) -> Result<Vec<ActionableElement>, BackendError> {
            let e = window_system.focused_window_extents()?;
            self.seen.set((e.x, e.y));
            Ok(vec![ActionableElement::from_relative_box(
                (e.x as f64, e.y as f64),
                0.0,
                0.0,
                10.0,
                10.0,
            )])
        }
    }

    #[test]
    fn one_window_snapshot_per_invocation() {
        let ws = FocusMoves { queries: Cell::new(0) };
        let seen = Rc::new(Cell::new((0, 0)));
        let mut backends: Vec<Box<dyn ElementBackend>> = vec![Box::new(OriginBackend { seen: seen.clone() })];

        let grab = MouseAction {
            action: ActionKind::Grab,
            ..MouseAction::click(105.0, 55.0)
        };
        let mut s = Session::new(&ws, MockPresenter::answering([Some(grab), None]), MockInjector::default(), "ab");
        s.hint_mode(&mut backends).unwrap();

        assert_eq!(ws.queries.get(), 1);
        assert_eq!(seen.get(), (100, 50));
        let hints = &s.presenter.requests[0].geometry;
        assert_eq!((hints.x, hints.y), (100, 50));
        let grab = &s.presenter.requests[1].geometry;
        assert_eq!((grab.x, grab.y), (100, 50));
    }

    #[test]
    fn scroll_mode_presents_empty_point_overlay() {
        let ws = ws();
        let mut s = Session::new(&ws, MockPresenter::default(), MockInjector::default(), "ab");
        assert_eq!(s.scroll_mode().unwrap(), SessionOutcome::Cancelled);
        let req = &s.presenter.requests[0];
        assert_eq!(req.mode, OverlayMode::Scroll);
        assert_eq!(req.geometry, WindowGeometry::point(0, 0));
        assert!(req.labels.is_empty());
        assert_eq!(ws.queries.get(), 0);
    }
}
