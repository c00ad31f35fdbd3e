//! Turns a resolved [`MouseAction`] into injected input.

use crate::action::{ActionKind, ButtonState, MouseAction};
use crate::hints::HintMap;
use crate::mouse::InjectError;
use crate::overlay::PresentError;
use crate::traits::{InputInjector, OverlayMode, PresentRequest, Presenter, WindowSystem};
use crate::types::WindowGeometry;
use crate::window_system::WindowSystemError;
use log::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("input injection failed: {0}")]
    Inject(#[from] InjectError),
    #[error(transparent)]
    WindowSystem(#[from] WindowSystemError),
    #[error("grab interceptor failed: {0}")]
    Present(#[from] PresentError),
}

/// Perform `action`.
///
/// `y` is shifted down by the provider's bar height before injecting.  A
/// grab presses the button, then hands over to the presenter's grab
/// interceptor, which moves the pointer and releases the button on exit.
pub fn dispatch<P, I>(
    action: &MouseAction,
    window_system: &dyn WindowSystem,
    injector: &mut I,
    presenter: &mut P,
) -> Result<(), DispatchError>
where
    P: Presenter + ?Sized,
    I: InputInjector + ?Sized,
{
    let bar_height = window_system.bar_height()?;
    let x = action.x;
    let y = action.y + bar_height as f64;
    info!(
        "{} {:?} at ({:.0}, {:.0}) x{}",
        action.action, action.button, x, y, action.repeat
    );

    match action.action {
        ActionKind::Click | ActionKind::Hover => {
            injector.click(x, y, action.button, action.button_states(), action.repeat)?;
        }
        ActionKind::Grab => {
            injector.click(x, y, action.button, &[ButtonState::Down], 1)?;
            let window = window_system.focused_window_extents()?;
            let geometry = WindowGeometry::point(window.x, window.y);
            let hints = HintMap::default();
            debug!("grab interceptor over {}", window);
            presenter.present(PresentRequest {
                geometry: &geometry,
                hints: &hints,
                mode: OverlayMode::Grab,
            })?;
        }
    }
    Ok(())
}
