//! Overlay demo: draws a grid of fake hints over the top-left corner of
//! the first monitor and prints the selected action as JSON.  Scroll and
//! grab interceptor input is printed instead of injected.
//!
//! Run with:
//!     cargo run --bin hints-test-overlay [-m scroll|grab]
//!
//! Press Escape to quit.

use hints::action::{ButtonState, MouseButton};
use hints::config::Config;
use hints::hints::allocate;
use hints::mouse::InjectError;
use hints::overlay::gtk::GtkPresenter;
use hints::traits::{InputInjector, OverlayMode, PresentRequest, Presenter};
use hints::types::{ActionableElement, SessionType, WindowGeometry};
use hints::window_system::session_type_from;

const COLS: usize = 8;
const ROWS: usize = 6;
const PITCH: f64 = 120.0;

/// Prints every request instead of talking to the mouse service.
struct PrintingInjector;

impl InputInjector for PrintingInjector {
    fn click(
        &mut self,
        x: f64,
        y: f64,
        button: MouseButton,
        states: &[ButtonState],
        repeat: u32,
    ) -> Result<(), InjectError> {
        println!("click ({:.0}, {:.0}) {:?} {:?} x{}", x, y, button, states, repeat);
        Ok(())
    }

    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        println!("move by ({}, {})", dx, dy);
        Ok(())
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        println!("scroll ({}, {})", dx, dy);
        Ok(())
    }

    fn release(&mut self, button: MouseButton) -> Result<(), InjectError> {
        println!("release {:?}", button);
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let args: Vec<String> = std::env::args().collect();
    let mode = match args.iter().position(|a| a == "-m").and_then(|i| args.get(i + 1)) {
        Some(m) if m == "scroll" => OverlayMode::Scroll,
        Some(m) if m == "grab" => OverlayMode::Grab,
        _ => OverlayMode::Hints,
    };

    let config = Config::default();
    let session = session_type_from(std::env::var("XDG_SESSION_TYPE").ok().as_deref())
        .unwrap_or(SessionType::Wayland);

    let elements: Vec<ActionableElement> = (0..ROWS)
        .flat_map(|row| {
            (0..COLS).map(move |col| {
                ActionableElement::from_relative_box(
                    (0.0, 0.0),
                    col as f64 * PITCH,
                    row as f64 * PITCH,
                    PITCH,
                    PITCH,
                )
            })
        })
        .collect();
    let hints = match allocate(&elements, &config.alphabet) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let geometry = WindowGeometry {
        x: 0,
        y: 0,
        width: (COLS as f64 * PITCH) as i32,
        height: (ROWS as f64 * PITCH) as i32,
        monitor: String::new(),
        process_id: std::process::id(),
    };

    let mut presenter = GtkPresenter::new(
        PrintingInjector,
        session,
        config.keys.clone(),
        config.navigation.clone(),
        config.overlay.clone(),
    );
    match presenter.present(PresentRequest {
        geometry: &geometry,
        hints: &hints,
        mode,
    }) {
        Ok(Some(action)) => match serde_json::to_string(&action) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}", e),
        },
        Ok(None) => eprintln!("cancelled"),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
