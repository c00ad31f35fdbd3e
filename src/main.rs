//! Entry point for **hints**.
//!
//! ```text
//! hints [-m|--mode hint|scroll] [-v|--verbose]
//! ```
//!
//! Hint mode labels the elements of the focused window and acts on the
//! one typed; scroll mode scrolls with the navigation keys until Escape.
//! Every failure is logged and exits with status 1.

use hints::config::{Config, ConfigError};
use log::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Hint,
    Scroll,
}

#[derive(Debug)]
struct Args {
    mode: Mode,
    verbose: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        mode: Mode::Hint,
        verbose: false,
    };
    while let Some(arg) = args.next() {
        let mode = match arg.as_str() {
            "-v" | "--verbose" => {
                parsed.verbose = true;
                continue;
            }
            "-m" | "--mode" => args.next().ok_or("--mode needs a value")?,
            other => match other.strip_prefix("--mode=") {
                Some(value) => value.to_string(),
                None => return Err(format!("unknown argument {:?}", other)),
            },
        };
        parsed.mode = match mode.as_str() {
            "hint" => Mode::Hint,
            "scroll" => Mode::Scroll,
            other => return Err(format!("unknown mode {:?} (hint, scroll)", other)),
        };
    }
    Ok(parsed)
}

fn load_config() -> Result<Config, ConfigError> {
    Config::load_or_default(Config::default_path().as_deref())
}

//  Main

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("hints: {}", e);
            eprintln!("usage: hints [-m|--mode hint|scroll] [-v|--verbose]");
            std::process::exit(2);
        }
    };

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run(args.mode) {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "overlay-gtk")]
fn run(mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    use hints::backends;
    use hints::mouse::MouseServiceClient;
    use hints::overlay::gtk::GtkPresenter;
    use hints::session::{Session, SessionOutcome};
    use hints::traits::WindowSystem;
    use hints::window_system;

    let config = load_config()?;
    let ws = window_system::connect(&config)?;
    info!(
        "window system {} ({:?})",
        ws.window_system_name(),
        ws.session_type()
    );

    let injector = MouseServiceClient::new(config.mouse_socket_path());
    let presenter = GtkPresenter::new(
        injector.clone(),
        ws.session_type(),
        config.keys.clone(),
        config.navigation.clone(),
        config.overlay.clone(),
    );
    let mut session = Session::new(&ws, presenter, injector, &config.alphabet);
    session.set_overlay_offset(config.overlay_x_offset, config.overlay_y_offset);

    let outcome = match mode {
        Mode::Hint => {
            let mut backends = backends::build(&config.backends)?;
            session.hint_mode(&mut backends)?
        }
        Mode::Scroll => session.scroll_mode()?,
    };
    if let SessionOutcome::Dispatched(action) = outcome {
        info!("{} done", action.action);
    }
    Ok(())
}

#[cfg(not(feature = "overlay-gtk"))]
fn run(_mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    let _config = load_config()?;
    info!("configuration is valid");
    Err("hints was built without an overlay; enable the `overlay-gtk` feature".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_hint_mode() {
        let a = parse(&[]).unwrap();
        assert_eq!(a.mode, Mode::Hint);
        assert!(!a.verbose);
    }

    #[test]
    fn mode_flag_forms() {
        assert_eq!(parse(&["-m", "scroll"]).unwrap().mode, Mode::Scroll);
        assert_eq!(parse(&["--mode", "hint"]).unwrap().mode, Mode::Hint);
        assert_eq!(parse(&["--mode=scroll", "-v"]).unwrap().mode, Mode::Scroll);
        assert!(parse(&["-v"]).unwrap().verbose);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&["-m"]).is_err());
        assert!(parse(&["-m", "drag"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
    }
}
