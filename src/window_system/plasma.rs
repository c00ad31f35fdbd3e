//! KDE Plasma provider.
//!
//! KWin exposes no query for the active window, so a small KWin script is
//! loaded over D-Bus, run, and its `print` output is read back from the
//! journal of `kwin_wayland`.  The script is unloaded again afterwards.

use super::{parse_json, CommandPort, IpcPort, WindowSystemError};
use crate::traits::WindowSystem;
use crate::types::{Extents, FocusedWindow, SessionType};
use log::debug;
use serde::Deserialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use zbus::blocking::{Connection, Proxy};

/// Prints one line describing the active window: `MARKER {json}`.
const ACTIVE_WINDOW_SCRIPT: &str = r#"const w = workspace.activeWindow;
print("MARKER " + JSON.stringify({
    extents: [w.x, w.y, w.width, w.height],
    pid: w.pid,
    name: w.resourceClass,
    output: w.output ? w.output.name : ""
}));
"#;

const JOURNAL_PREFIX: &str = "js: ";
const JOURNAL_ATTEMPTS: usize = 10;
const JOURNAL_RETRY: Duration = Duration::from_millis(50);

/// Runs a KWin script and returns what it printed after `marker`.
///
/// Every run gets a fresh marker, so output of earlier runs still in the
/// journal is never mistaken for this one.
pub trait KwinScriptRunner {
    fn run_script(&self, source: &str, marker: &str) -> Result<String, WindowSystemError>;
}

/// A marker unique to this process and instant.
fn run_marker() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("hints-{}-{}", std::process::id(), nanos)
}

/// Output of [`ACTIVE_WINDOW_SCRIPT`].
#[derive(Debug, Deserialize)]
struct ActiveWindowJson {
    extents: (f64, f64, f64, f64),
    pid: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    output: String,
}

pub struct Plasmashell<R> {
    runner: R,
}

impl<R: KwinScriptRunner> Plasmashell<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: KwinScriptRunner> WindowSystem for Plasmashell<R> {
    fn window_system_name(&self) -> &'static str {
        "plasmashell"
    }

    fn session_type(&self) -> SessionType {
        SessionType::Wayland
    }

    fn focused_window(&self) -> Result<FocusedWindow, WindowSystemError> {
        let marker = run_marker();
        let source = ACTIVE_WINDOW_SCRIPT.replace("MARKER", &marker);
        let json = self.runner.run_script(&source, &marker)?;
        let w: ActiveWindowJson = parse_json("kwin active window script", &json)?;
        let (x, y, width, height) = w.extents;
        Ok(FocusedWindow {
            extents: Extents::new(
                x.round() as i32,
                y.round() as i32,
                width.round() as i32,
                height.round() as i32,
            ),
            pid: w.pid,
            monitor: w.output,
            application: w.name,
        })
    }
}

//  D-Bus runner

/// Loads scripts through `org.kde.kwin.Scripting` and reads their output
/// with `journalctl`.
pub struct KwinDbus {
    journal: CommandPort,
}

impl KwinDbus {
    pub fn new(journal: CommandPort) -> Self {
        Self { journal }
    }

    fn script_file(source: &str) -> Result<PathBuf, WindowSystemError> {
        let dir = std::env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        let path = dir.join(format!("hints-kwin-{}.js", std::process::id()));
        std::fs::write(&path, source)
            .map_err(|e| WindowSystemError::query("kwin script", format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }

    /// Payload of the last `js: ` line carrying `marker` logged by KWin
    /// since `since`.
    fn read_journal(&self, since: Duration, marker: &str) -> Result<Option<String>, WindowSystemError> {
        let since = format!("@{}.{:06}", since.as_secs(), since.subsec_micros());
        let output = self.journal.request(&[
            "_COMM=kwin_wayland",
            "--output=cat",
            "--since",
            &since,
        ])?;
        Ok(last_script_line(&output, marker))
    }
}

/// Pick the last line KWin's script engine printed with `marker`.
fn last_script_line(journal: &str, marker: &str) -> Option<String> {
    journal
        .lines()
        .rev()
        .filter_map(|line| line.strip_prefix(JOURNAL_PREFIX))
        .find_map(|line| line.strip_prefix(marker)?.strip_prefix(' '))
        .map(|rest| rest.trim().to_string())
}

impl KwinScriptRunner for KwinDbus {
    fn run_script(&self, source: &str, marker: &str) -> Result<String, WindowSystemError> {
        let path = Self::script_file(source)?;
        let plugin = format!("hints-{}", std::process::id());
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);

        let conn = Connection::session()?;
        let scripting = Proxy::new(&conn, "org.kde.KWin", "/Scripting", "org.kde.kwin.Scripting")?;
        let path_str = path.to_string_lossy().into_owned();
        let id: i32 = scripting.call("loadScript", &(path_str.as_str(), plugin.as_str()))?;
        debug!("loaded kwin script {} as id {}", path.display(), id);

        let script_path = format!("/Scripting/Script{}", id);
        let script = Proxy::new(&conn, "org.kde.KWin", script_path.as_str(), "org.kde.kwin.Script")?;
        script.call::<_, _, ()>("run", &())?;

        let mut line = None;
        for _ in 0..JOURNAL_ATTEMPTS {
            line = self.read_journal(since, marker)?;
            if line.is_some() {
                break;
            }
            thread::sleep(JOURNAL_RETRY);
        }

        if let Err(e) = script.call::<_, _, ()>("stop", &()) {
            debug!("could not stop kwin script {}: {}", id, e);
        }
        let _ = std::fs::remove_file(&path);

        line.ok_or_else(|| WindowSystemError::query("kwin script", "no output in the kwin_wayland journal"))
    }
}
