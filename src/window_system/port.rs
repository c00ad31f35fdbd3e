//! Request/response transports used by the window-system providers.
//!
//! Every provider asks its compositor a handful of read-only questions and
//! parses a JSON (or `KEY=value`) answer.  [`IpcPort`] hides *how* the
//! question travels, a child process or a Unix socket, so providers only
//! deal with the parsed contract and tests can feed canned responses.

use super::WindowSystemError;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A synchronous request/response channel to a window system.
pub trait IpcPort {
    /// Send `args` and return the raw textual response.
    fn request(&self, args: &[&str]) -> Result<String, WindowSystemError>;
}

impl<T: IpcPort + ?Sized> IpcPort for Box<T> {
    fn request(&self, args: &[&str]) -> Result<String, WindowSystemError> {
        (**self).request(args)
    }
}

//  Subprocess transport

/// Runs `program args…` and returns its standard output.
///
/// A non-zero exit status is an error carrying the child's stderr.  When a
/// timeout is configured the child is killed once it expires.
#[derive(Debug, Clone)]
pub struct CommandPort {
    program: String,
    timeout: Option<Duration>,
}

impl CommandPort {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the command and return raw stdout bytes.
    pub fn run(&self, args: &[&str]) -> Result<Vec<u8>, WindowSystemError> {
        let label = describe(&self.program, args);
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WindowSystemError::query(&label, e))?;

        let (status, stdout, stderr) = match self.timeout {
            Some(timeout) => wait_with_timeout(child, timeout, &label)?,
            None => {
                let output = child
                    .wait_with_output()
                    .map_err(|e| WindowSystemError::query(&label, e))?;
                (output.status, output.stdout, output.stderr)
            }
        };

        if !status.success() {
            return Err(WindowSystemError::query(
                &label,
                format!("{}: {}", status, String::from_utf8_lossy(&stderr).trim()),
            ));
        }
        Ok(stdout)
    }
}

impl IpcPort for CommandPort {
    fn request(&self, args: &[&str]) -> Result<String, WindowSystemError> {
        let stdout = self.run(args)?;
        String::from_utf8(stdout)
            .map_err(|e| WindowSystemError::query(&describe(&self.program, args), e))
    }
}

fn describe(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

fn read_all<R: Read>(source: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut source) = source {
        let _ = source.read_to_end(&mut buf);
    }
    buf
}

/// Wait for `child`, draining its pipes on helper threads so a large
/// response cannot fill the pipe and stall the child.
fn wait_with_timeout(
    mut child: Child,
    timeout: Duration,
    label: &str,
) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), WindowSystemError> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_reader = thread::spawn(move || read_all(stdout));
    let err_reader = thread::spawn(move || read_all(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(WindowSystemError::Timeout {
                    request: label.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(WindowSystemError::query(label, e)),
        }
    };

    let stdout = out_reader.join().unwrap_or_default();
    let stderr = err_reader.join().unwrap_or_default();
    Ok((status, stdout, stderr))
}

//  Hyprland socket transport

/// Talks to Hyprland through its command socket at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`.
///
/// Arguments are joined with spaces into one request (`j/activewindow`).
/// No child processes are spawned.
#[derive(Debug, Clone)]
pub struct HyprlandSocket {
    timeout: Option<Duration>,
}

impl HyprlandSocket {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Resolve the Hyprland command socket path.
    ///
    /// Hyprland ≥ 0.40 stores its sockets under `$XDG_RUNTIME_DIR/hypr/`.
    fn socket_path() -> Result<PathBuf, WindowSystemError> {
        let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
            .map_err(|_| WindowSystemError::query("hyprland", "XDG_RUNTIME_DIR not set"))?;
        let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE").map_err(|_| {
            WindowSystemError::query("hyprland", "HYPRLAND_INSTANCE_SIGNATURE not set")
        })?;
        Ok(PathBuf::from(format!(
            "{}/hypr/{}/.socket.sock",
            runtime_dir, his
        )))
    }
}

impl IpcPort for HyprlandSocket {
    fn request(&self, args: &[&str]) -> Result<String, WindowSystemError> {
        let command = args.join(" ");
        let path = Self::socket_path()?;
        let mut stream = UnixStream::connect(&path).map_err(|e| {
            WindowSystemError::query(&command, format!("connect to {}: {}", path.display(), e))
        })?;
        stream
            .set_read_timeout(self.timeout)
            .and_then(|_| stream.set_write_timeout(self.timeout))
            .map_err(|e| WindowSystemError::query(&command, e))?;

        stream
            .write_all(command.as_bytes())
            .map_err(|e| WindowSystemError::query(&command, format!("write: {}", e)))?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .map_err(|e| WindowSystemError::query(&command, format!("read: {}", e)))?;

        String::from_utf8(response)
            .map_err(|e| WindowSystemError::query(&command, format!("utf-8: {}", e)))
    }
}

//  Test fixture

/// Port that answers from a fixed table of `request → response` pairs.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FixturePort {
    responses: Vec<(String, String)>,
    pub calls: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl FixturePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, request: &str, response: &str) -> Self {
        self.responses.push((request.to_string(), response.to_string()));
        self
    }
}

#[cfg(test)]
impl IpcPort for FixturePort {
    fn request(&self, args: &[&str]) -> Result<String, WindowSystemError> {
        let key = args.join(" ");
        self.calls.borrow_mut().push(key.clone());
        self.responses
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| WindowSystemError::query(&key, "no fixture"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_port_returns_stdout() {
        let port = CommandPort::new("echo", None);
        assert_eq!(port.request(&["hello"]).unwrap().trim(), "hello");
    }

    #[test]
    fn command_port_with_timeout_returns_stdout() {
        let port = CommandPort::new("echo", Some(Duration::from_secs(5)));
        assert_eq!(port.request(&["-n", "hi"]).unwrap(), "hi");
    }

    #[test]
    fn command_port_reports_failure_status() {
        let port = CommandPort::new("false", None);
        let err = port.request(&[]).unwrap_err();
        assert!(matches!(err, WindowSystemError::Query { .. }));
    }

    #[test]
    fn command_port_reports_missing_program() {
        let port = CommandPort::new("hints-definitely-not-a-program", None);
        assert!(matches!(
            port.request(&[]),
            Err(WindowSystemError::Query { .. })
        ));
    }

    #[test]
    fn command_port_times_out() {
        let port = CommandPort::new("sleep", Some(Duration::from_millis(50)));
        let err = port.request(&["5"]).unwrap_err();
        assert!(matches!(err, WindowSystemError::Timeout { timeout_ms: 50, .. }));
    }

    #[test]
    fn fixture_port_records_calls() {
        let port = FixturePort::new().with("j/activewindow", "{}");
        assert_eq!(port.request(&["j/activewindow"]).unwrap(), "{}");
        assert!(port.request(&["j/monitors"]).is_err());
        assert_eq!(
            *port.calls.borrow(),
            vec!["j/activewindow".to_string(), "j/monitors".to_string()]
        );
    }
}
