//! Unix-socket [`InputInjector`] implementation.
//!
//! # Wire format
//!
//! One JSON object per line, tagged by `method`.  Buttons and button
//! states are sent as their Linux input event values:
//!
//! ```json
//! {"method":"click","x":120,"y":48,"button":272,"button_states":[1,0],"repeat":1,"absolute":true}
//! {"method":"move","x":10,"y":0,"absolute":false}
//! {"method":"scroll","x":0,"y":5}
//! ```

use super::InjectError;
use crate::action::{ButtonState, MouseButton};
use crate::traits::InputInjector;
use log::debug;
use serde::Serialize;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
enum Request {
    Click {
        x: i32,
        y: i32,
        button: u16,
        button_states: Vec<i32>,
        repeat: u32,
        absolute: bool,
    },
    Move {
        x: i32,
        y: i32,
        absolute: bool,
    },
    Scroll {
        x: i32,
        y: i32,
    },
}

/// Sends pointer requests to the `hints-mouse` service.
///
/// A fresh connection is opened per request, so the client holds no
/// resources between calls and can be cloned freely.
#[derive(Debug, Clone)]
pub struct MouseServiceClient {
    path: PathBuf,
}

impl MouseServiceClient {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn send(&self, request: &Request) -> Result<(), InjectError> {
        let mut stream =
            UnixStream::connect(&self.path).map_err(|source| InjectError::ServiceUnavailable {
                path: self.path.clone(),
                source,
            })?;
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        debug!("mouse request {:?}", request);
        stream.write_all(&line)?;
        stream.flush()?;
        Ok(())
    }
}

impl InputInjector for MouseServiceClient {
    fn click(
        &mut self,
        x: f64,
        y: f64,
        button: MouseButton,
        states: &[ButtonState],
        repeat: u32,
    ) -> Result<(), InjectError> {
        self.send(&Request::Click {
            x: x.round() as i32,
            y: y.round() as i32,
            button: button.code(),
            button_states: states.iter().map(|s| s.value()).collect(),
            repeat,
            absolute: true,
        })
    }

    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        self.send(&Request::Move {
            x: dx,
            y: dy,
            absolute: false,
        })
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        self.send(&Request::Scroll { x: dx, y: dy })
    }

    fn release(&mut self, button: MouseButton) -> Result<(), InjectError> {
        self.send(&Request::Click {
            x: 0,
            y: 0,
            button: button.code(),
            button_states: vec![ButtonState::Up.value()],
            repeat: 1,
            absolute: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::os::unix::net::UnixListener;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("hints-mouse-test-{}-{}.sock", std::process::id(), id))
    }

    /// Bind a listener that forwards every received line, one connection
    /// per request, for `count` requests.
    fn serve(path: &Path, count: usize) -> mpsc::Receiver<serde_json::Value> {
        let _ = std::fs::remove_file(path);
        let listener = UnixListener::bind(path).expect("bind");
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(count) {
                let stream = stream.expect("accept");
                for line in BufReader::new(stream).lines() {
                    let value = serde_json::from_str(&line.expect("read")).expect("json");
                    tx.send(value).expect("send");
                }
            }
        });
        rx
    }

    fn recv(rx: &mpsc::Receiver<serde_json::Value>) -> serde_json::Value {
        rx.recv_timeout(std::time::Duration::from_secs(2))
            .expect("request")
    }

    #[test]
    fn requests_round_trip_over_socket() {
        let path = tmp_socket_path();
        let rx = serve(&path, 4);
        let mut client = MouseServiceClient::new(&path);

        client
            .click(120.4, 48.6, MouseButton::Left, &[ButtonState::Down, ButtonState::Up], 2)
            .unwrap();
        assert_eq!(
            recv(&rx),
            serde_json::json!({
                "method": "click", "x": 120, "y": 49, "button": 272,
                "button_states": [1, 0], "repeat": 2, "absolute": true
            })
        );

        client.move_by(-10, 5).unwrap();
        assert_eq!(
            recv(&rx),
            serde_json::json!({"method": "move", "x": -10, "y": 5, "absolute": false})
        );

        client.scroll(0, 5).unwrap();
        assert_eq!(recv(&rx), serde_json::json!({"method": "scroll", "x": 0, "y": 5}));

        client.release(MouseButton::Right).unwrap();
        let release = recv(&rx);
        assert_eq!(release["button"], 273);
        assert_eq!(release["button_states"], serde_json::json!([0]));
        assert_eq!(release["absolute"], false);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn hover_sends_no_button_states() {
        let path = tmp_socket_path();
        let rx = serve(&path, 1);
        let mut client = MouseServiceClient::new(&path);
        client.click(1.0, 2.0, MouseButton::Left, &[], 1).unwrap();
        assert_eq!(recv(&rx)["button_states"], serde_json::json!([]));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_service_is_unavailable() {
        let mut client = MouseServiceClient::new("/nonexistent/hints-mouse.sock");
        assert!(matches!(
            client.scroll(0, 1),
            Err(InjectError::ServiceUnavailable { .. })
        ));
    }
}
