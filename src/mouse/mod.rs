//! Pointer input through the `hints-mouse` service.
//!
//! Writing to uinput needs a privileged helper, so the injection itself
//! happens in a separate long-running service.  This module only holds the
//! client side: each request is one line of JSON written to the service's
//! Unix socket.

pub mod client;

pub use client::MouseServiceClient;

use std::path::PathBuf;

/// Errors from injecting input.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("mouse service not reachable at {}: {source}", path.display())]
    ServiceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// `$XDG_RUNTIME_DIR/hints-mouse.sock`, or the temp directory when no
/// runtime directory is set.
pub fn default_socket_path() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join("hints-mouse.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_name() {
        assert_eq!(
            default_socket_path().file_name().unwrap(),
            "hints-mouse.sock"
        );
    }

    #[test]
    fn unavailable_names_the_path() {
        let e = InjectError::ServiceUnavailable {
            path: PathBuf::from("/run/user/1000/hints-mouse.sock"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(e.to_string().contains("/run/user/1000/hints-mouse.sock"));
    }
}
