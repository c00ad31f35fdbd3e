//! Element discovery backends.
//!
//! Backends are tried in the order of `backends.enable`; the first one that
//! finds anything wins.

pub mod atspi;
pub mod vision;

use crate::traits::ElementBackend;
use crate::window_system::WindowSystemError;
use self::atspi::{AtspiBackend, AtspiConfig, DbusTree};
use serde::{Deserialize, Serialize};
use vision::{MonitorCapture, VisionBackend, VisionConfig};

/// Errors from element discovery.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Nothing actionable in the focused window.  Not a failure: the
    /// session moves on to the next backend.
    #[error("no actionable elements found in {application:?}")]
    NoChildren { application: String },

    #[error(transparent)]
    WindowSystem(#[from] WindowSystemError),

    #[error("accessibility error: {0}")]
    Accessibility(String),

    #[error("screen capture failed: {0}")]
    Capture(String),

    #[error("d-bus error: {0}")]
    Dbus(#[from] zbus::Error),
}

/// The closed set of backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Atspi,
    Vision,
}

impl BackendKind {
    /// Parse a `backends.enable` entry.  `vision` is accepted as an alias
    /// of `opencv`.
    pub fn from_id(id: &str) -> Result<Self, UnknownBackend> {
        match id {
            "atspi" => Ok(BackendKind::Atspi),
            "opencv" | "vision" => Ok(BackendKind::Vision),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend {0:?} (known: atspi, opencv)")]
pub struct UnknownBackend(String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Backend ids in priority order.
    pub enable: Vec<String>,
    pub atspi: AtspiConfig,
    #[serde(alias = "opencv")]
    pub vision: VisionConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            enable: vec!["atspi".to_string(), "opencv".to_string()],
            atspi: AtspiConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

/// Construct the enabled backends in priority order.
pub fn build(config: &BackendsConfig) -> Result<Vec<Box<dyn ElementBackend>>, UnknownBackend> {
    config
        .enable
        .iter()
        .map(|id| {
            Ok(match BackendKind::from_id(id)? {
                BackendKind::Atspi => {
                    Box::new(AtspiBackend::new(DbusTree::new(), config.atspi.clone()))
                        as Box<dyn ElementBackend>
                }
                BackendKind::Vision => Box::new(VisionBackend::new(
                    MonitorCapture::new(),
                    config.vision.clone(),
                )),
            })
        })
        .collect()
}
