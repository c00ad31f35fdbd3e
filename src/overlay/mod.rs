//! Overlay presenters.
//!
//! When the `overlay-gtk` feature is enabled, [`gtk::GtkPresenter`] draws
//! the hints in a GTK4 window (a layer-shell surface on Wayland) and also
//! hosts the invisible scroll and grab interceptors.

#[cfg(feature = "overlay-gtk")]
pub mod gtk;

use crate::mouse::InjectError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Errors from presenting an overlay.
#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("overlay initialisation failed: {0}")]
    Init(String),
    /// The scroll or grab interceptor could not inject input.
    #[error(transparent)]
    Inject(#[from] InjectError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// User stylesheet replacing the built-in one.
    pub css: Option<PathBuf>,
    /// Draw labels upper-case.  Typing stays case-insensitive for
    /// selection; Shift still means right click.
    pub uppercase: bool,
}

/// Text drawn for a label given the typed prefix, as Pango markup: the
/// typed part is wrapped in a `typed` span.
pub fn label_markup(label: &str, typed: &str, uppercase: bool) -> String {
    let shown = |s: &str| {
        if uppercase {
            s.to_uppercase()
        } else {
            s.to_string()
        }
    };
    let split = typed.len().min(label.len());
    let (done, rest) = label.split_at(split);
    let done = escape(&shown(done));
    let rest = escape(&shown(rest));
    if done.is_empty() {
        rest
    } else {
        format!("<span alpha=\"50%\">{}</span>{}", done, rest)
    }
}

/// Position of the screen point `(x, y)` inside the output whose layout
/// origin is `origin`.  Overlay surfaces are bound to that output, so
/// everything placed on them is output-relative.
pub fn output_relative(x: i32, y: i32, origin: (i32, i32)) -> (i32, i32) {
    (x - origin.0, y - origin.1)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
