//! Accessibility (AT-SPI) element discovery.
//!
//! The walker is generic over [`AccessibilityTree`] so it can be exercised
//! against an in-memory tree; [`DbusTree`] is the real implementation
//! talking to the accessibility bus.
//!
//! # Coordinates
//!
//! GTK 4 cannot report screen coordinates, so for GTK ≥ 4 applications the
//! window-relative extents are used (as absolute values, corner elements
//! sometimes report `-1`) and the window origin from the window system is
//! added.  Every other toolkit reports screen extents and the origin is
//! subtracted to get the relative position.

pub mod dbus;
pub mod names;

pub use ::atspi::{CoordType, Role, State, StateSet};
pub use dbus::DbusTree;

use super::BackendError;
use crate::traits::{ElementBackend, WindowSystem};
use crate::types::{ActionableElement, Extents};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Description substring of the GNOME frame helper, which also reports an
/// active window.
const MUTTER_FRAMES: &str = "mutter-x11-frames";

/// Trees deeper than this are cut off.
const MAX_DEPTH: usize = 256;

//  Ports

/// One accessible object.
///
/// Every getter may fail: objects can disappear while the tree is walked.
pub trait AccessibleNode: Sized {
    fn description(&self) -> Result<String, BackendError>;
    fn role(&self) -> Result<Role, BackendError>;
    fn states(&self) -> Result<StateSet, BackendError>;
    fn extents(&self, coords: CoordType) -> Result<Extents, BackendError>;
    fn children(&self) -> Result<Vec<Self>, BackendError>;
    fn process_id(&self) -> Result<u32, BackendError>;
    /// Toolkit name and version of the owning application.
    fn toolkit(&self) -> Result<Toolkit, BackendError>;
}

/// Entry point into an accessibility tree.
pub trait AccessibilityTree {
    type Node: AccessibleNode;

    /// The desktop root whose children are applications.
    fn desktop(&self) -> Result<Self::Node, BackendError>;
}

/// Toolkit of an accessible application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolkit {
    pub name: String,
    pub version: String,
}

impl Toolkit {
    /// GTK 4 and later only report window-relative extents.
    pub fn window_relative_only(&self) -> bool {
        self.name == "GTK"
            && self
                .version
                .split('.')
                .next()
                .and_then(|major| major.parse::<u32>().ok())
                .is_some_and(|major| major >= 4)
    }
}

//  Match rules

/// How a set of states or roles is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    All,
    Any,
    None,
    Empty,
}

/// Resolved rules for one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    #[serde(with = "names")]
    pub states: Vec<State>,
    pub states_match_type: MatchType,
    #[serde(with = "names")]
    pub roles: Vec<Role>,
    pub roles_match_type: MatchType,
    /// Multiplier applied to reported extents (HiDPI toolkits that report
    /// logical pixels).
    pub scale_factor: f64,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            states: vec![State::Sensitive, State::Showing, State::Visible],
            states_match_type: MatchType::All,
            roles: vec![
                Role::PushButton,
                Role::ToggleButton,
                Role::CheckBox,
                Role::RadioButton,
                Role::ComboBox,
                Role::Link,
                Role::MenuItem,
                Role::CheckMenuItem,
                Role::RadioMenuItem,
                Role::PageTab,
                Role::Entry,
                Role::PasswordText,
                Role::SpinButton,
                Role::Slider,
                Role::ListItem,
                Role::TableCell,
                Role::TreeItem,
                Role::Icon,
                Role::Text,
            ],
            roles_match_type: MatchType::Any,
            scale_factor: 1.0,
        }
    }
}

/// Per-application overrides; unset fields keep the default rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOverride {
    #[serde(with = "names::optional")]
    pub states: Option<Vec<State>>,
    pub states_match_type: Option<MatchType>,
    #[serde(with = "names::optional")]
    pub roles: Option<Vec<Role>>,
    pub roles_match_type: Option<MatchType>,
    pub scale_factor: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRulesConfig {
    pub default: MatchRules,
    /// Keyed by the focused application name reported by the window
    /// system.
    pub applications: HashMap<String, RuleOverride>,
}

impl MatchRulesConfig {
    /// Default rules overlaid with the entry for `application`.
    pub fn resolve(&self, application: &str) -> MatchRules {
        let mut rules = self.default.clone();
        if let Some(o) = self.applications.get(application) {
            if let Some(states) = &o.states {
                rules.states = states.clone();
            }
            if let Some(t) = o.states_match_type {
                rules.states_match_type = t;
            }
            if let Some(roles) = &o.roles {
                rules.roles = roles.clone();
            }
            if let Some(t) = o.roles_match_type {
                rules.roles_match_type = t;
            }
            if let Some(s) = o.scale_factor {
                rules.scale_factor = s;
            }
        }
        rules
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtspiConfig {
    pub match_rules: MatchRulesConfig,
}

impl MatchRules {
    pub fn states_match(&self, set: &StateSet) -> bool {
        match self.states_match_type {
            MatchType::All | MatchType::Empty => self.states.iter().all(|s| set.contains(*s)),
            MatchType::Any => self.states.iter().any(|s| set.contains(*s)),
            MatchType::None => !self.states.iter().any(|s| set.contains(*s)),
        }
    }

    /// A node has a single role, so ALL degenerates to membership.
    pub fn role_matches(&self, role: Role) -> bool {
        match self.roles_match_type {
            MatchType::All | MatchType::Empty | MatchType::Any => self.roles.contains(&role),
            MatchType::None => !self.roles.contains(&role),
        }
    }
}

//  Backend

/// Per-walk context.
struct Walk<'a> {
    rules: &'a MatchRules,
    window_relative: bool,
    window: Extents,
}

impl Walk<'_> {
    /// The element for `node`, or `None` if it does not match the rules.
    fn element<N: AccessibleNode>(&self, node: &N) -> Result<Option<ActionableElement>, BackendError> {
        let states = node.states()?;
        if states.contains(State::Defunct) || !self.rules.states_match(&states) {
            return Ok(None);
        }
        if !self.rules.role_matches(node.role()?) {
            return Ok(None);
        }

        let scale = self.rules.scale_factor;
        let origin = (self.window.x as f64, self.window.y as f64);
        let element = if self.window_relative {
            let e = node.extents(CoordType::Window)?;
            ActionableElement::from_relative_box(
                origin,
                (e.x as f64).abs() * scale,
                (e.y as f64).abs() * scale,
                e.width as f64 * scale,
                e.height as f64 * scale,
            )
        } else {
            let e = node.extents(CoordType::Screen)?;
            ActionableElement::from_absolute_box(
                origin,
                e.x as f64 * scale,
                e.y as f64 * scale,
                e.width as f64 * scale,
                e.height as f64 * scale,
            )
        };
        Ok(Some(element))
    }

    /// Depth-first walk in canonical order.
    fn collect<N: AccessibleNode>(&self, node: &N, depth: usize, out: &mut Vec<ActionableElement>) {
        match self.element(node) {
            Ok(Some(element)) => out.push(element),
            Ok(None) => {}
            Err(e) => debug!("skipping accessible: {}", e),
        }
        if depth >= MAX_DEPTH {
            debug!("accessible tree deeper than {}, not descending", MAX_DEPTH);
            return;
        }
        match node.children() {
            Ok(children) => {
                for child in &children {
                    self.collect(child, depth + 1, out);
                }
            }
            Err(e) => debug!("skipping children of accessible: {}", e),
        }
    }
}

/// Find the active accessible window owned by `pid`.
///
/// Windows minimised to a tray can still carry `ACTIVE`, hence the pid
/// check.
pub fn find_active_window<N: AccessibleNode>(desktop: &N, pid: u32) -> Result<Option<N>, BackendError> {
    for app in desktop.children()? {
        if app.description().unwrap_or_default().contains(MUTTER_FRAMES) {
            continue;
        }
        let windows = match app.children() {
            Ok(w) => w,
            Err(e) => {
                debug!("skipping accessible application: {}", e);
                continue;
            }
        };
        for window in windows {
            let active = window
                .states()
                .map(|s| s.contains(State::Active))
                .unwrap_or(false);
            if active && window.process_id().ok() == Some(pid) {
                return Ok(Some(window));
            }
        }
    }
    Ok(None)
}

/// Discovers elements through the accessibility tree.
pub struct AtspiBackend<T> {
    tree: T,
    config: AtspiConfig,
}

impl<T: AccessibilityTree> AtspiBackend<T> {
    pub fn new(tree: T, config: AtspiConfig) -> Self {
        Self { tree, config }
    }
}

impl<T: AccessibilityTree> ElementBackend for AtspiBackend<T> {
    fn name(&self) -> &'static str {
        "atspi"
    }

    fn get_children(
        &mut self,
        window_system: &dyn WindowSystem,
    ) -> Result<Vec<ActionableElement>, BackendError> {
        let focused = window_system.focused_window()?;
        let desktop = self.tree.desktop()?;
        let Some(window) = find_active_window(&desktop, focused.pid)? else {
            debug!("no active accessible window for pid {}", focused.pid);
            return Err(BackendError::NoChildren {
                application: focused.application,
            });
        };

        let toolkit = window.toolkit()?;
        let rules = self.config.match_rules.resolve(&focused.application);
        let walk = Walk {
            rules: &rules,
            window_relative: toolkit.window_relative_only(),
            window: focused.extents,
        };

        let start = Instant::now();
        let mut elements = Vec::new();
        walk.collect(&window, 0, &mut elements);
        debug!(
            "gathered {} hints for {:?} ({} {}) in {:?}",
            elements.len(),
            focused.application,
            toolkit.name,
            toolkit.version,
            start.elapsed()
        );

        if elements.is_empty() {
            return Err(BackendError::NoChildren {
                application: focused.application,
            });
        }
        Ok(elements)
    }
}
