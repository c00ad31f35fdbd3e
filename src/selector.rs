//! Keystroke handling for the hint overlay.
//!
//! [`HintSelector`] is the toolkit-independent part of the overlay: it
//! receives already-decoded key presses, narrows the visible hints and
//! produces a [`MouseAction`] once a single hint is left.  The GTK overlay
//! only translates its key events into [`KeyInput`] and redraws.

use crate::action::{ActionKind, MouseAction, MouseButton};
use crate::hints::HintMap;
use serde::{Deserialize, Serialize};

/// A modifier that can be bound to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Control,
    Alt,
    Super,
}

/// Key bindings of the hint overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Key name (as understood by the toolkit) that closes the overlay.
    pub exit: String,
    /// Holding this while typing a hint hovers instead of clicking.
    pub hover_modifier: Modifier,
    /// Holding this while typing a hint presses and holds the button.
    pub grab_modifier: Modifier,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            exit: "Escape".to_string(),
            hover_modifier: Modifier::Control,
            grab_modifier: Modifier::Alt,
        }
    }
}

/// Modifiers held during a key press, excluding those consumed to produce
/// the character (Shift for upper-case letters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub control: bool,
    pub alt: bool,
    pub super_key: bool,
}

impl Modifiers {
    /// `true` when exactly `modifier` is held.
    pub fn is_only(&self, modifier: Modifier) -> bool {
        let wanted = match modifier {
            Modifier::Control => Modifiers {
                control: true,
                ..Modifiers::default()
            },
            Modifier::Alt => Modifiers {
                alt: true,
                ..Modifiers::default()
            },
            Modifier::Super => Modifiers {
                super_key: true,
                ..Modifiers::default()
            },
        };
        *self == wanted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// The configured exit key.
    Exit,
    /// A printable key, lower-cased; `shifted` when the typed character
    /// was upper-case.
    Char { ch: char, shifted: bool },
    /// Anything else (bare modifiers, function keys).
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn char(ch: char) -> Self {
        let lower = ch.to_lowercase().next().unwrap_or(ch);
        Self {
            key: Key::Char {
                ch: lower,
                shifted: lower != ch,
            },
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Result of feeding one key to the selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    /// Keep the overlay open.
    Pending,
    /// The user closed the overlay.
    Cancelled,
    /// A single hint is left.
    Selected(MouseAction),
}

/// Owns its copy of the hints so it can live inside toolkit callbacks.
pub struct HintSelector {
    hints: HintMap,
    keys: KeysConfig,
    typed: String,
    action: ActionKind,
    button: MouseButton,
    repeat: Option<u32>,
}

impl HintSelector {
    pub fn new(hints: HintMap, keys: KeysConfig) -> Self {
        Self {
            hints,
            keys,
            typed: String::new(),
            action: ActionKind::Click,
            button: MouseButton::Left,
            repeat: None,
        }
    }

    /// Prefix typed so far.
    pub fn typed(&self) -> &str {
        &self.typed
    }

    /// Hints still matching the typed prefix.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &crate::types::ActionableElement)> + '_ {
        self.hints.with_prefix(&self.typed)
    }

    pub fn handle(&mut self, input: KeyInput) -> Selection {
        if input.key == Key::Exit {
            return Selection::Cancelled;
        }
        if input.modifiers.is_only(self.keys.hover_modifier) {
            self.action = ActionKind::Hover;
        }
        if input.modifiers.is_only(self.keys.grab_modifier) {
            self.action = ActionKind::Grab;
        }

        let Key::Char { ch, shifted } = input.key else {
            return Selection::Pending;
        };
        if shifted {
            self.action = ActionKind::Click;
            self.button = MouseButton::Right;
        }
        if let Some(digit) = ch.to_digit(10) {
            self.repeat = Some(self.repeat.unwrap_or(0).saturating_mul(10).saturating_add(digit));
        }

        let mut candidate = self.typed.clone();
        candidate.push(ch);
        if self.hints.has_prefix(&candidate) {
            self.typed = candidate;
        }

        if self.typed.is_empty() {
            return Selection::Pending;
        }
        let mut visible = self.visible();
        match (visible.next(), visible.next()) {
            (Some((_, element)), None) => {
                let (x, y) = element.absolute_position;
                Selection::Selected(MouseAction {
                    action: self.action,
                    x,
                    y,
                    button: self.button,
                    repeat: self.repeat.unwrap_or(1),
                })
            }
            _ => Selection::Pending,
        }
    }
}
