//! Configuration names for AT-SPI roles and states.
//!
//! Match rules refer to roles and states in upper snake case derived from
//! the `atspi` variant names: `PushButton` is `PUSH_BUTTON`, `ReadOnly` is
//! `READ_ONLY`.  Lookup is case-insensitive.

use ::atspi::{Role, State, StateSet};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Error for a role or state name `atspi` does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown AT-SPI {kind} {name:?}")]
pub struct UnknownName {
    kind: &'static str,
    name: String,
}

/// A role or state that can be written in a config file.
pub trait ConfigName: Copy + Sized {
    const KIND: &'static str;

    /// Every value, in protocol order.
    fn all() -> Vec<Self>;

    fn config_name(self) -> String;

    fn from_config_name(name: &str) -> Result<Self, UnknownName> {
        let upper = name.to_ascii_uppercase();
        Self::all()
            .into_iter()
            .find(|v| v.config_name() == upper)
            .ok_or_else(|| UnknownName {
                kind: Self::KIND,
                name: name.to_string(),
            })
    }
}

impl ConfigName for Role {
    const KIND: &'static str = "role";

    fn all() -> Vec<Self> {
        (0u32..).map_while(|n| Role::try_from(n).ok()).collect()
    }

    fn config_name(self) -> String {
        upper_snake(&format!("{:?}", self))
    }
}

impl ConfigName for State {
    const KIND: &'static str = "state";

    fn all() -> Vec<Self> {
        (0..64)
            .filter_map(|bit| StateSet::from_bits(1u64 << bit).ok())
            .filter_map(|set| set.iter().next())
            .collect()
    }

    fn config_name(self) -> String {
        upper_snake(&format!("{:?}", self))
    }
}

/// `CamelCase` to `UPPER_SNAKE`, keeping acronyms together
/// (`HTMLContainer` is `HTML_CONTAINER`).
fn upper_snake(camel: &str) -> String {
    let chars: Vec<char> = camel.chars().collect();
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

/// A state set holding exactly `states`.
pub fn state_set(states: impl IntoIterator<Item = State>) -> StateSet {
    let mut set = StateSet::empty();
    for state in states {
        set.insert(state);
    }
    set
}

//  Serde adapters for `#[serde(with = ...)]`

#[allow(clippy::ptr_arg)]
pub fn serialize<S: Serializer, T: ConfigName>(items: &Vec<T>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(items.iter().map(|i| i.config_name()))
}

pub fn deserialize<'de, D: Deserializer<'de>, T: ConfigName>(deserializer: D) -> Result<Vec<T>, D::Error> {
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|n| T::from_config_name(n).map_err(D::Error::custom))
        .collect()
}

/// The same for optional lists.
pub mod optional {
    use super::ConfigName;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, T: ConfigName>(
        items: &Option<Vec<T>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match items {
            Some(items) => super::serialize(items, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T: ConfigName>(
        deserializer: D,
    ) -> Result<Option<Vec<T>>, D::Error> {
        match Option::<Vec<String>>::deserialize(deserializer)? {
            Some(names) => names
                .iter()
                .map(|n| T::from_config_name(n).map_err(D::Error::custom))
                .collect::<Result<Vec<T>, D::Error>>()
                .map(Some),
            None => Ok(None),
        }
    }
}
