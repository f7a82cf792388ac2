#![forbid(unsafe_code)]

//! Input event types delivered to the controller.
//!
//! Keys are identified by canonical lower-case names (`"shift"`, `"tab"`,
//! `"a"`). Hosts that only see numeric key codes translate them through a
//! [`KeyMap`], which is owned by whoever needs it rather than being a
//! process-wide table.
//!
//! A [`Trigger`] names the kind of field event a listener reacts to. Triggers
//! parse from and print to short strings so they can live in JSON config:
//!
//! | string | trigger |
//! |---|---|
//! | `keyup` / `keydown` | any key release / press on the field |
//! | `keyup:filter-keys` | key release, skipping excluded keys |
//! | `change`, `blur`, `focus`, `input` | the matching field event |
//! | anything else | a host-defined custom event |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the tab key, which never triggers chord suppression.
pub const TAB_KEY: &str = "tab";

const FILTER_KEYS_MODIFIER: &str = "filter-keys";

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Whether a key went down or came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key pressed.
    #[default]
    Down,
    /// Key released.
    Up,
}

/// A keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Canonical lower-case key name.
    pub key: String,
    /// Press or release.
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Create a key event, normalizing the key name.
    #[must_use]
    pub fn new(key: impl AsRef<str>, kind: KeyEventKind) -> Self {
        Self {
            key: normalize_key_name(key.as_ref()),
            kind,
        }
    }

    /// A key press.
    #[must_use]
    pub fn down(key: impl AsRef<str>) -> Self {
        Self::new(key, KeyEventKind::Down)
    }

    /// A key release.
    #[must_use]
    pub fn up(key: impl AsRef<str>) -> Self {
        Self::new(key, KeyEventKind::Up)
    }

    /// Build an event from a raw key code, resolving the name through `keys`.
    ///
    /// Returns `None` when the code is neither in the map nor an ASCII
    /// letter or digit.
    #[must_use]
    pub fn from_code(code: u32, kind: KeyEventKind, keys: &KeyMap) -> Option<Self> {
        keys.name_for(code).map(|key| Self {
            key: key.into_owned(),
            kind,
        })
    }

    /// Check if this is the tab key.
    #[must_use]
    pub fn is_tab(&self) -> bool {
        self.key == TAB_KEY
    }
}

/// Lower-case a key name and trim surrounding whitespace.
#[must_use]
pub fn normalize_key_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Mapping between key names and numeric key codes.
///
/// The default table carries the usual navigation keys plus the modifier
/// keys used for chord suppression (`command`, `option`, `shift`,
/// `control`). Single ASCII letters and digits are always known and map to
/// their upper-case ASCII code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    codes: BTreeMap<String, u32>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let codes = [
            ("enter", 13),
            ("up", 38),
            ("down", 40),
            ("left", 37),
            ("right", 39),
            ("esc", 27),
            ("space", 32),
            ("backspace", 8),
            ("tab", 9),
            ("delete", 46),
            ("command", 91),
            ("option", 18),
            ("shift", 16),
            ("control", 17),
        ]
        .into_iter()
        .map(|(name, code)| (name.to_string(), code))
        .collect();
        Self { codes }
    }
}

impl KeyMap {
    /// An empty map (single letters and digits are still known).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            codes: BTreeMap::new(),
        }
    }

    /// Add or replace a named key.
    pub fn insert(&mut self, name: &str, code: u32) {
        self.codes.insert(normalize_key_name(name), code);
    }

    /// Extend the map with additional named keys.
    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = (&'a String, &'a u32)>) {
        for (name, code) in entries {
            self.insert(name, *code);
        }
    }

    /// Key code for a name.
    #[must_use]
    pub fn code(&self, name: &str) -> Option<u32> {
        let name = normalize_key_name(name);
        if let Some(code) = self.codes.get(&name) {
            return Some(*code);
        }
        single_ascii(&name).map(|c| c.to_ascii_uppercase() as u32)
    }

    /// Key name for a code. Named entries win over the ASCII fallback.
    #[must_use]
    pub fn name_for(&self, code: u32) -> Option<std::borrow::Cow<'_, str>> {
        if let Some((name, _)) = self.codes.iter().find(|(_, c)| **c == code) {
            return Some(std::borrow::Cow::Borrowed(name.as_str()));
        }
        char::from_u32(code)
            .filter(char::is_ascii_alphanumeric)
            .map(|c| std::borrow::Cow::Owned(c.to_ascii_lowercase().to_string()))
    }

    /// Whether the name resolves to a key.
    #[must_use]
    pub fn knows(&self, name: &str) -> bool {
        self.code(name).is_some()
    }

    /// Number of named entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether there are no named entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

fn single_ascii(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(c),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Field events and triggers
// ---------------------------------------------------------------------------

/// An event raised by a field collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEvent {
    /// A key went down or up while the field had focus.
    Key(KeyEvent),
    /// The committed value changed.
    Change,
    /// The field lost focus.
    Blur,
    /// The field gained focus.
    Focus,
    /// The value changed on any edit.
    Input,
    /// A host-defined event.
    Custom(String),
}

impl FieldEvent {
    /// The key event, if this is one.
    #[must_use]
    pub fn key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Check if this is a tab key event.
    #[must_use]
    pub fn is_tab(&self) -> bool {
        self.key().is_some_and(KeyEvent::is_tab)
    }
}

/// The kind of field event a listener is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Trigger {
    /// Key press or release.
    Key {
        /// Which edge of the key event.
        kind: KeyEventKind,
        /// Skip keys in the excluded key set.
        filter_keys: bool,
    },
    /// Committed value change.
    Change,
    /// Focus lost.
    Blur,
    /// Focus gained.
    Focus,
    /// Any edit.
    Input,
    /// Host-defined event name.
    Custom(String),
}

impl Trigger {
    /// Key release that skips excluded keys.
    pub const KEYUP_FILTERED: Self = Self::Key {
        kind: KeyEventKind::Up,
        filter_keys: true,
    };

    /// Whether the event is of this trigger's kind.
    ///
    /// The excluded-key filter is not applied here; the scheduler owns the
    /// excluded key set.
    #[must_use]
    pub fn matches(&self, event: &FieldEvent) -> bool {
        match (self, event) {
            (Self::Key { kind, .. }, FieldEvent::Key(key)) => key.kind == *kind,
            (Self::Change, FieldEvent::Change)
            | (Self::Blur, FieldEvent::Blur)
            | (Self::Focus, FieldEvent::Focus)
            | (Self::Input, FieldEvent::Input) => true,
            (Self::Custom(a), FieldEvent::Custom(b)) => a == b,
            _ => false,
        }
    }

    /// Whether excluded keys are skipped for this trigger.
    #[must_use]
    pub const fn filters_keys(&self) -> bool {
        matches!(
            self,
            Self::Key {
                filter_keys: true,
                ..
            }
        )
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { kind, filter_keys } => {
                let base = match kind {
                    KeyEventKind::Down => "keydown",
                    KeyEventKind::Up => "keyup",
                };
                if *filter_keys {
                    write!(f, "{base}:{FILTER_KEYS_MODIFIER}")
                } else {
                    f.write_str(base)
                }
            }
            Self::Change => f.write_str("change"),
            Self::Blur => f.write_str("blur"),
            Self::Focus => f.write_str("focus"),
            Self::Input => f.write_str("input"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

impl FromStr for Trigger {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidTrigger {
                value: s.to_string(),
                reason: "empty trigger name",
            });
        }
        let (base, modifier) = match trimmed.split_once(':') {
            Some((base, modifier)) => (base, Some(modifier)),
            None => (trimmed, None),
        };
        let key_kind = match base.to_ascii_lowercase().as_str() {
            "keyup" => Some(KeyEventKind::Up),
            "keydown" => Some(KeyEventKind::Down),
            _ => None,
        };
        match (key_kind, modifier) {
            (Some(kind), None) => Ok(Self::Key {
                kind,
                filter_keys: false,
            }),
            (Some(kind), Some(FILTER_KEYS_MODIFIER)) => Ok(Self::Key {
                kind,
                filter_keys: true,
            }),
            (_, Some(_)) => Err(ConfigError::InvalidTrigger {
                value: s.to_string(),
                reason: "only key triggers accept the ':filter-keys' modifier",
            }),
            (None, None) => Ok(match base.to_ascii_lowercase().as_str() {
                "change" => Self::Change,
                "blur" => Self::Blur,
                "focus" => Self::Focus,
                "input" => Self::Input,
                _ => Self::Custom(base.to_string()),
            }),
        }
    }
}

impl TryFrom<String> for Trigger {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Trigger> for String {
    fn from(trigger: Trigger) -> Self {
        trigger.to_string()
    }
}
