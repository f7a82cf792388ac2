#![forbid(unsafe_code)]

//! Controller configuration.
//!
//! [`FormConfig`] is plain data with serde support so hosts can ship it as
//! JSON. Every field has a default, and missing keys fall back to them:
//!
//! ```rust
//! use formwatch_core::config::FormConfig;
//!
//! let config = FormConfig::from_json(r#"{ "alert_unedited": false, "check_periodical_ms": 0 }"#)
//!     .unwrap();
//! assert!(!config.alert_unedited);
//! assert!(config.poll_interval().is_none());
//! assert_eq!(config.markers.invalid, "invalid");
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event::{KeyMap, Trigger, normalize_key_name};
use crate::scheduler::{DEBOUNCE_DELAY, SchedulerConfig};

/// Default poll interval in milliseconds.
pub const DEFAULT_CHECK_PERIODICAL_MS: u64 = 1000;

/// Presentation marker names applied to fields and the form surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerNames {
    /// Field or form is valid.
    pub valid: String,
    /// Field or form is invalid.
    pub invalid: String,
    /// Field is excluded from the aggregate.
    pub optional: String,
    /// Form has been touched.
    pub touched: String,
    /// Form has not been touched yet.
    pub untouched: String,
}

impl Default for MarkerNames {
    fn default() -> Self {
        Self {
            valid: "valid".into(),
            invalid: "invalid".into(),
            optional: "optional".into(),
            touched: "touched".into(),
            untouched: "untouched".into(),
        }
    }
}

/// Where a field's declared validator types come from.
///
/// With a `prefix`, the attribute is read as a whitespace-separated token
/// list and only tokens carrying the prefix count (`"wide validate-email"` →
/// `["email"]`). Without one, every whitespace- or comma-separated token is a
/// validator type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeSource {
    /// Attribute name passed to [`FieldHandle::attribute`](crate::collaborator::FieldHandle::attribute).
    pub attribute: String,
    /// Token prefix, stripped from matching tokens.
    pub prefix: Option<String>,
}

impl Default for TypeSource {
    fn default() -> Self {
        Self {
            attribute: "class".into(),
            prefix: Some("validate-".into()),
        }
    }
}

/// Full controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Attach at construction.
    pub active: bool,
    /// Hook the form's submit event.
    pub validate_on_submit: bool,
    /// Run a full validation pass at construction (only when attached).
    pub initial_validation: bool,
    /// Surface negative feedback on fields the user has not edited.
    pub alert_unedited: bool,
    /// Selection rule handed to [`FieldHandle::matches_selector`](crate::collaborator::FieldHandle::matches_selector).
    pub input_selector: String,
    /// Marker names.
    pub markers: MarkerNames,
    /// Source of declared validator types.
    pub type_source: TypeSource,
    /// Event that surfaces feedback.
    pub alert_event: Trigger,
    /// Event that validates and marks the field touched.
    pub validate_event: Trigger,
    /// Event attached after a field's first negative feedback.
    pub correction_event: Trigger,
    /// Poll interval in milliseconds; `0` disables polling.
    pub check_periodical_ms: u64,
    /// Keys that suspend validation while held (`tab` only filters).
    pub no_validate_keys: Vec<String>,
    /// Named keys added to the default key map.
    pub extra_keys: BTreeMap<String, u32>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            active: true,
            validate_on_submit: true,
            initial_validation: true,
            alert_unedited: true,
            input_selector: "input".into(),
            markers: MarkerNames::default(),
            type_source: TypeSource::default(),
            alert_event: Trigger::Blur,
            validate_event: Trigger::KEYUP_FILTERED,
            correction_event: Trigger::KEYUP_FILTERED,
            check_periodical_ms: DEFAULT_CHECK_PERIODICAL_MS,
            no_validate_keys: [
                "left", "right", "up", "down", "esc", "tab", "command", "option", "shift",
                "control",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            extra_keys: BTreeMap::new(),
        }
    }
}

impl FormConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the JSON is malformed, a trigger string is
    /// invalid, or an excluded key is unknown.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] for an excluded key missing from
    /// the key map.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let keys = self.key_map();
        for name in &self.no_validate_keys {
            if !keys.knows(name) {
                return Err(ConfigError::UnknownKey(name.clone()));
            }
        }
        Ok(())
    }

    /// The default key map plus `extra_keys`.
    #[must_use]
    pub fn key_map(&self) -> KeyMap {
        let mut keys = KeyMap::default();
        keys.extend(&self.extra_keys);
        keys
    }

    /// Poll interval, `None` when disabled.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.check_periodical_ms > 0).then(|| Duration::from_millis(self.check_periodical_ms))
    }

    /// Scheduler settings derived from this config.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            debounce: DEBOUNCE_DELAY,
            poll_interval: self.poll_interval(),
            excluded_keys: self
                .no_validate_keys
                .iter()
                .map(|k| normalize_key_name(k))
                .collect::<BTreeSet<_>>(),
        }
    }
}
