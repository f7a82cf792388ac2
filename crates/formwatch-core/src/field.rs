#![forbid(unsafe_code)]

//! Per-field validation record.

use std::collections::BTreeSet;
use std::fmt;

use tracing::trace;

use crate::config::TypeSource;
use crate::error::UnknownValidatorError;
use crate::registry::ValidatorRegistry;
use crate::validators::VALIDATOR_TEXT;

/// Index of a field inside its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(usize);

impl FieldId {
    /// Wrap a raw index.
    #[must_use]
    pub const fn from_raw(index: usize) -> Self {
        Self(index)
    }

    /// The raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one validation pass over a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPass {
    /// Whether every declared validator passed.
    pub is_valid: bool,
    /// Value produced by a validator's normalization step, if any.
    pub normalized: Option<String>,
}

/// Validation state of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    id: FieldId,
    validator_types: Vec<String>,
    is_valid: bool,
    errors: BTreeSet<String>,
    touched: bool,
    watching_correction: bool,
    previous_value: String,
    optional: bool,
}

impl FieldState {
    /// Create a record. An empty type list means `["text"]`.
    #[must_use]
    pub fn new(id: FieldId, validator_types: Vec<String>, optional: bool) -> Self {
        let validator_types = if validator_types.is_empty() {
            vec![VALIDATOR_TEXT.to_string()]
        } else {
            validator_types
        };
        Self {
            id,
            validator_types,
            is_valid: false,
            errors: BTreeSet::new(),
            touched: false,
            watching_correction: false,
            previous_value: String::new(),
            optional,
        }
    }

    /// Run every declared validator against `value`.
    ///
    /// No short-circuit: every validator runs so `errors` ends up holding
    /// the complete failure set. When a validator normalizes the value,
    /// later validators see the normalized value.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownValidatorError`] when a declared type is not
    /// registered. The pass stops there and the field is left invalid.
    pub fn run_validators(
        &mut self,
        value: &str,
        registry: &ValidatorRegistry,
    ) -> Result<ValidationPass, UnknownValidatorError> {
        self.errors.clear();
        self.is_valid = true;

        let mut current = value.to_string();
        let mut normalized = None;

        for name in &self.validator_types {
            let validator = match registry.resolve(name) {
                Ok(v) => v,
                Err(e) => {
                    self.is_valid = false;
                    return Err(e);
                }
            };
            match validator.test(&current) {
                Some(matched) => {
                    trace!(field = %self.id, validator = %name, "validator passed");
                    if let Some(next) = validator.post_match(&matched, &current)
                        && next != current
                    {
                        current = next.clone();
                        normalized = Some(next);
                    }
                }
                None => {
                    trace!(field = %self.id, validator = %name, "validator failed");
                    self.errors.insert(name.clone());
                    self.is_valid = false;
                }
            }
        }

        Ok(ValidationPass {
            is_valid: self.is_valid,
            normalized,
        })
    }

    /// Mark the correction listener as attached.
    ///
    /// Returns `true` only the first time, when the caller must subscribe.
    pub fn ensure_correction_listener(&mut self) -> bool {
        !std::mem::replace(&mut self.watching_correction, true)
    }

    /// Forget the correction listener (on detach).
    pub fn reset_correction_listener(&mut self) {
        self.watching_correction = false;
    }

    /// Mark as edited by the user.
    pub fn mark_touched(&mut self) {
        self.touched = true;
    }

    /// Store the live value, returning whether it differed from the last
    /// stored one.
    pub fn record_value(&mut self, current: &str) -> bool {
        if self.previous_value == current {
            return false;
        }
        self.previous_value = current.to_string();
        true
    }

    #[must_use]
    pub fn id(&self) -> FieldId {
        self.id
    }

    #[must_use]
    pub fn validator_types(&self) -> &[String] {
        &self.validator_types
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Names of the validators that failed on the last pass.
    #[must_use]
    pub fn errors(&self) -> &BTreeSet<String> {
        &self.errors
    }

    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    #[must_use]
    pub fn is_watching_correction(&self) -> bool {
        self.watching_correction
    }

    #[must_use]
    pub fn previous_value(&self) -> &str {
        &self.previous_value
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Parse the declared validator types out of an attribute value.
///
/// With a prefix, only whitespace-separated tokens carrying it count and the
/// prefix is stripped. Without one, tokens split on whitespace or commas.
/// Falls back to `["text"]` when nothing is declared.
#[must_use]
pub fn declared_validator_types(raw: Option<&str>, source: &TypeSource) -> Vec<String> {
    let raw = raw.unwrap_or_default();
    let types: Vec<String> = match source.prefix.as_deref() {
        Some(prefix) => raw
            .split_whitespace()
            .filter_map(|token| token.strip_prefix(prefix))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        None => raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    };
    if types.is_empty() {
        vec![VALIDATOR_TEXT.to_string()]
    } else {
        types
    }
}
