#![forbid(unsafe_code)]

//! Error types.
//!
//! Validation failures are not errors: a failing validator only lands in the
//! field's error set. The types here cover configuration and programmer
//! mistakes, which must surface instead of being read as "valid".

use std::fmt;

use crate::field::FieldId;

/// A field declared a validator type that is not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValidatorError {
    /// The validator type name that failed to resolve.
    pub name: String,
}

impl UnknownValidatorError {
    /// Create an error for the given validator name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for UnknownValidatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown validator type '{}'", self.name)
    }
}

impl std::error::Error for UnknownValidatorError {}

/// A configuration value could not be used.
#[derive(Debug)]
pub enum ConfigError {
    /// The JSON document did not parse or did not match the schema.
    Json(serde_json::Error),
    /// A trigger string was empty or carried an unsupported modifier.
    InvalidTrigger {
        /// The offending trigger string.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// A key name in the excluded key set is not in the key map.
    UnknownKey(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid config JSON: {e}"),
            Self::InvalidTrigger { value, reason } => {
                write!(f, "invalid trigger '{value}': {reason}")
            }
            Self::UnknownKey(name) => write!(f, "unknown key name '{name}'"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Top-level error for controller operations.
#[derive(Debug)]
pub enum Error {
    /// A declared validator type could not be resolved.
    UnknownValidator(UnknownValidatorError),
    /// The configuration was rejected.
    Config(ConfigError),
    /// A field id that does not belong to this controller.
    UnknownField(FieldId),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownValidator(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::UnknownField(id) => write!(f, "no field with id {id}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnknownValidator(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::UnknownField(_) => None,
        }
    }
}

impl From<UnknownValidatorError> for Error {
    fn from(e: UnknownValidatorError) -> Self {
        Self::UnknownValidator(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Result alias for controller operations.
pub type Result<T> = std::result::Result<T, Error>;
