#![forbid(unsafe_code)]

//! Name → validator lookup table.

use std::collections::HashMap;
use std::fmt;

use crate::error::UnknownValidatorError;
use crate::validators::{
    Alpha, Alphanumeric, Email, FieldValidator, FnValidator, MatchResult, Name, Numeric, Text,
    Url, UsState, VALIDATOR_ALPHA, VALIDATOR_ALPHANUMERIC, VALIDATOR_EMAIL, VALIDATOR_NAME,
    VALIDATOR_NUMERIC, VALIDATOR_STATE, VALIDATOR_TEXT, VALIDATOR_URL, VALIDATOR_ZIPCODE, Zipcode,
};

/// Maps validator type names to validators.
///
/// Registering an existing name replaces the previous validator.
///
/// # Example
///
/// ```rust
/// use formwatch_core::registry::ValidatorRegistry;
///
/// let mut registry = ValidatorRegistry::with_builtins();
/// registry.register_fn("even-length", |value| value.len() % 2 == 0);
///
/// assert!(registry.resolve("email").is_ok());
/// assert!(registry.resolve("even-length").unwrap().test("ab").is_some());
/// assert!(registry.resolve("phone").is_err());
/// ```
pub struct ValidatorRegistry {
    validators: HashMap<String, Box<dyn FieldValidator>>,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ValidatorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// A registry preloaded with the built-in validators.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(VALIDATOR_TEXT, Text)
            .register(VALIDATOR_EMAIL, Email)
            .register(VALIDATOR_NAME, Name)
            .register(VALIDATOR_URL, Url)
            .register(VALIDATOR_ALPHA, Alpha)
            .register(VALIDATOR_ALPHANUMERIC, Alphanumeric)
            .register(VALIDATOR_NUMERIC, Numeric)
            .register(VALIDATOR_ZIPCODE, Zipcode)
            .register(VALIDATOR_STATE, UsState);
        registry
    }

    /// Register a validator under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        validator: impl FieldValidator + 'static,
    ) -> &mut Self {
        self.validators.insert(name.into(), Box::new(validator));
        self
    }

    /// Register a boolean predicate under `name`.
    pub fn register_fn<T>(&mut self, name: impl Into<String>, test: T) -> &mut Self
    where
        T: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.register(name, FnValidator::predicate(test))
    }

    /// Register a matcher with a normalization step.
    pub fn register_with_post_match<T, P>(
        &mut self,
        name: impl Into<String>,
        test: T,
        post_match: P,
    ) -> &mut Self
    where
        T: Fn(&str) -> Option<MatchResult> + Send + Sync + 'static,
        P: Fn(&MatchResult, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.register(name, FnValidator::matcher(test).with_post_match(post_match))
    }

    /// Look up a validator.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownValidatorError`] when nothing is registered under
    /// `name`.
    pub fn resolve(&self, name: &str) -> Result<&dyn FieldValidator, UnknownValidatorError> {
        self.validators
            .get(name)
            .map(|v| v.as_ref())
            .ok_or_else(|| UnknownValidatorError::new(name))
    }

    /// Remove a validator, returning whether it existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.validators.remove(name).is_some()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.names())
            .finish()
    }
}
