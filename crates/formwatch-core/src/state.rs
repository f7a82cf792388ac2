#![forbid(unsafe_code)]

//! Aggregate form state.
//!
//! The visible state starts at [`FormState::Untouched`] and stays there,
//! whatever the fields report, until the first edit. After that it follows
//! the aggregate validity. The raw aggregate is tracked separately and is
//! always current.
//!
//! ```text
//!   Untouched ──mark_touched──▶ Touched ──check_valid──▶ Valid ◀──▶ Invalid
//! ```

use std::fmt;

use tracing::debug;

/// Visible form state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormState {
    /// No field has been edited yet.
    #[default]
    Untouched,
    /// Edited, not yet re-checked.
    Touched,
    /// Every required field passes.
    Valid,
    /// At least one required field fails.
    Invalid,
}

impl FormState {
    /// Lower-case name, also used as the default marker name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Untouched => "untouched",
            Self::Touched => "touched",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw aggregate validity, independent of the touched gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Validity {
    /// No pass has run yet.
    #[default]
    Unchecked,
    /// Every required field passed on the last check.
    Valid,
    /// Some required field failed on the last check.
    Invalid,
}

impl Validity {
    fn from_bool(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalid }
    }
}

/// Tracks the visible state and the raw aggregate.
#[derive(Debug, Clone, Default)]
pub struct FormStateMachine {
    state: FormState,
    aggregate: Validity,
}

impl FormStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `Untouched`. Returns the new state when it changed.
    pub fn mark_touched(&mut self) -> Option<FormState> {
        if self.state != FormState::Untouched {
            return None;
        }
        self.state = FormState::Touched;
        debug!(state = %self.state, "form touched");
        Some(self.state)
    }

    /// Record the aggregate and, once touched, move to `Valid`/`Invalid`.
    ///
    /// Returns the new visible state only when it changed.
    pub fn check_valid(&mut self, all_valid: bool) -> Option<FormState> {
        self.aggregate = Validity::from_bool(all_valid);
        if self.state == FormState::Untouched {
            return None;
        }
        let next = if all_valid {
            FormState::Valid
        } else {
            FormState::Invalid
        };
        if next == self.state {
            return None;
        }
        debug!(from = %self.state, to = %next, "form state changed");
        self.state = next;
        Some(next)
    }

    /// Visible state.
    #[must_use]
    pub fn state(&self) -> FormState {
        self.state
    }

    /// Raw aggregate from the last check.
    #[must_use]
    pub fn aggregate(&self) -> Validity {
        self.aggregate
    }
}
