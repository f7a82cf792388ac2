#![forbid(unsafe_code)]

//! Notifications emitted by the controller.

use std::collections::BTreeSet;
use std::fmt;

use crate::field::FieldId;
use crate::state::FormState;

/// Notification category, used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Untouched,
    Touched,
    Valid,
    Invalid,
    InputValid,
    InputInvalid,
    ValidSubmit,
    InvalidSubmit,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Untouched,
        Self::Touched,
        Self::Valid,
        Self::Invalid,
        Self::InputValid,
        Self::InputInvalid,
        Self::ValidSubmit,
        Self::InvalidSubmit,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Untouched => "untouched",
            Self::Touched => "touched",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::InputValid => "input-valid",
            Self::InputInvalid => "input-invalid",
            Self::ValidSubmit => "valid-submit",
            Self::InvalidSubmit => "invalid-submit",
        }
    }
}

impl From<FormState> for EventKind {
    fn from(state: FormState) -> Self {
        match state {
            FormState::Untouched => Self::Untouched,
            FormState::Touched => Self::Touched,
            FormState::Valid => Self::Valid,
            FormState::Invalid => Self::Invalid,
        }
    }
}

/// A notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormEvent {
    /// The visible form state changed.
    StateEntered(FormState),
    /// Positive feedback surfaced on a field.
    InputValid {
        field: FieldId,
    },
    /// Negative feedback surfaced on a field.
    InputInvalid {
        field: FieldId,
        /// Names of the failing validators.
        errors: BTreeSet<String>,
    },
    /// A submit passed validation.
    ValidSubmit,
    /// A submit failed validation.
    InvalidSubmit {
        /// Whether the submit was cancelled.
        cancelled: bool,
    },
}

impl FormEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StateEntered(state) => (*state).into(),
            Self::InputValid { .. } => EventKind::InputValid,
            Self::InputInvalid { .. } => EventKind::InputInvalid,
            Self::ValidSubmit => EventKind::ValidSubmit,
            Self::InvalidSubmit { .. } => EventKind::InvalidSubmit,
        }
    }
}

impl fmt::Display for FormEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateEntered(state) => write!(f, "state {state}"),
            Self::InputValid { field } => write!(f, "input-valid field={field}"),
            Self::InputInvalid { field, errors } => {
                write!(f, "input-invalid field={field} errors=[")?;
                for (i, name) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    f.write_str(name)?;
                }
                f.write_str("]")
            }
            Self::ValidSubmit => f.write_str("valid-submit"),
            Self::InvalidSubmit { cancelled } => {
                write!(f, "invalid-submit cancelled={cancelled}")
            }
        }
    }
}

/// Handle returned by [`Notifier::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Handler = Box<dyn FnMut(&FormEvent)>;

/// Listener table keyed by [`EventKind`].
///
/// Listeners run in registration order.
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<(ListenerId, EventKind, Handler)>,
    next_id: u64,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one kind.
    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&FormEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, Box::new(handler)));
        id
    }

    /// Remove a listener, returning whether it existed.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _, _)| *lid != id);
        self.listeners.len() < before
    }

    /// Deliver an event to every listener of its kind.
    pub fn emit(&mut self, event: &FormEvent) {
        let kind = event.kind();
        for (_, _, handler) in self.listeners.iter_mut().filter(|(_, k, _)| *k == kind) {
            handler(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
