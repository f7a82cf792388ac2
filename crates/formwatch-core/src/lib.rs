#![forbid(unsafe_code)]

//! Real-time validity feedback for a group of input fields.
//!
//! # Role
//! `formwatch-core` tracks per-field validity, folds it into a form state,
//! and decides *when* negative feedback may be shown so that fields the user
//! has not touched are never flagged. It does not own widgets: the host
//! implements [`FieldHandle`] and [`FormSurface`] and pushes events and time
//! into a [`Controller`].
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`validators`] | [`FieldValidator`] trait and the built-in validators |
//! | [`registry`] | name → validator table |
//! | [`field`] | per-field state and declared-type parsing |
//! | [`state`] | untouched/touched/valid/invalid state machine |
//! | [`scheduler`] | chord suppression, debounce and poll deadlines |
//! | [`event`] | key and field events, triggers, key map |
//! | [`controller`] | the controller |
//! | [`notify`] | notifications and listeners |
//! | [`collaborator`] | host-side traits |
//! | [`config`] | serde configuration |
//! | [`error`] | error types |

pub mod collaborator;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod field;
pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod validators;

pub use collaborator::{FieldHandle, FormSurface, SubmitEvent};
pub use config::{FormConfig, MarkerNames, TypeSource};
pub use controller::{Controller, SubmitOutcome};
pub use error::{ConfigError, Error, Result, UnknownValidatorError};
pub use event::{FieldEvent, KeyEvent, KeyEventKind, KeyMap, Trigger};
pub use field::{FieldId, FieldState};
pub use notify::{EventKind, FormEvent, ListenerId};
pub use registry::ValidatorRegistry;
pub use scheduler::{EventScheduler, KeyAction, TickOutcome};
pub use state::{FormState, FormStateMachine, Validity};
pub use validators::{FieldValidator, MatchResult};
