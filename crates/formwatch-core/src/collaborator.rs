#![forbid(unsafe_code)]

//! Host-side objects the controller drives.
//!
//! The controller never owns widgets. It reads values and flips markers
//! through these traits, and tells the host which events to route back in
//! through `subscribe`. The host then calls
//! [`Controller::handle_field_event`](crate::controller::Controller::handle_field_event)
//! and [`Controller::on_submit`](crate::controller::Controller::on_submit)
//! when those events occur.

use crate::event::Trigger;

/// One input field.
pub trait FieldHandle {
    /// Current value.
    fn value(&self) -> String;

    /// Replace the value (used for normalized values).
    fn set_value(&mut self, value: &str);

    /// Read a named attribute.
    fn attribute(&self, name: &str) -> Option<String>;

    fn has_marker(&self, marker: &str) -> bool;

    fn add_marker(&mut self, marker: &str);

    fn remove_marker(&mut self, marker: &str);

    /// Start routing events of this kind to the controller.
    fn subscribe(&mut self, trigger: &Trigger);

    /// Stop routing events of this kind.
    fn unsubscribe(&mut self, trigger: &Trigger);

    /// Whether the field is picked up by the selection rule.
    fn matches_selector(&self, _selector: &str) -> bool {
        true
    }
}

/// The container holding the fields.
pub trait FormSurface {
    fn add_marker(&mut self, marker: &str);

    fn remove_marker(&mut self, marker: &str);

    /// Start routing submit events to the controller.
    fn subscribe_submit(&mut self);

    fn unsubscribe_submit(&mut self);
}

/// A submit attempt, cancelable by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitEvent {
    cancelable: bool,
    cancelled: bool,
}

impl SubmitEvent {
    #[must_use]
    pub const fn new(cancelable: bool) -> Self {
        Self {
            cancelable,
            cancelled: false,
        }
    }

    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// Cancel the submit. Ignored when the event is not cancelable.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.cancelled = true;
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Default for SubmitEvent {
    fn default() -> Self {
        Self::new(true)
    }
}
