#![forbid(unsafe_code)]

//! The form controller.
//!
//! A [`Controller`] owns one [`FieldState`] per field handle, the validator
//! registry, the [`EventScheduler`] and the [`FormStateMachine`]. The host
//! pushes events in:
//!
//! - field events through [`Controller::handle_field_event`],
//! - document-level key events through [`Controller::handle_key`],
//! - submit attempts through [`Controller::on_submit`],
//! - time through [`Controller::tick`].
//!
//! Feedback goes out through markers on the collaborators and through
//! [`FormEvent`] notifications.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut controller = Controller::new(FormConfig::default(), form, fields)?;
//! controller.on(EventKind::InputInvalid, |ev| println!("{ev}"));
//! controller.handle_field_event(FieldId::from_raw(0), &FieldEvent::Key(KeyEvent::up("a")))?;
//! controller.tick(Instant::now())?;
//! ```

use std::fmt;

use tracing::{debug, debug_span, error, info};
use web_time::Instant;

use crate::collaborator::{FieldHandle, FormSurface, SubmitEvent};
use crate::config::FormConfig;
use crate::error::{Error, Result};
use crate::event::{FieldEvent, KeyEvent, KeyMap, Trigger};
use crate::field::{FieldId, FieldState, declared_validator_types};
use crate::notify::{EventKind, FormEvent, ListenerId, Notifier};
use crate::registry::ValidatorRegistry;
use crate::scheduler::{EventScheduler, KeyAction, TickOutcome};
use crate::state::{FormState, FormStateMachine, Validity};

/// Result of [`Controller::on_submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Every required field passed.
    Valid,
    /// Some required field failed.
    Invalid {
        /// Whether the submit event was cancelled.
        cancelled: bool,
    },
    /// The controller is detached or does not validate on submit.
    Ignored,
}

struct Slot<F> {
    handle: F,
    state: FieldState,
}

/// Validation controller for one form.
pub struct Controller<F: FieldHandle, S: FormSurface> {
    config: FormConfig,
    registry: ValidatorRegistry,
    scheduler: EventScheduler,
    machine: FormStateMachine,
    notifier: Notifier,
    surface: S,
    slots: Vec<Slot<F>>,
    attached: bool,
    alert_unedited: bool,
}

impl<F: FieldHandle, S: FormSurface> Controller<F, S> {
    /// Build a controller with the built-in validators.
    ///
    /// # Errors
    ///
    /// Fails on an invalid config, or when the initial validation pass hits
    /// an unknown validator type.
    pub fn new(config: FormConfig, surface: S, fields: impl IntoIterator<Item = F>) -> Result<Self> {
        Self::with_registry(config, ValidatorRegistry::with_builtins(), surface, fields)
    }

    /// Build a controller with a custom registry.
    ///
    /// Candidate fields are filtered through the selection rule. Declared
    /// validator types are read once here. The controller attaches when
    /// `active` is set and, if attached, runs the initial validation pass.
    ///
    /// # Errors
    ///
    /// See [`Controller::new`].
    pub fn with_registry(
        config: FormConfig,
        registry: ValidatorRegistry,
        mut surface: S,
        fields: impl IntoIterator<Item = F>,
    ) -> Result<Self> {
        config.validate()?;

        let slots: Vec<Slot<F>> = fields
            .into_iter()
            .filter(|handle| handle.matches_selector(&config.input_selector))
            .enumerate()
            .map(|(index, handle)| {
                let declared = handle.attribute(&config.type_source.attribute);
                let types = declared_validator_types(declared.as_deref(), &config.type_source);
                let optional = handle.has_marker(&config.markers.optional);
                Slot {
                    state: FieldState::new(FieldId::from_raw(index), types, optional),
                    handle,
                }
            })
            .collect();

        surface.add_marker(&config.markers.untouched);

        let scheduler = EventScheduler::new(config.scheduler_config(), config.key_map());
        let mut controller = Self {
            alert_unedited: config.alert_unedited,
            config,
            registry,
            scheduler,
            machine: FormStateMachine::new(),
            notifier: Notifier::new(),
            surface,
            slots,
            attached: false,
        };
        debug!(fields = controller.slots.len(), "controller created");

        if controller.config.active {
            controller.attach();
            if controller.config.initial_validation {
                controller.validate_all_inputs()?;
            }
        }
        Ok(controller)
    }

    // -----------------------------------------------------------------------
    // Attachment
    // -----------------------------------------------------------------------

    /// Subscribe to every field trigger and start the poll, timed from the
    /// current instant. Idempotent.
    pub fn attach(&mut self) -> &mut Self {
        self.attach_at(Instant::now())
    }

    /// [`attach`](Self::attach) with an explicit start time; the first poll
    /// is due one interval after `now`.
    pub fn attach_at(&mut self, now: Instant) -> &mut Self {
        if self.attached {
            return self;
        }
        self.attached = true;
        let triggers = self.field_triggers();
        for slot in &mut self.slots {
            for trigger in &triggers {
                slot.handle.subscribe(trigger);
            }
            let value = slot.handle.value();
            slot.state.record_value(&value);
        }
        if self.config.validate_on_submit {
            self.surface.subscribe_submit();
        }
        self.scheduler.start_poll(now);
        info!(fields = self.slots.len(), "controller attached");
        self
    }

    /// Undo [`attach`](Self::attach), including correction listeners and
    /// pending timers. Idempotent.
    pub fn detach(&mut self) -> &mut Self {
        if !self.attached {
            return self;
        }
        self.attached = false;
        let triggers = self.field_triggers();
        for slot in &mut self.slots {
            for trigger in &triggers {
                slot.handle.unsubscribe(trigger);
            }
            if slot.state.is_watching_correction() {
                slot.handle.unsubscribe(&self.config.correction_event);
            }
            slot.state.reset_correction_listener();
        }
        if self.config.validate_on_submit {
            self.surface.unsubscribe_submit();
        }
        self.scheduler.stop();
        info!("controller detached");
        self
    }

    /// Alias for [`attach`](Self::attach).
    pub fn activate(&mut self) -> &mut Self {
        self.attach()
    }

    /// Alias for [`detach`](Self::detach).
    pub fn deactivate(&mut self) -> &mut Self {
        self.detach()
    }

    fn field_triggers(&self) -> Vec<Trigger> {
        let mut triggers: Vec<Trigger> = Vec::with_capacity(3);
        for trigger in [
            &self.config.validate_event,
            &Trigger::Change,
            &self.config.alert_event,
        ] {
            if !triggers.contains(trigger) {
                triggers.push(trigger.clone());
            }
        }
        triggers
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validate one field and re-check the form.
    ///
    /// Returns the field's validity. While inactive nothing changes and the
    /// last known validity is returned.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownField`] for a foreign id, [`Error::UnknownValidator`]
    /// when a declared type is not registered.
    pub fn validate_field(&mut self, id: FieldId) -> Result<bool> {
        let idx = self.index(id)?;
        if !self.is_active() {
            return Ok(self.slots[idx].state.is_valid());
        }
        let _span = debug_span!("validate_field", field = %id).entered();

        let value = self.slots[idx].handle.value();
        let pass = match self.slots[idx].state.run_validators(&value, &self.registry) {
            Ok(pass) => pass,
            Err(e) => {
                error!(field = %id, validator = %e.name, "unknown validator type");
                return Err(e.into());
            }
        };

        if let Some(normalized) = &pass.normalized {
            let slot = &mut self.slots[idx];
            slot.handle.set_value(normalized);
            slot.state.record_value(normalized);
            debug!(field = %id, "value normalized");
        }

        if pass.is_valid {
            self.alert_input_validity(id)?;
        }
        self.check_valid();
        Ok(pass.is_valid)
    }

    /// Validate every field in order.
    ///
    /// Returns the raw aggregate: whether every required field is valid. This
    /// can be `true` while [`state`](Self::state) is still `Untouched`.
    ///
    /// # Errors
    ///
    /// See [`validate_field`](Self::validate_field).
    pub fn validate_all_inputs(&mut self) -> Result<bool> {
        for idx in 0..self.slots.len() {
            self.validate_field(FieldId::from_raw(idx))?;
        }
        if self.is_active() {
            self.check_valid();
        }
        Ok(self.all_required_valid())
    }

    /// Recompute the aggregate and update the form state.
    ///
    /// Returns the raw aggregate.
    pub fn check_valid(&mut self) -> bool {
        let all_valid = self.all_required_valid();
        if let Some(state) = self.machine.check_valid(all_valid) {
            self.enter_state(state);
        }
        all_valid
    }

    fn all_required_valid(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| slot.state.is_optional() || slot.state.is_valid())
    }

    // -----------------------------------------------------------------------
    // Feedback
    // -----------------------------------------------------------------------

    /// Surface a field's validity, when allowed.
    ///
    /// Requires the controller to be active, the form to be touched, and
    /// either `alert_unedited` or an edited field. The first negative
    /// surfacing subscribes the field to the correction trigger.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownField`] for a foreign id.
    pub fn alert_input_validity(&mut self, id: FieldId) -> Result<()> {
        let idx = self.index(id)?;
        if !self.is_active() || self.machine.state() == FormState::Untouched {
            return Ok(());
        }
        let markers = &self.config.markers;
        let slot = &mut self.slots[idx];
        if !(self.alert_unedited || slot.state.is_touched()) {
            return Ok(());
        }

        let event = if slot.state.is_valid() {
            slot.handle.remove_marker(&markers.invalid);
            slot.handle.add_marker(&markers.valid);
            FormEvent::InputValid { field: id }
        } else {
            slot.handle.remove_marker(&markers.valid);
            slot.handle.add_marker(&markers.invalid);
            if slot.state.ensure_correction_listener() {
                slot.handle.subscribe(&self.config.correction_event);
                debug!(field = %id, trigger = %self.config.correction_event, "correction listener attached");
            }
            FormEvent::InputInvalid {
                field: id,
                errors: slot.state.errors().clone(),
            }
        };
        self.notifier.emit(&event);
        Ok(())
    }

    /// Turn on `alert_unedited` for good and surface every field.
    ///
    /// # Errors
    ///
    /// Never fails for the controller's own fields.
    pub fn alert_all_inputs(&mut self) -> Result<()> {
        self.alert_unedited = true;
        for idx in 0..self.slots.len() {
            self.alert_input_validity(FieldId::from_raw(idx))?;
        }
        Ok(())
    }

    /// Poll body: validate fields whose value changed without an event.
    ///
    /// # Errors
    ///
    /// See [`validate_field`](Self::validate_field).
    pub fn check_for_changed_inputs(&mut self) -> Result<()> {
        let _span = debug_span!("check_for_changed_inputs").entered();
        for idx in 0..self.slots.len() {
            let value = self.slots[idx].handle.value();
            if self.slots[idx].state.record_value(&value) {
                debug!(field = idx, "value changed without event");
                self.mark_form_touched();
                self.validate_field(FieldId::from_raw(idx))?;
            }
        }
        Ok(())
    }

    /// Handle a submit attempt.
    ///
    /// # Errors
    ///
    /// See [`validate_field`](Self::validate_field).
    pub fn on_submit(&mut self, event: &mut SubmitEvent) -> Result<SubmitOutcome> {
        if !self.attached || !self.config.validate_on_submit {
            return Ok(SubmitOutcome::Ignored);
        }
        self.mark_form_touched();
        if self.validate_all_inputs()? {
            debug!("submit valid");
            self.notifier.emit(&FormEvent::ValidSubmit);
            return Ok(SubmitOutcome::Valid);
        }
        event.prevent_default();
        let cancelled = event.is_cancelled();
        debug!(cancelled, "submit invalid");
        self.notifier.emit(&FormEvent::InvalidSubmit { cancelled });
        self.alert_all_inputs()?;
        Ok(SubmitOutcome::Invalid { cancelled })
    }

    // -----------------------------------------------------------------------
    // Event entry points
    // -----------------------------------------------------------------------

    /// Route a field event.
    ///
    /// Order: touched bookkeeping, validation (validate trigger, `change`, or
    /// correction trigger), then feedback (alert or correction trigger).
    ///
    /// # Errors
    ///
    /// See [`validate_field`](Self::validate_field).
    pub fn handle_field_event(&mut self, id: FieldId, event: &FieldEvent) -> Result<()> {
        let idx = self.index(id)?;
        if !self.attached {
            return Ok(());
        }

        let validate = self.trigger_fires(&self.config.validate_event, event);
        let change = matches!(event, FieldEvent::Change);
        let correction = self.slots[idx].state.is_watching_correction()
            && self.trigger_fires(&self.config.correction_event, event);
        let alert = self.trigger_fires(&self.config.alert_event, event);

        if validate && !event.is_tab() {
            self.slots[idx].state.mark_touched();
            self.mark_form_touched();
        }

        let mut surfaced_valid = false;
        if validate || change || correction {
            surfaced_valid = self.validate_field(id)?;
        }
        if (alert || correction) && !surfaced_valid {
            self.alert_input_validity(id)?;
        }
        Ok(())
    }

    /// Route a document-level key event for chord suppression.
    pub fn handle_key(&mut self, key: &KeyEvent, now: Instant) -> KeyAction {
        if !self.attached {
            return KeyAction::Ignore;
        }
        self.scheduler.on_key(key, now)
    }

    /// Advance timers to `now`, running the poll when it is due.
    ///
    /// # Errors
    ///
    /// See [`validate_field`](Self::validate_field).
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        if !self.attached {
            return Ok(TickOutcome::default());
        }
        let outcome = self.scheduler.tick(now);
        if outcome.poll {
            self.check_for_changed_inputs()?;
        }
        Ok(outcome)
    }

    fn trigger_fires(&self, trigger: &Trigger, event: &FieldEvent) -> bool {
        if !trigger.matches(event) {
            return false;
        }
        match event.key() {
            Some(key) if trigger.filters_keys() => self.scheduler.passes_key_filter(key),
            _ => true,
        }
    }

    // -----------------------------------------------------------------------
    // Form state
    // -----------------------------------------------------------------------

    fn mark_form_touched(&mut self) {
        if let Some(state) = self.machine.mark_touched() {
            self.enter_state(state);
        }
    }

    fn enter_state(&mut self, state: FormState) {
        let markers = &self.config.markers;
        match state {
            FormState::Untouched => self.surface.add_marker(&markers.untouched),
            FormState::Touched => {
                self.surface.add_marker(&markers.touched);
                self.surface.remove_marker(&markers.untouched);
            }
            FormState::Valid => {
                self.surface.add_marker(&markers.valid);
                self.surface.remove_marker(&markers.invalid);
            }
            FormState::Invalid => {
                self.surface.add_marker(&markers.invalid);
                self.surface.remove_marker(&markers.valid);
            }
        }
        self.notifier.emit(&FormEvent::StateEntered(state));
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Subscribe to a notification kind.
    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&FormEvent) + 'static) -> ListenerId {
        self.notifier.on(kind, handler)
    }

    /// Unsubscribe, returning whether the listener existed.
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.notifier.off(id)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    fn index(&self, id: FieldId) -> Result<usize> {
        let idx = id.index();
        if idx < self.slots.len() {
            Ok(idx)
        } else {
            Err(Error::UnknownField(id))
        }
    }

    /// Visible form state.
    #[must_use]
    pub fn state(&self) -> FormState {
        self.machine.state()
    }

    /// Raw aggregate from the last check.
    #[must_use]
    pub fn aggregate(&self) -> Validity {
        self.machine.aggregate()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Attached and not chord-suppressed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.attached && !self.scheduler.is_suspended()
    }

    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.scheduler.is_suspended()
    }

    #[must_use]
    pub fn alert_unedited(&self) -> bool {
        self.alert_unedited
    }

    #[must_use]
    pub fn field(&self, id: FieldId) -> Option<&FieldState> {
        self.slots.get(id.index()).map(|slot| &slot.state)
    }

    #[must_use]
    pub fn handle(&self, id: FieldId) -> Option<&F> {
        self.slots.get(id.index()).map(|slot| &slot.handle)
    }

    pub fn handle_mut(&mut self, id: FieldId) -> Option<&mut F> {
        self.slots.get_mut(id.index()).map(|slot| &mut slot.handle)
    }

    /// Ids of every selected field, in order.
    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + use<F, S> {
        (0..self.slots.len()).map(FieldId::from_raw)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    #[must_use]
    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    /// Key-code table used to name raw key codes.
    #[must_use]
    pub fn key_map(&self) -> &KeyMap {
        self.scheduler.key_map()
    }

    /// Earliest pending timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// The registry. Declared types are fixed at construction, but
    /// validators may be replaced.
    pub fn registry_mut(&mut self) -> &mut ValidatorRegistry {
        &mut self.registry
    }
}

impl<F: FieldHandle, S: FormSurface> fmt::Debug for Controller<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("fields", &self.slots.len())
            .field("state", &self.machine.state())
            .field("attached", &self.attached)
            .field("suppressed", &self.scheduler.is_suspended())
            .field("alert_unedited", &self.alert_unedited)
            .finish()
    }
}
