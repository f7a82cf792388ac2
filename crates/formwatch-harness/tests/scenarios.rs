//! End-to-end scenarios against in-memory collaborators.

use std::collections::BTreeSet;
use std::time::Duration;

use formwatch_core::{
    Controller, EventKind, FieldEvent, FieldId, FormConfig, FormEvent, FormState, KeyAction,
    KeyEvent, SubmitEvent, SubmitOutcome, Trigger, Validity,
};
use formwatch_harness::{MemoryField, MemoryForm, Recorder, VirtualClock};
use pretty_assertions::assert_eq;

const MS_100: Duration = Duration::from_millis(100);
const SEC_1: Duration = Duration::from_secs(1);

struct Rig {
    controller: Controller<MemoryField, MemoryForm>,
    form: MemoryForm,
    fields: Vec<MemoryField>,
    recorder: Recorder,
    clock: VirtualClock,
}

impl Rig {
    fn new(fields: Vec<MemoryField>, config: FormConfig) -> Self {
        let clock = VirtualClock::new();
        let recorder = Recorder::new(clock.clone());
        let form = MemoryForm::new();
        let initial_validation = config.initial_validation;
        let config = FormConfig {
            active: false,
            ..config
        };
        let mut controller = Controller::new(config, form.clone(), fields.clone()).unwrap();
        recorder.listen(&mut controller);
        controller.attach_at(clock.now());
        if initial_validation {
            controller.validate_all_inputs().unwrap();
        }
        Self {
            controller,
            form,
            fields,
            recorder,
            clock,
        }
    }

    fn with_defaults(fields: Vec<MemoryField>) -> Self {
        Self::new(fields, FormConfig::default())
    }

    fn type_into(&mut self, i: usize, text: &str) {
        for c in text.chars() {
            self.fields[i].push_char(c);
            let key = KeyEvent::up(c.to_string());
            self.controller
                .handle_field_event(id(i), &FieldEvent::Key(key))
                .unwrap();
        }
    }

    fn event(&mut self, i: usize, event: FieldEvent) {
        self.controller.handle_field_event(id(i), &event).unwrap();
    }

    fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.controller.tick(self.clock.now()).unwrap();
    }

    fn errors(&self, i: usize) -> Vec<String> {
        self.controller
            .field(id(i))
            .unwrap()
            .errors()
            .iter()
            .cloned()
            .collect()
    }
}

fn id(i: usize) -> FieldId {
    FieldId::from_raw(i)
}

fn field(class: &str, value: &str) -> MemoryField {
    MemoryField::new("f", value).with_class(class)
}

// ---------------------------------------------------------------------------
// Validation results
// ---------------------------------------------------------------------------

#[test]
fn email_field_scenario() {
    let mut rig = Rig::with_defaults(vec![field("validate-email", "a@b.com")]);
    assert!(rig.controller.validate_field(id(0)).unwrap());
    assert!(rig.errors(0).is_empty());

    rig.fields[0].set_silently("not-an-email");
    assert!(!rig.controller.validate_field(id(0)).unwrap());
    assert_eq!(rig.errors(0), vec!["email"]);
}

#[test]
fn numeric_field_scenario() {
    let mut rig = Rig::with_defaults(vec![field("validate-numeric", "12.5")]);
    assert!(rig.controller.validate_field(id(0)).unwrap());
    rig.fields[0].set_silently("12.5.3");
    assert!(!rig.controller.validate_field(id(0)).unwrap());
}

#[test]
fn every_failing_type_is_reported() {
    let mut rig = Rig::with_defaults(vec![field(
        "validate-text validate-alpha validate-numeric",
        "",
    )]);
    rig.controller.validate_field(id(0)).unwrap();
    assert_eq!(rig.errors(0), vec!["alpha", "numeric", "text"]);

    rig.fields[0].set_silently("12");
    rig.controller.validate_field(id(0)).unwrap();
    assert_eq!(rig.errors(0), vec!["alpha"]);
}

#[test]
fn invalid_required_with_valid_optional() {
    let mut rig = Rig::with_defaults(vec![
        field("validate-text", ""),
        field("validate-text optional", "x"),
    ]);
    assert!(!rig.controller.validate_all_inputs().unwrap());
    assert_eq!(rig.controller.aggregate(), Validity::Invalid);

    rig.controller.on_submit(&mut SubmitEvent::default()).unwrap();
    assert_eq!(rig.controller.state(), FormState::Invalid);
    assert!(rig.form.marked("invalid"));
}

#[test]
fn all_optional_set_is_valid() {
    let mut rig = Rig::with_defaults(vec![
        field("validate-email optional", "nope"),
        field("validate-numeric optional", "abc"),
    ]);
    assert!(rig.controller.validate_all_inputs().unwrap());
    assert_eq!(rig.controller.aggregate(), Validity::Valid);
    assert!(!rig.controller.field(id(0)).unwrap().is_valid());
}

// ---------------------------------------------------------------------------
// Touched gate
// ---------------------------------------------------------------------------

#[test]
fn touched_is_entered_once() {
    let mut rig = Rig::with_defaults(vec![field("", ""), field("", "")]);
    rig.type_into(0, "abc");
    rig.type_into(1, "de");
    rig.event(0, FieldEvent::Blur);
    assert_eq!(rig.recorder.count(EventKind::Touched), 1);
    assert!(rig.form.marked("touched"));
    assert!(!rig.form.marked("untouched"));
    assert!(rig.recorder.verify_invariants().is_empty());
}

#[test]
fn no_feedback_while_untouched() {
    let mut rig = Rig::with_defaults(vec![field("validate-email", "bad")]);
    rig.event(0, FieldEvent::Blur);
    rig.event(0, FieldEvent::Change);
    rig.controller.alert_input_validity(id(0)).unwrap();
    rig.controller.alert_all_inputs().unwrap();

    assert!(rig.recorder.is_empty());
    assert!(rig.fields[0].markers().is_empty());
    assert_eq!(rig.controller.state(), FormState::Untouched);
    assert!(rig.form.marked("untouched"));
}

#[test]
fn unedited_fields_stay_quiet_without_alert_unedited() {
    let config = FormConfig {
        alert_unedited: false,
        ..FormConfig::default()
    };
    let mut rig = Rig::new(vec![field("", ""), field("validate-email", "")], config);
    rig.type_into(0, "hi");
    rig.event(1, FieldEvent::Blur);

    assert_eq!(rig.recorder.count(EventKind::InputInvalid), 0);
    assert!(!rig.fields[1].marked("invalid"));
    assert!(rig.fields[0].marked("valid"));

    // A failed submit turns alert_unedited on for good.
    let outcome = rig.controller.on_submit(&mut SubmitEvent::default()).unwrap();
    assert_eq!(outcome, SubmitOutcome::Invalid { cancelled: true });
    assert!(rig.controller.alert_unedited());
    assert!(rig.fields[1].marked("invalid"));
}

// ---------------------------------------------------------------------------
// Correction listener
// ---------------------------------------------------------------------------

#[test]
fn correction_listener_revalidates_live() {
    let config = FormConfig {
        validate_event: Trigger::Change,
        correction_event: Trigger::Input,
        ..FormConfig::default()
    };
    let mut rig = Rig::new(vec![field("validate-zipcode", "")], config);
    rig.fields[0].set_silently("123");
    rig.event(0, FieldEvent::Change);
    rig.controller.on_submit(&mut SubmitEvent::default()).unwrap();
    assert!(rig.fields[0].marked("invalid"));
    assert_eq!(rig.fields[0].subscription_count(&Trigger::Input), 1);

    rig.fields[0].set_silently("12345");
    rig.event(0, FieldEvent::Input);
    assert!(rig.fields[0].marked("valid"));
    assert!(!rig.fields[0].marked("invalid"));
    assert_eq!(rig.controller.state(), FormState::Valid);

    rig.fields[0].set_silently("1234");
    rig.event(0, FieldEvent::Input);
    rig.event(0, FieldEvent::Input);
    assert!(rig.fields[0].marked("invalid"));
    assert_eq!(rig.fields[0].subscription_count(&Trigger::Input), 1);
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[test]
fn submit_sequence_is_recorded_in_order() {
    let mut rig = Rig::with_defaults(vec![field("validate-alpha", "abc1")]);
    let mut ev = SubmitEvent::new(false);
    let outcome = rig.controller.on_submit(&mut ev).unwrap();
    assert_eq!(outcome, SubmitOutcome::Invalid { cancelled: false });
    assert!(!ev.is_cancelled());

    let errors: BTreeSet<String> = ["alpha".to_string()].into();
    assert_eq!(
        rig.recorder.events(),
        vec![
            FormEvent::StateEntered(FormState::Touched),
            FormEvent::StateEntered(FormState::Invalid),
            FormEvent::InvalidSubmit { cancelled: false },
            FormEvent::InputInvalid { field: id(0), errors },
        ]
    );
}

#[test]
fn submit_not_hooked_when_disabled() {
    let config = FormConfig {
        validate_on_submit: false,
        ..FormConfig::default()
    };
    let mut rig = Rig::new(vec![field("", "")], config);
    assert!(!rig.form.submit_hooked());
    let outcome = rig.controller.on_submit(&mut SubmitEvent::default()).unwrap();
    assert_eq!(outcome, SubmitOutcome::Ignored);
}

// ---------------------------------------------------------------------------
// Chord suppression
// ---------------------------------------------------------------------------

#[test]
fn chord_suppresses_until_debounce() {
    let mut rig = Rig::with_defaults(vec![field("validate-alpha", "")]);
    rig.type_into(0, "a");
    assert_eq!(rig.controller.state(), FormState::Valid);
    rig.recorder.clear();

    let now = rig.clock.now();
    assert_eq!(
        rig.controller.handle_key(&KeyEvent::down("control"), now),
        KeyAction::Suspend
    );
    rig.type_into(0, "1");
    rig.event(0, FieldEvent::Blur);
    assert!(rig.recorder.is_empty());
    assert!(rig.controller.field(id(0)).unwrap().is_valid());

    rig.controller.handle_key(&KeyEvent::up("control"), now);
    rig.advance(Duration::from_millis(99));
    assert!(rig.controller.is_suppressed());
    rig.advance(Duration::from_millis(1));
    assert!(!rig.controller.is_suppressed());

    rig.event(0, FieldEvent::Change);
    assert!(!rig.controller.field(id(0)).unwrap().is_valid());
    assert_eq!(rig.controller.state(), FormState::Invalid);
}

#[test]
fn overlapping_key_ups_reenable_idempotently() {
    let mut rig = Rig::with_defaults(vec![field("", "")]);
    let t = rig.clock.now();
    rig.controller.handle_key(&KeyEvent::down("shift"), t);
    rig.controller.handle_key(&KeyEvent::down("option"), t);
    rig.controller.handle_key(&KeyEvent::up("shift"), t);
    rig.advance(Duration::from_millis(30));
    let t2 = rig.clock.now();
    rig.controller.handle_key(&KeyEvent::up("option"), t2);
    assert_eq!(rig.controller.scheduler().pending_reenables(), 2);

    rig.advance(Duration::from_millis(70));
    assert!(!rig.controller.is_suppressed());
    assert_eq!(rig.controller.scheduler().pending_reenables(), 1);

    rig.advance(Duration::from_millis(30));
    assert!(!rig.controller.is_suppressed());
    assert_eq!(rig.controller.scheduler().pending_reenables(), 0);
}

#[test]
fn tab_is_not_a_chord_key() {
    let mut rig = Rig::with_defaults(vec![field("", "")]);
    let now = rig.clock.now();
    assert_eq!(
        rig.controller.handle_key(&KeyEvent::down("tab"), now),
        KeyAction::Ignore
    );
    assert!(rig.controller.is_active());
    rig.event(0, FieldEvent::Key(KeyEvent::up("tab")));
    assert_eq!(rig.controller.state(), FormState::Untouched);
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

#[test]
fn poll_detects_silent_change() {
    let mut rig = Rig::with_defaults(vec![field("validate-text", "x")]);
    assert_eq!(rig.controller.field(id(0)).unwrap().previous_value(), "x");
    assert_eq!(rig.controller.next_deadline(), Some(rig.clock.now() + SEC_1));

    rig.fields[0].set_silently("y");
    rig.advance(SEC_1 / 2);
    assert!(rig.recorder.is_empty());
    rig.advance(SEC_1 / 2);

    assert_eq!(rig.recorder.count(EventKind::Touched), 1);
    let state = rig.controller.field(id(0)).unwrap();
    assert_eq!(state.previous_value(), "y");
    assert!(state.is_valid());
    assert_eq!(rig.controller.state(), FormState::Valid);
}

#[test]
fn poll_ignores_unchanged_values() {
    let mut rig = Rig::with_defaults(vec![field("validate-text", "x")]);
    rig.advance(SEC_1);
    rig.advance(SEC_1);
    assert!(rig.recorder.is_empty());
    assert_eq!(rig.controller.state(), FormState::Untouched);
}

#[test]
fn poll_disabled_by_zero_interval() {
    let config = FormConfig {
        check_periodical_ms: 0,
        ..FormConfig::default()
    };
    let mut rig = Rig::new(vec![field("", "")], config);
    rig.fields[0].set_silently("y");
    rig.advance(SEC_1 * 5);
    assert!(rig.recorder.is_empty());
    assert!(rig.controller.next_deadline().is_none());
}

#[test]
fn detach_stops_everything() {
    let mut rig = Rig::with_defaults(vec![field("", "")]);
    let now = rig.clock.now();
    rig.controller.handle_key(&KeyEvent::down("shift"), now);
    rig.controller.handle_key(&KeyEvent::up("shift"), now);
    rig.controller.deactivate();
    assert!(rig.controller.next_deadline().is_none());

    rig.fields[0].set_silently("y");
    rig.advance(SEC_1 * 2);
    rig.event(0, FieldEvent::Change);
    assert!(rig.recorder.is_empty());
    assert!(rig.fields[0].subscriptions().is_empty());

    rig.controller.attach_at(rig.clock.now());
    rig.advance(MS_100);
    rig.event(0, FieldEvent::Key(KeyEvent::up("y")));
    assert_eq!(rig.controller.state(), FormState::Valid);
}
