//! Property-based invariant tests for the form controller.
//!
//! 1. A single-type field is valid iff that validator's test passes.
//! 2. `errors` is exactly the set of failing types.
//! 3. The aggregate is valid iff every required field is valid.
//! 4. Any event sequence yields a trace that enters `touched` at most once
//!    and surfaces no feedback before it.
//! 5. While a chord is held, no event changes validity or emits feedback.

use std::collections::BTreeSet;
use std::time::Duration;

use formwatch_core::{
    Controller, EventKind, FieldEvent, FieldId, FormConfig, FormState, KeyEvent, SubmitEvent,
    ValidatorRegistry,
};
use formwatch_harness::{MemoryField, MemoryForm, Recorder, VirtualClock};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

const BUILTINS: [&str; 9] = [
    "text",
    "email",
    "name",
    "url",
    "alpha",
    "alphanumeric",
    "numeric",
    "zipcode",
    "state",
];

fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 .@:/'&-]{0,16}",
        Just(String::new()),
        Just("a@b.com".to_string()),
        Just("-12.5".to_string()),
        Just("12345-6789".to_string()),
        Just(" ny ".to_string()),
        Just("https://example.org/".to_string()),
    ]
}

fn build(fields: Vec<MemoryField>) -> (Controller<MemoryField, MemoryForm>, Recorder, VirtualClock) {
    let clock = VirtualClock::new();
    let recorder = Recorder::new(clock.clone());
    let config = FormConfig {
        active: false,
        initial_validation: false,
        ..FormConfig::default()
    };
    let mut controller = Controller::new(config, MemoryForm::new(), fields).unwrap();
    recorder.listen(&mut controller);
    controller.attach_at(clock.now());
    (controller, recorder, clock)
}

#[derive(Debug, Clone)]
enum Step {
    Type(usize, char),
    Set(usize, String),
    Blur(usize),
    Change(usize),
    Submit,
    Wait(u64),
}

fn step_strategy(fields: usize) -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..fields, proptest::char::range('a', 'z')).prop_map(|(i, c)| Step::Type(i, c)),
        (0..fields, value_strategy()).prop_map(|(i, v)| Step::Set(i, v)),
        (0..fields).prop_map(Step::Blur),
        (0..fields).prop_map(Step::Change),
        Just(Step::Submit),
        (1u64..1500).prop_map(Step::Wait),
    ]
}

fn apply(
    controller: &mut Controller<MemoryField, MemoryForm>,
    fields: &[MemoryField],
    clock: &VirtualClock,
    step: &Step,
) {
    match step {
        Step::Type(i, c) => {
            fields[*i].push_char(*c);
            let key = FieldEvent::Key(KeyEvent::up(c.to_string()));
            controller
                .handle_field_event(FieldId::from_raw(*i), &key)
                .unwrap();
        }
        Step::Set(i, v) => fields[*i].set_silently(v),
        Step::Blur(i) => controller
            .handle_field_event(FieldId::from_raw(*i), &FieldEvent::Blur)
            .unwrap(),
        Step::Change(i) => controller
            .handle_field_event(FieldId::from_raw(*i), &FieldEvent::Change)
            .unwrap(),
        Step::Submit => {
            controller.on_submit(&mut SubmitEvent::default()).unwrap();
        }
        Step::Wait(ms) => {
            clock.advance(Duration::from_millis(*ms));
            controller.tick(clock.now()).unwrap();
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Single-type validity equals the validator's test
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn single_type_matches_validator(
        kind in prop::sample::select(BUILTINS.to_vec()),
        value in value_strategy(),
    ) {
        let registry = ValidatorRegistry::with_builtins();
        let expected = registry.resolve(kind).unwrap().test(&value).is_some();

        let field = MemoryField::new("f", value.clone()).with_class(&format!("validate-{kind}"));
        let (mut controller, _, _) = build(vec![field]);
        let valid = controller.validate_field(FieldId::from_raw(0)).unwrap();
        prop_assert_eq!(valid, expected, "{} on {:?}", kind, value);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. errors == failing set
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn errors_are_exactly_the_failures(
        kinds in prop::sample::subsequence(BUILTINS.to_vec(), 1..=BUILTINS.len()),
        value in value_strategy(),
    ) {
        let registry = ValidatorRegistry::with_builtins();
        let expected: BTreeSet<String> = kinds
            .iter()
            .filter(|k| registry.resolve(k).unwrap().test(&value).is_none())
            .map(|k| k.to_string())
            .collect();

        let class = kinds
            .iter()
            .map(|k| format!("validate-{k}"))
            .collect::<Vec<_>>()
            .join(" ");
        let field = MemoryField::new("f", value.clone()).with_class(&class);
        let (mut controller, _, _) = build(vec![field]);
        let valid = controller.validate_field(FieldId::from_raw(0)).unwrap();

        let state = controller.field(FieldId::from_raw(0)).unwrap();
        prop_assert_eq!(state.errors(), &expected);
        prop_assert_eq!(valid, expected.is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Aggregate iff all required valid
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn aggregate_tracks_required_fields(
        layout in prop::collection::vec((any::<bool>(), any::<bool>()), 0..8),
    ) {
        let fields: Vec<MemoryField> = layout
            .iter()
            .map(|(filled, optional)| {
                let class = if *optional { "validate-text optional" } else { "validate-text" };
                MemoryField::new("f", if *filled { "x" } else { "" }).with_class(class)
            })
            .collect();
        let expected = layout.iter().all(|(filled, optional)| *filled || *optional);

        let (mut controller, _, _) = build(fields);
        prop_assert_eq!(controller.validate_all_inputs().unwrap(), expected);

        controller.on_submit(&mut SubmitEvent::default()).unwrap();
        let state = controller.state();
        prop_assert_eq!(state == FormState::Valid, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Trace invariants under arbitrary event sequences
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn traces_respect_touched_gate(
        steps in prop::collection::vec(step_strategy(3), 0..40),
    ) {
        let fields = vec![
            MemoryField::new("a", "").with_class("validate-alpha"),
            MemoryField::new("b", "").with_class("validate-email"),
            MemoryField::new("c", "").with_class("validate-text optional"),
        ];
        let (mut controller, recorder, clock) = build(fields.clone());
        controller.tick(clock.now()).unwrap();

        let mut seen_touched = false;
        for step in &steps {
            apply(&mut controller, &fields, &clock, step);
            if seen_touched {
                prop_assert_ne!(controller.state(), FormState::Untouched);
            }
            seen_touched |= controller.state() != FormState::Untouched;
        }
        let violations = recorder.verify_invariants();
        prop_assert!(violations.is_empty(), "{:?}", violations);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Chord suppression blocks side effects
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn held_chord_blocks_side_effects(
        steps in prop::collection::vec(step_strategy(2), 0..20),
    ) {
        let fields = vec![
            MemoryField::new("a", "").with_class("validate-numeric"),
            MemoryField::new("b", "").with_class("validate-text"),
        ];
        let (mut controller, recorder, clock) = build(fields.clone());
        controller.handle_key(&KeyEvent::down("shift"), clock.now());
        let before: Vec<bool> = controller
            .field_ids()
            .map(|id| controller.field(id).unwrap().is_valid())
            .collect();

        for step in &steps {
            apply(&mut controller, &fields, &clock, step);
        }

        prop_assert!(controller.is_suppressed());
        let after: Vec<bool> = controller
            .field_ids()
            .map(|id| controller.field(id).unwrap().is_valid())
            .collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(recorder.count(EventKind::InputValid), 0);
        prop_assert_eq!(recorder.count(EventKind::InputInvalid), 0);
    }
}
