#![forbid(unsafe_code)]

//! Notification trace with a checksum for golden comparisons.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use formwatch_core::{
    Controller, EventKind, FieldHandle, FormEvent, FormState, FormSurface, ListenerId,
};

use crate::clock::VirtualClock;

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceEntry {
    /// Virtual time of the notification.
    pub at_ms: u64,
    pub event: FormEvent,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}ms  {}", self.at_ms, self.event)
    }
}

/// Records every notification a controller emits, stamped with virtual time.
///
/// Clones share the same trace.
#[derive(Debug, Clone)]
pub struct Recorder {
    clock: VirtualClock,
    entries: Rc<RefCell<Vec<TraceEntry>>>,
}

impl Recorder {
    #[must_use]
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            entries: Rc::default(),
        }
    }

    /// Subscribe to every notification kind.
    pub fn listen<F: FieldHandle, S: FormSurface>(
        &self,
        controller: &mut Controller<F, S>,
    ) -> Vec<ListenerId> {
        EventKind::ALL
            .into_iter()
            .map(|kind| {
                let sink = self.clone();
                controller.on(kind, move |event| sink.push(event.clone()))
            })
            .collect()
    }

    pub fn push(&self, event: FormEvent) {
        let at_ms = self.clock.elapsed_ms();
        self.entries.borrow_mut().push(TraceEntry { at_ms, event });
    }

    #[must_use]
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.borrow().clone()
    }

    /// Recorded events without timestamps.
    #[must_use]
    pub fn events(&self) -> Vec<FormEvent> {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    /// How many events of `kind` were recorded.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.event.kind() == kind)
            .count()
    }

    /// Checksum over every entry and its order.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for entry in self.entries.borrow().iter() {
            entry.hash(&mut hasher);
        }
        hasher.finish()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Check ordering rules every trace must satisfy.
    ///
    /// Returns one message per violation.
    #[must_use]
    pub fn verify_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let entries = self.entries.borrow();

        let mut touched = false;
        let mut last_state: Option<FormState> = None;
        let mut last_at = 0;
        for (i, entry) in entries.iter().enumerate() {
            if entry.at_ms < last_at {
                violations.push(format!("entry {i}: time went backwards"));
            }
            last_at = entry.at_ms;

            match &entry.event {
                FormEvent::StateEntered(FormState::Touched) => {
                    if touched {
                        violations.push(format!("entry {i}: touched entered twice"));
                    }
                    touched = true;
                }
                FormEvent::StateEntered(FormState::Untouched) => {
                    violations.push(format!("entry {i}: untouched re-entered"));
                }
                FormEvent::StateEntered(state) => {
                    if !touched {
                        violations.push(format!("entry {i}: {state} before touched"));
                    }
                    if last_state == Some(*state) {
                        violations.push(format!("entry {i}: {state} repeated without change"));
                    }
                    last_state = Some(*state);
                }
                FormEvent::InputValid { .. } | FormEvent::InputInvalid { .. } => {
                    if !touched {
                        violations.push(format!("entry {i}: feedback before touched"));
                    }
                }
                FormEvent::ValidSubmit | FormEvent::InvalidSubmit { .. } => {}
            }
        }
        violations
    }
}
