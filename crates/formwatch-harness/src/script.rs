#![forbid(unsafe_code)]

//! Session scripts: a config, a field set, and timed user actions.
//!
//! ```json
//! {
//!   "config": { "alert_unedited": false },
//!   "fields": [ { "name": "email", "class": "validate-email" } ],
//!   "steps": [
//!     { "at_ms": 0,   "action": { "type": "type", "field": "email", "text": "a@b.co" } },
//!     { "at_ms": 200, "action": { "type": "blur", "field": "email" } },
//!     { "at_ms": 900, "action": { "type": "submit" } }
//!   ]
//! }
//! ```
//!
//! Every step first advances the virtual clock to `at_ms` and ticks the
//! controller, then performs its action.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use formwatch_core::{
    Controller, FieldEvent, FieldId, FormConfig, FormState, KeyEvent, KeyEventKind, SubmitEvent,
    SubmitOutcome, Validity,
};

use crate::clock::VirtualClock;
use crate::memory::{MemoryField, MemoryForm};
use crate::recorder::{Recorder, TraceEntry};

// ---------------------------------------------------------------------------
// Script model
// ---------------------------------------------------------------------------

/// A complete session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub config: FormConfig,
    pub fields: Vec<FieldSpec>,
    pub steps: Vec<Step>,
    /// Extra tick after the last step, e.g. to let the poll run.
    pub end_ms: Option<u64>,
}

/// One field in the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub name: String,
    pub value: String,
    pub class: String,
    /// Element tag for the selection rule; `input` when omitted.
    pub tag: Option<String>,
    /// Extra attributes (e.g. a custom type source).
    pub attributes: Vec<(String, String)>,
}

/// An action at a point in virtual time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    pub action: Action,
}

/// Key edge in a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEdge {
    Down,
    Up,
}

impl From<KeyEdge> for KeyEventKind {
    fn from(edge: KeyEdge) -> Self {
        match edge {
            KeyEdge::Down => Self::Down,
            KeyEdge::Up => Self::Up,
        }
    }
}

/// A user or host action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Type characters into a field: key-down, value update, input, key-up.
    Type { field: String, text: String },
    /// Replace the value without any event.
    SetValue { field: String, value: String },
    /// A single key edge, on a field or on the document.
    Key {
        field: Option<String>,
        key: String,
        edge: KeyEdge,
    },
    /// A key edge given as a raw key code, named through the config's key map.
    KeyCode {
        field: Option<String>,
        code: u32,
        edge: KeyEdge,
    },
    Change { field: String },
    Blur { field: String },
    Focus { field: String },
    Custom { field: String, name: String },
    Submit {
        #[serde(default = "default_cancelable")]
        cancelable: bool,
    },
    Attach,
    Detach,
    /// Only advance time.
    Wait,
}

fn default_cancelable() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to load or replay a script.
#[derive(Debug)]
pub enum ScriptError {
    Io(std::io::Error),
    Json(serde_json::Error),
    UnknownField(String),
    UnknownKeyCode(u32),
    TimeWentBackwards { at_ms: u64, now_ms: u64 },
    Controller(formwatch_core::Error),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read script: {e}"),
            Self::Json(e) => write!(f, "invalid script: {e}"),
            Self::UnknownField(name) => write!(f, "script names unknown field '{name}'"),
            Self::UnknownKeyCode(code) => write!(f, "key code {code} has no name"),
            Self::TimeWentBackwards { at_ms, now_ms } => {
                write!(f, "step at {at_ms}ms is earlier than current time {now_ms}ms")
            }
            Self::Controller(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Controller(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScriptError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ScriptError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<formwatch_core::Error> for ScriptError {
    fn from(e: formwatch_core::Error) -> Self {
        Self::Controller(e)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Script {
    /// Parse a script from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Json`] for malformed input and
    /// [`ScriptError::Controller`] when the embedded config is rejected.
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(json)?;
        script
            .config
            .validate()
            .map_err(|e| ScriptError::Controller(e.into()))?;
        Ok(script)
    }

    /// Read and parse a script file.
    ///
    /// # Errors
    ///
    /// See [`Script::from_json`]; also fails on I/O errors.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Result of a replay.
#[derive(Debug, Clone)]
pub struct Report {
    pub entries: Vec<TraceEntry>,
    pub checksum: u64,
    pub final_state: FormState,
    pub aggregate: Validity,
    pub submits: Vec<SubmitOutcome>,
    pub violations: Vec<String>,
}

impl Report {
    /// Printable trace lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

/// A controller wired to in-memory collaborators and a virtual clock.
pub struct Session {
    controller: Controller<MemoryField, MemoryForm>,
    fields: Vec<(String, FieldId, MemoryField)>,
    form: MemoryForm,
    clock: VirtualClock,
    recorder: Recorder,
    submits: Vec<SubmitOutcome>,
}

impl Session {
    /// Build the collaborators and the controller for a script.
    ///
    /// # Errors
    ///
    /// Fails when the controller cannot be constructed.
    pub fn new(script: &Script) -> Result<Self, ScriptError> {
        let clock = VirtualClock::new();
        let recorder = Recorder::new(clock.clone());
        let form = MemoryForm::new();

        let candidates: Vec<MemoryField> = script
            .fields
            .iter()
            .map(|decl| {
                let mut field = MemoryField::new(&decl.name, &decl.value).with_class(&decl.class);
                if let Some(tag) = &decl.tag {
                    field = field.with_tag(tag);
                }
                for (name, value) in &decl.attributes {
                    field = field.with_attribute(name, value);
                }
                field
            })
            .collect();

        let mut config = script.config.clone();
        // Construction-time notifications are recorded by attaching after
        // the listeners are in place.
        let start_active = config.active;
        config.active = false;
        let mut controller = Controller::new(config, form.clone(), candidates)?;
        recorder.listen(&mut controller);
        if start_active {
            controller.attach_at(clock.now());
            if controller.config().initial_validation {
                controller.validate_all_inputs()?;
            }
        }

        let fields = controller
            .field_ids()
            .filter_map(|id| {
                controller
                    .handle(id)
                    .map(|handle| (handle.name(), id, handle.clone()))
            })
            .collect();

        info!(fields = controller.len(), "session ready");
        Ok(Self {
            controller,
            fields,
            form,
            clock,
            recorder,
            submits: Vec::new(),
        })
    }

    /// Advance to `at_ms` and tick.
    ///
    /// # Errors
    ///
    /// Fails when time would go backwards or the poll fails.
    pub fn advance_to(&mut self, at_ms: u64) -> Result<(), ScriptError> {
        if !self.clock.set_ms(at_ms) {
            return Err(ScriptError::TimeWentBackwards {
                at_ms,
                now_ms: self.clock.elapsed_ms(),
            });
        }
        self.controller.tick(self.clock.now())?;
        Ok(())
    }

    /// Perform one action at the current time.
    ///
    /// # Errors
    ///
    /// Fails on unknown field names or controller errors.
    pub fn apply(&mut self, action: &Action) -> Result<(), ScriptError> {
        debug!(?action, at_ms = self.clock.elapsed_ms(), "apply");
        match action {
            Action::Type { field, text } => {
                let (id, handle) = self.lookup(field)?;
                for c in text.chars() {
                    let key = if c == ' ' { "space".to_string() } else { c.to_string() };
                    self.key(Some(id), KeyEvent::down(&key))?;
                    handle.push_char(c);
                    self.controller.handle_field_event(id, &FieldEvent::Input)?;
                    self.key(Some(id), KeyEvent::up(&key))?;
                }
            }
            Action::SetValue { field, value } => {
                let (_, handle) = self.lookup(field)?;
                handle.set_silently(value);
            }
            Action::Key { field, key, edge } => {
                let id = match field {
                    Some(name) => Some(self.lookup(name)?.0),
                    None => None,
                };
                self.key(id, KeyEvent::new(key, (*edge).into()))?;
            }
            Action::KeyCode { field, code, edge } => {
                let id = match field {
                    Some(name) => Some(self.lookup(name)?.0),
                    None => None,
                };
                let event = KeyEvent::from_code(*code, (*edge).into(), self.controller.key_map())
                    .ok_or(ScriptError::UnknownKeyCode(*code))?;
                self.key(id, event)?;
            }
            Action::Change { field } => self.field_event(field, &FieldEvent::Change)?,
            Action::Blur { field } => self.field_event(field, &FieldEvent::Blur)?,
            Action::Focus { field } => self.field_event(field, &FieldEvent::Focus)?,
            Action::Custom { field, name } => {
                self.field_event(field, &FieldEvent::Custom(name.clone()))?;
            }
            Action::Submit { cancelable } => {
                let mut event = SubmitEvent::new(*cancelable);
                let outcome = self.controller.on_submit(&mut event)?;
                self.submits.push(outcome);
            }
            Action::Attach => {
                self.controller.attach_at(self.clock.now());
            }
            Action::Detach => {
                self.controller.detach();
            }
            Action::Wait => {}
        }
        Ok(())
    }

    /// Replay every step, then tick once more at `end_ms`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing step.
    pub fn run(mut self, script: &Script) -> Result<Report, ScriptError> {
        for step in &script.steps {
            self.advance_to(step.at_ms)?;
            self.apply(&step.action)?;
        }
        if let Some(end) = script.end_ms {
            self.advance_to(end)?;
        }
        Ok(self.report())
    }

    /// Snapshot of the trace and final state.
    #[must_use]
    pub fn report(&self) -> Report {
        Report {
            entries: self.recorder.entries(),
            checksum: self.recorder.checksum(),
            final_state: self.controller.state(),
            aggregate: self.controller.aggregate(),
            submits: self.submits.clone(),
            violations: self.recorder.verify_invariants(),
        }
    }

    #[must_use]
    pub fn controller(&self) -> &Controller<MemoryField, MemoryForm> {
        &self.controller
    }

    #[must_use]
    pub fn form(&self) -> &MemoryForm {
        &self.form
    }

    #[must_use]
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// The field handle registered under `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&MemoryField> {
        self.fields
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, _, handle)| handle)
    }

    fn lookup(&self, name: &str) -> Result<(FieldId, MemoryField), ScriptError> {
        self.fields
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, id, handle)| (*id, handle.clone()))
            .ok_or_else(|| ScriptError::UnknownField(name.to_string()))
    }

    fn field_event(&mut self, name: &str, event: &FieldEvent) -> Result<(), ScriptError> {
        let (id, _) = self.lookup(name)?;
        self.controller.handle_field_event(id, event)?;
        Ok(())
    }

    // Key events reach the focused field first, then bubble to the document.
    fn key(&mut self, field: Option<FieldId>, event: KeyEvent) -> Result<(), ScriptError> {
        if let Some(id) = field {
            self.controller
                .handle_field_event(id, &FieldEvent::Key(event.clone()))?;
        }
        self.controller.handle_key(&event, self.clock.now());
        Ok(())
    }
}

/// Build a session and replay the script.
///
/// # Errors
///
/// See [`Session::new`] and [`Session::run`].
pub fn replay(script: &Script) -> Result<Report, ScriptError> {
    Session::new(script)?.run(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL_SCRIPT: &str = r#"{
        "fields": [ { "name": "email", "class": "validate-email" } ],
        "steps": [
            { "at_ms": 0, "action": { "type": "type", "field": "email", "text": "a@b.co" } },
            { "at_ms": 50, "action": { "type": "blur", "field": "email" } },
            { "at_ms": 60, "action": { "type": "submit" } }
        ]
    }"#;

    #[test]
    fn parses_and_replays() {
        let script = Script::from_json(EMAIL_SCRIPT).unwrap();
        let report = replay(&script).unwrap();
        assert_eq!(report.final_state, FormState::Valid);
        assert_eq!(report.submits, vec![SubmitOutcome::Valid]);
        assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn replay_is_deterministic() {
        let script = Script::from_json(EMAIL_SCRIPT).unwrap();
        let a = replay(&script).unwrap();
        let b = replay(&script).unwrap();
        assert_eq!(a.checksum, b.checksum);
        assert_eq!(a.lines(), b.lines());
    }

    #[test]
    fn unknown_field_is_reported() {
        let script = Script::from_json(
            r#"{ "steps": [ { "at_ms": 0, "action": { "type": "blur", "field": "nope" } } ] }"#,
        )
        .unwrap();
        let err = replay(&script).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownField(ref n) if n == "nope"));
    }

    #[test]
    fn time_must_not_go_backwards() {
        let script = Script::from_json(
            r#"{ "steps": [
                { "at_ms": 100, "action": { "type": "wait" } },
                { "at_ms": 50, "action": { "type": "wait" } }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(
            replay(&script).unwrap_err(),
            ScriptError::TimeWentBackwards { at_ms: 50, now_ms: 100 }
        ));
    }

    #[test]
    fn key_codes_resolve_through_config() {
        let script = Script::from_json(
            r#"{
                "config": { "no_validate_keys": ["hyper"], "extra_keys": { "hyper": 300 } },
                "fields": [ { "name": "email", "class": "validate-email" } ]
            }"#,
        )
        .unwrap();
        let mut session = Session::new(&script).unwrap();

        let down = Action::KeyCode { field: None, code: 300, edge: KeyEdge::Down };
        session.apply(&down).unwrap();
        assert!(session.controller().is_suppressed());

        let up = Action::KeyCode { field: None, code: 300, edge: KeyEdge::Up };
        session.apply(&up).unwrap();
        session.advance_to(100).unwrap();
        assert!(!session.controller().is_suppressed());

        let letter = Action::KeyCode { field: Some("email".into()), code: 65, edge: KeyEdge::Up };
        session.apply(&letter).unwrap();
        assert_eq!(session.controller().state(), FormState::Invalid);
    }

    #[test]
    fn unnamed_key_code_is_reported() {
        let script = Script::from_json(
            r#"{ "steps": [ { "at_ms": 0, "action": { "type": "key_code", "code": 5000, "edge": "down" } } ] }"#,
        )
        .unwrap();
        assert!(matches!(replay(&script).unwrap_err(), ScriptError::UnknownKeyCode(5000)));
    }

    #[test]
    fn bad_config_is_rejected() {
        let err =
            Script::from_json(r#"{ "config": { "no_validate_keys": ["hyper"] } }"#).unwrap_err();
        assert!(matches!(err, ScriptError::Controller(_)));
    }
}
