#![forbid(unsafe_code)]

//! Replay harness for `formwatch-core`.
//!
//! - **Collaborators**: [`MemoryField`] and [`MemoryForm`] keep markers,
//!   values, and subscriptions in shared memory.
//! - **Time**: [`VirtualClock`] moves only when a script says so.
//! - **Trace**: [`Recorder`] stamps every notification and checksums the
//!   trace for golden comparisons.
//! - **Scripts**: [`Script`] describes a session as timed actions;
//!   [`replay`] runs it and returns a [`Report`].

pub mod clock;
pub mod memory;
pub mod recorder;
pub mod script;

pub use clock::VirtualClock;
pub use memory::{MemoryField, MemoryForm};
pub use recorder::{Recorder, TraceEntry};
pub use script::{Action, FieldSpec, KeyEdge, Report, Script, ScriptError, Session, Step, replay};
