#![forbid(unsafe_code)]

//! In-memory field and form collaborators.
//!
//! Handles are cheap clones sharing one record, so a test can keep a copy
//! and inspect markers or poke values after handing the field to a
//! controller.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use formwatch_core::{FieldHandle, FormSurface, Trigger};

#[derive(Debug, Default)]
struct FieldData {
    name: String,
    tag: String,
    value: String,
    attributes: BTreeMap<String, String>,
    markers: BTreeSet<String>,
    subscriptions: Vec<Trigger>,
}

/// A field backed by shared memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryField {
    inner: Rc<RefCell<FieldData>>,
}

impl MemoryField {
    /// An `input` field with the given name and starting value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let field = Self::default();
        {
            let mut data = field.inner.borrow_mut();
            data.name = name.into();
            data.tag = "input".into();
            data.value = value.into();
        }
        field
    }

    /// Set the `class` attribute.
    #[must_use]
    pub fn with_class(self, class: &str) -> Self {
        self.with_attribute("class", class)
    }

    #[must_use]
    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.inner
            .borrow_mut()
            .attributes
            .insert(name.into(), value.into());
        self
    }

    /// Set the element tag matched by the selection rule.
    #[must_use]
    pub fn with_tag(self, tag: &str) -> Self {
        self.inner.borrow_mut().tag = tag.into();
        self
    }

    /// Pre-apply a marker (e.g. `optional`).
    #[must_use]
    pub fn with_marker(self, marker: &str) -> Self {
        self.inner.borrow_mut().markers.insert(marker.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Replace the value without raising any event.
    pub fn set_silently(&self, value: &str) {
        self.inner.borrow_mut().value = value.into();
    }

    /// Append one character without raising any event.
    pub fn push_char(&self, c: char) {
        self.inner.borrow_mut().value.push(c);
    }

    #[must_use]
    pub fn current_value(&self) -> String {
        self.inner.borrow().value.clone()
    }

    #[must_use]
    pub fn markers(&self) -> BTreeSet<String> {
        self.inner.borrow().markers.clone()
    }

    #[must_use]
    pub fn marked(&self, marker: &str) -> bool {
        self.inner.borrow().markers.contains(marker)
    }

    /// Active subscriptions, duplicates included.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Trigger> {
        self.inner.borrow().subscriptions.clone()
    }

    /// How many times `trigger` is subscribed.
    #[must_use]
    pub fn subscription_count(&self, trigger: &Trigger) -> usize {
        self.inner
            .borrow()
            .subscriptions
            .iter()
            .filter(|t| *t == trigger)
            .count()
    }
}

impl FieldHandle for MemoryField {
    fn value(&self) -> String {
        self.current_value()
    }

    fn set_value(&mut self, value: &str) {
        self.set_silently(value);
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.inner.borrow().attributes.get(name).cloned()
    }

    fn has_marker(&self, marker: &str) -> bool {
        let data = self.inner.borrow();
        data.markers.contains(marker)
            || data
                .attributes
                .get("class")
                .is_some_and(|class| class.split_whitespace().any(|c| c == marker))
    }

    fn add_marker(&mut self, marker: &str) {
        self.inner.borrow_mut().markers.insert(marker.into());
    }

    fn remove_marker(&mut self, marker: &str) {
        self.inner.borrow_mut().markers.remove(marker);
    }

    fn subscribe(&mut self, trigger: &Trigger) {
        self.inner.borrow_mut().subscriptions.push(trigger.clone());
    }

    fn unsubscribe(&mut self, trigger: &Trigger) {
        let mut data = self.inner.borrow_mut();
        if let Some(pos) = data.subscriptions.iter().position(|t| t == trigger) {
            data.subscriptions.remove(pos);
        }
    }

    /// The selector is a comma-separated list of tags.
    fn matches_selector(&self, selector: &str) -> bool {
        let data = self.inner.borrow();
        selector.split(',').any(|tag| tag.trim() == data.tag)
    }
}

#[derive(Debug, Default)]
struct FormData {
    markers: BTreeSet<String>,
    submit_hooked: bool,
}

/// A form surface backed by shared memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryForm {
    inner: Rc<RefCell<FormData>>,
}

impl MemoryForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn markers(&self) -> BTreeSet<String> {
        self.inner.borrow().markers.clone()
    }

    #[must_use]
    pub fn marked(&self, marker: &str) -> bool {
        self.inner.borrow().markers.contains(marker)
    }

    #[must_use]
    pub fn submit_hooked(&self) -> bool {
        self.inner.borrow().submit_hooked
    }
}

impl FormSurface for MemoryForm {
    fn add_marker(&mut self, marker: &str) {
        self.inner.borrow_mut().markers.insert(marker.into());
    }

    fn remove_marker(&mut self, marker: &str) {
        self.inner.borrow_mut().markers.remove(marker);
    }

    fn subscribe_submit(&mut self) {
        self.inner.borrow_mut().submit_hooked = true;
    }

    fn unsubscribe_submit(&mut self) {
        self.inner.borrow_mut().submit_hooked = false;
    }
}
