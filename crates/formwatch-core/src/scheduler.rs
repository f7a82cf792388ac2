#![forbid(unsafe_code)]

//! Chord suppression and timer deadlines.
//!
//! The scheduler never reads a clock. Callers pass `now` into
//! [`EventScheduler::on_key`] and [`EventScheduler::tick`], and the scheduler
//! answers with what became due.
//!
//! # Chord suppression
//!
//! Holding an excluded key (a modifier such as `shift` or `command`)
//! suspends validation so half-typed shortcuts do not flash errors. The
//! key-up arms a re-enable deadline [`DEBOUNCE_DELAY`] later. Several
//! deadlines may be pending after quick successive releases; the first one
//! to fire lifts the suspension and later ones are no-ops.
//!
//! `tab` is excluded from field-key validation but never suspends.
//!
//! # Poll
//!
//! The poll runs at a fixed interval from the instant passed to
//! [`EventScheduler::start_poll`]. A late tick fires once and skips the missed
//! intervals, keeping the original phase.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, trace};
use web_time::Instant;

use crate::event::{KeyEvent, KeyEventKind, KeyMap};

/// Delay between an excluded key's release and re-enabling validation.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(100);

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Re-enable delay after an excluded key is released.
    pub debounce: Duration,
    /// Poll interval; `None` disables the poll.
    pub poll_interval: Option<Duration>,
    /// Normalized names of excluded keys.
    pub excluded_keys: BTreeSet<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_DELAY,
            poll_interval: None,
            excluded_keys: BTreeSet::new(),
        }
    }
}

/// What a document-level key event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Validation is now suspended.
    Suspend,
    /// A re-enable deadline was armed.
    ArmReenable,
    /// The key does not take part in suppression.
    Ignore,
}

/// Timers that came due on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// At least one re-enable deadline fired.
    pub reenable: bool,
    /// The poll fired.
    pub poll: bool,
}

impl TickOutcome {
    /// Whether anything fired.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !self.reenable && !self.poll
    }
}

/// Owns the suppression flag and every pending deadline.
#[derive(Debug, Clone)]
pub struct EventScheduler {
    config: SchedulerConfig,
    keys: KeyMap,
    suspended: bool,
    pending_reenable: Vec<Instant>,
    poll_running: bool,
    next_poll: Option<Instant>,
}

impl EventScheduler {
    #[must_use]
    pub fn new(config: SchedulerConfig, keys: KeyMap) -> Self {
        Self {
            config,
            keys,
            suspended: false,
            pending_reenable: Vec::new(),
            poll_running: false,
            next_poll: None,
        }
    }

    /// Whether a field key event should reach a filtering trigger.
    #[must_use]
    pub fn passes_key_filter(&self, key: &KeyEvent) -> bool {
        !self.config.excluded_keys.contains(&key.key)
    }

    /// Feed a document-level key event.
    pub fn on_key(&mut self, key: &KeyEvent, now: Instant) -> KeyAction {
        if key.is_tab() || self.passes_key_filter(key) {
            return KeyAction::Ignore;
        }
        match key.kind {
            KeyEventKind::Down => {
                if !self.suspended {
                    debug!(key = %key.key, "validation suspended");
                }
                self.suspended = true;
                KeyAction::Suspend
            }
            KeyEventKind::Up => {
                let deadline = now + self.config.debounce;
                trace!(key = %key.key, pending = self.pending_reenable.len() + 1, "re-enable armed");
                self.pending_reenable.push(deadline);
                KeyAction::ArmReenable
            }
        }
    }

    /// Fire every deadline at or before `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        let before = self.pending_reenable.len();
        self.pending_reenable.retain(|deadline| *deadline > now);
        if self.pending_reenable.len() < before {
            outcome.reenable = true;
            if self.suspended {
                debug!("validation re-enabled");
            }
            self.suspended = false;
        }

        if self.poll_running
            && let Some(interval) = self.config.poll_interval
            && let Some(due) = self.next_poll
            && due <= now
        {
            self.next_poll = Some(next_after(due, interval, now));
            outcome.poll = true;
        }

        outcome
    }

    /// Start the poll; the first firing is one interval after `now`.
    /// No-op without an interval or when already running.
    pub fn start_poll(&mut self, now: Instant) {
        let Some(interval) = self.config.poll_interval else {
            return;
        };
        if self.poll_running {
            return;
        }
        self.poll_running = true;
        self.next_poll = Some(now + interval);
        trace!(interval_ms = interval.as_millis() as u64, "poll armed");
    }

    /// Cancel every timer and lift the suspension.
    pub fn stop(&mut self) {
        self.suspended = false;
        self.pending_reenable.clear();
        self.poll_running = false;
        self.next_poll = None;
    }

    /// Earliest pending deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_reenable
            .iter()
            .copied()
            .chain(self.next_poll)
            .min()
    }

    /// Number of armed re-enable deadlines.
    #[must_use]
    pub fn pending_reenables(&self) -> usize {
        self.pending_reenable.len()
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poll_running
    }

    #[must_use]
    pub fn key_map(&self) -> &KeyMap {
        &self.keys
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

/// First deadline on the `due + k * interval` grid strictly after `now`.
fn next_after(due: Instant, interval: Duration, now: Instant) -> Instant {
    let step = interval.as_nanos().max(1);
    let rem = now.duration_since(due).as_nanos() % step;
    let rem = Duration::from_nanos(u64::try_from(rem).unwrap_or(u64::MAX));
    now + (interval.max(Duration::from_nanos(1)) - rem)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_50: Duration = Duration::from_millis(50);
    const MS_100: Duration = Duration::from_millis(100);

    fn scheduler(poll: Option<Duration>) -> EventScheduler {
        let config = SchedulerConfig {
            poll_interval: poll,
            excluded_keys: ["shift", "tab", "left"].into_iter().map(String::from).collect(),
            ..SchedulerConfig::default()
        };
        EventScheduler::new(config, KeyMap::default())
    }

    #[test]
    fn excluded_key_down_suspends() {
        let mut s = scheduler(None);
        let t = Instant::now();
        assert_eq!(s.on_key(&KeyEvent::down("shift"), t), KeyAction::Suspend);
        assert!(s.is_suspended());
    }

    #[test]
    fn tab_never_suspends() {
        let mut s = scheduler(None);
        let t = Instant::now();
        assert_eq!(s.on_key(&KeyEvent::down("tab"), t), KeyAction::Ignore);
        assert!(!s.is_suspended());
        assert!(!s.passes_key_filter(&KeyEvent::up("tab")));
    }

    #[test]
    fn ordinary_keys_are_ignored() {
        let mut s = scheduler(None);
        let t = Instant::now();
        assert_eq!(s.on_key(&KeyEvent::down("a"), t), KeyAction::Ignore);
        assert!(s.passes_key_filter(&KeyEvent::up("a")));
    }

    #[test]
    fn release_reenables_after_debounce() {
        let mut s = scheduler(None);
        let t = Instant::now();
        s.on_key(&KeyEvent::down("shift"), t);
        assert_eq!(s.on_key(&KeyEvent::up("shift"), t), KeyAction::ArmReenable);
        assert!(s.tick(t + MS_50).is_idle());
        assert!(s.is_suspended());
        let outcome = s.tick(t + MS_100);
        assert!(outcome.reenable);
        assert!(!s.is_suspended());
    }

    #[test]
    fn overlapping_releases_fire_idempotently() {
        let mut s = scheduler(None);
        let t = Instant::now();
        s.on_key(&KeyEvent::down("shift"), t);
        s.on_key(&KeyEvent::up("shift"), t);
        s.on_key(&KeyEvent::down("left"), t + MS_50);
        s.on_key(&KeyEvent::up("left"), t + MS_50);
        assert_eq!(s.pending_reenables(), 2);

        assert!(s.tick(t + MS_100).reenable);
        assert!(!s.is_suspended());
        assert_eq!(s.pending_reenables(), 1);

        assert!(s.tick(t + MS_100 + MS_50).reenable);
        assert!(!s.is_suspended());
        assert_eq!(s.pending_reenables(), 0);
    }

    #[test]
    fn poll_is_armed_at_start() {
        let mut s = scheduler(Some(Duration::from_secs(1)));
        let t = Instant::now();
        s.start_poll(t);
        assert!(s.is_polling());
        assert_eq!(s.next_deadline(), Some(t + Duration::from_secs(1)));
        assert!(!s.tick(t).poll);
        assert!(!s.tick(t + Duration::from_millis(999)).poll);
        assert!(s.tick(t + Duration::from_secs(1)).poll);
        assert!(!s.tick(t + Duration::from_millis(1500)).poll);
        assert!(s.tick(t + Duration::from_secs(2)).poll);
    }

    #[test]
    fn late_poll_fires_once() {
        let mut s = scheduler(Some(Duration::from_secs(1)));
        let t = Instant::now();
        s.start_poll(t);
        assert!(s.tick(t + Duration::from_millis(3500)).poll);
        assert!(!s.tick(t + Duration::from_millis(3900)).poll);
        assert_eq!(s.next_deadline(), Some(t + Duration::from_secs(4)));
    }

    #[test]
    fn long_gap_keeps_phase() {
        let mut s = scheduler(Some(Duration::from_millis(1)));
        let t = Instant::now();
        s.start_poll(t);
        let week = Duration::from_secs(7 * 24 * 3600);
        assert!(s.tick(t + week + Duration::from_micros(400)).poll);
        assert_eq!(s.next_deadline(), Some(t + week + Duration::from_millis(1)));
        assert!(!s.tick(t + week + Duration::from_micros(900)).poll);
        assert!(s.tick(t + week + Duration::from_millis(1)).poll);
    }

    #[test]
    fn next_after_lands_on_grid() {
        let t = Instant::now();
        let second = Duration::from_secs(1);
        assert_eq!(next_after(t, second, t), t + second);
        assert_eq!(next_after(t, second, t + Duration::from_millis(2500)), t + Duration::from_secs(3));
        assert_eq!(next_after(t, second, t + Duration::from_secs(2)), t + Duration::from_secs(3));
    }

    #[test]
    fn poll_disabled_without_interval() {
        let mut s = scheduler(None);
        let t = Instant::now();
        s.start_poll(t);
        assert!(!s.is_polling());
        assert!(s.next_deadline().is_none());
        assert!(!s.tick(t + Duration::from_secs(10)).poll);
    }

    #[test]
    fn stop_cancels_everything() {
        let mut s = scheduler(Some(Duration::from_secs(1)));
        let t = Instant::now();
        s.start_poll(t);
        s.on_key(&KeyEvent::down("shift"), t);
        s.on_key(&KeyEvent::up("shift"), t);
        s.stop();
        assert!(!s.is_suspended());
        assert_eq!(s.pending_reenables(), 0);
        assert!(s.next_deadline().is_none());
        assert!(s.tick(t + Duration::from_secs(5)).is_idle());
    }

    #[test]
    fn next_deadline_is_earliest() {
        let mut s = scheduler(Some(Duration::from_secs(1)));
        let t = Instant::now();
        s.start_poll(t);
        s.on_key(&KeyEvent::up("shift"), t);
        assert_eq!(s.next_deadline(), Some(t + MS_100));
    }
}
