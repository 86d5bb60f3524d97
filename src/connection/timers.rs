//! Owner-scoped timers.
//!
//! Timers are addressed by `(owner, name)` rather than by handle so that a
//! feature module can cancel everything it armed without remembering what
//! that was. Deadlines are plain [`Instant`]s supplied by the caller; the
//! driver sleeps until [`Timers::next_deadline`] and then calls
//! [`Timers::poll_due`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::callbacks::Owner;

/// Identifies one timer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    pub owner: Owner,
    pub name: String,
}

impl TimerKey {
    pub fn new(owner: Owner, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }
}

#[derive(Debug)]
struct Timer {
    deadline: Instant,
    interval: Option<Duration>,
}

/// All armed timers.
#[derive(Debug, Default)]
pub struct Timers {
    timers: HashMap<TimerKey, Timer>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer, replacing any timer with the same key.
    pub fn arm(&mut self, key: TimerKey, now: Instant, delay: Duration) {
        trace!(owner = %key.owner, name = %key.name, ?delay, "timer armed");
        self.timers.insert(
            key,
            Timer {
                deadline: now + delay,
                interval: None,
            },
        );
    }

    /// Arm a timer that fires every `interval`, first at `now + interval`.
    pub fn repeat(&mut self, key: TimerKey, now: Instant, interval: Duration) {
        trace!(owner = %key.owner, name = %key.name, ?interval, "repeating timer armed");
        self.timers.insert(
            key,
            Timer {
                deadline: now + interval,
                interval: Some(interval),
            },
        );
    }

    /// Cancel a timer. Cancelling a timer that is not armed is fine.
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        self.timers.remove(key).is_some()
    }

    /// Cancel every timer armed by `owner`.
    pub fn cancel_owner(&mut self, owner: &Owner) -> usize {
        let before = self.timers.len();
        self.timers.retain(|key, _| key.owner != *owner);
        before - self.timers.len()
    }

    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.timers.contains_key(key)
    }

    pub fn deadline(&self, key: &TimerKey) -> Option<Instant> {
        self.timers.get(key).map(|t| t.deadline)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Earliest deadline among armed timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Collect every timer due at `now`, earliest first.
    ///
    /// One-shot timers are disarmed; repeating timers move to their next
    /// deadline, skipping periods that were missed entirely.
    pub fn poll_due(&mut self, now: Instant) -> Vec<TimerKey> {
        let mut due: Vec<(Instant, TimerKey)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .map(|(k, t)| (t.deadline, k.clone()))
            .collect();
        due.sort();

        for (_, key) in &due {
            let keep = match self.timers.get_mut(key) {
                Some(Timer {
                    deadline,
                    interval: Some(interval),
                }) => {
                    *deadline += *interval;
                    if *deadline <= now {
                        *deadline = now + *interval;
                    }
                    true
                }
                _ => false,
            };
            if !keep {
                self.timers.remove(key);
            }
        }

        due.into_iter().map(|(_, key)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(owner: &'static str, name: &str) -> TimerKey {
        TimerKey::new(Owner::from(owner), name)
    }

    #[test]
    fn one_shot_fires_once() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        timers.arm(key("core", "a"), t0, Duration::from_secs(5));

        assert!(timers.poll_due(t0 + Duration::from_secs(4)).is_empty());
        assert_eq!(timers.poll_due(t0 + Duration::from_secs(5)), [key("core", "a")]);
        assert!(timers.poll_due(t0 + Duration::from_secs(60)).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn repeating_timer_rearms() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        timers.repeat(key("core", "tick"), t0, Duration::from_secs(90));

        assert_eq!(timers.poll_due(t0 + Duration::from_secs(90)).len(), 1);
        assert_eq!(timers.deadline(&key("core", "tick")), Some(t0 + Duration::from_secs(180)));

        // A long stall fires once and skips the missed periods.
        assert_eq!(timers.poll_due(t0 + Duration::from_secs(1000)).len(), 1);
        assert_eq!(timers.deadline(&key("core", "tick")), Some(t0 + Duration::from_secs(1090)));
    }

    #[test]
    fn due_timers_come_out_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        timers.arm(key("m", "late"), t0, Duration::from_secs(3));
        timers.arm(key("m", "early"), t0, Duration::from_secs(1));
        timers.arm(key("m", "mid"), t0, Duration::from_secs(2));
        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_secs(1)));

        let names: Vec<_> = timers
            .poll_due(t0 + Duration::from_secs(3))
            .into_iter()
            .map(|k| k.name)
            .collect();
        assert_eq!(names, ["early", "mid", "late"]);
    }

    #[test]
    fn rearming_replaces_and_cancel_is_idempotent() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        timers.arm(key("core", "x"), t0, Duration::from_secs(1));
        timers.arm(key("core", "x"), t0, Duration::from_secs(10));
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.deadline(&key("core", "x")), Some(t0 + Duration::from_secs(10)));

        assert!(timers.cancel(&key("core", "x")));
        assert!(!timers.cancel(&key("core", "x")));
    }

    #[test]
    fn cancel_owner_sweeps() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        timers.arm(key("quotes", "a"), t0, Duration::from_secs(1));
        timers.repeat(key("quotes", "b"), t0, Duration::from_secs(1));
        timers.arm(key("core", "a"), t0, Duration::from_secs(1));

        assert_eq!(timers.cancel_owner(&Owner::from("quotes")), 2);
        assert_eq!(timers.cancel_owner(&Owner::from("quotes")), 0);
        assert!(timers.is_armed(&key("core", "a")));
    }
}
