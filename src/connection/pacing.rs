//! Outbound flood control.
//!
//! Mirrors the usual server-side penalty clock: each line pushes a budget
//! clock forward by `2 + len / 120` seconds and the server starts dropping
//! or disconnecting once that clock runs more than ten seconds ahead of real
//! time. The pacer keeps the budget inside that window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How far the budget clock may run ahead of real time.
pub const PACE_WINDOW: Duration = Duration::from_secs(10);

/// Budget consumed by a line of `len` bytes.
pub fn line_cost(len: usize) -> Duration {
    Duration::from_secs(2 + (len / 120) as u64)
}

/// Queue of paced lines plus the budget clock.
#[derive(Debug, Default)]
pub struct Pacer {
    queue: VecDeque<String>,
    budget: Option<Instant>,
}

impl Pacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, line: String) {
        self.queue.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Release every queued line the budget allows at `now`.
    pub fn pump(&mut self, now: Instant) -> Vec<String> {
        let mut budget = self.budget.map_or(now, |b| b.max(now));
        let mut out = Vec::new();
        while budget < now + PACE_WINDOW {
            let Some(line) = self.queue.pop_front() else {
                break;
            };
            budget += line_cost(line.len());
            out.push(line);
        }
        self.budget = Some(budget);
        out
    }

    /// When the next queued line may go out, or `None` with an empty queue.
    pub fn next_ready(&self, now: Instant) -> Option<Instant> {
        if self.queue.is_empty() {
            return None;
        }
        // The budget must be strictly inside the window.
        match self.budget.and_then(|b| b.checked_sub(PACE_WINDOW)) {
            Some(at) if at >= now => Some(at + Duration::from_millis(1)),
            _ => Some(now),
        }
    }

    /// Drop every queued line and the spent budget, returning how many lines
    /// were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        self.budget = None;
        dropped
    }
}
