//! Bounded exponential spin backoff
//!
//! Used where the host has to poll a bit that only the coprocessor can
//! clear. Each [`Backoff::snooze`] spins twice as long as the previous one,
//! up to a ceiling, and counts against an optional poll budget.
//!
//! The budget counts polls, not time. Once the ceiling is reached every
//! poll costs `MAX_SPINS` spin-loop hints, so the wall-clock length of a
//! bounded wait depends on the core clock. [`Backoff::spin_budget`] gives
//! the total spin count for a budget.

use super::spin;

/// Spin count of the first snooze
const INITIAL_SPINS: u32 = 1;

/// Ceiling for a single snooze
const MAX_SPINS: u32 = 1 << 10;

/// Exponential backoff state for one wait loop
#[derive(Debug, Clone)]
pub struct Backoff {
    spins: u32,
    polls: u32,
    limit: Option<u32>,
}

impl Backoff {
    /// Backoff that gives up after `max_polls` snoozes
    pub const fn bounded(max_polls: u32) -> Self {
        Self {
            spins: INITIAL_SPINS,
            polls: 0,
            limit: Some(max_polls),
        }
    }

    /// Backoff that never gives up
    pub const fn unbounded() -> Self {
        Self {
            spins: INITIAL_SPINS,
            polls: 0,
            limit: None,
        }
    }

    /// Number of snoozes taken so far
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// True once the poll budget is used up
    pub fn is_exhausted(&self) -> bool {
        matches!(self.limit, Some(limit) if self.polls >= limit)
    }

    /// Wait before the next poll
    ///
    /// Returns `false` without waiting when the budget is exhausted.
    pub fn snooze(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        spin(self.spins);
        self.spins = (self.spins << 1).min(MAX_SPINS);
        self.polls = self.polls.saturating_add(1);
        true
    }

    /// Total spin-loop hints issued by `max_polls` snoozes
    pub const fn spin_budget(max_polls: u32) -> u64 {
        let mut total = 0u64;
        let mut spins = INITIAL_SPINS;
        let mut polls = 0;
        while polls < max_polls && spins < MAX_SPINS {
            total += spins as u64;
            spins <<= 1;
            polls += 1;
        }
        total + (max_polls - polls) as u64 * MAX_SPINS as u64
    }
}
