//! Per-instance doorbell counters
//!
//! Counters are 32 bits wide so they build for hosts without 64-bit
//! atomics, such as the ARM926EJ-S of the DA850. They wrap on overflow.

use core::sync::atomic::{AtomicU32, Ordering};

/// Snapshot of an instance's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoorbellStats {
    /// Doorbell interrupts taken with CHIPINT0 set
    pub interrupts: u32,
    /// Interrupts on the shared line with CHIPINT0 clear
    pub foreign_interrupts: u32,
    /// Interrupts that merged into an already pending drain
    pub coalesced: u32,
    /// Interrupts whose drain could not be queued
    pub dropped: u32,
    /// Completed drain passes
    pub drain_passes: u32,
    /// Receive entries consumed
    pub messages_drained: u32,
    /// Outbound doorbells rung
    pub kicks: u32,
    /// Kicks abandoned waiting for the DSP to acknowledge
    pub kick_timeouts: u32,
}

/// Live counters shared by the interrupt handler, worker and lifecycle
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) interrupts: AtomicU32,
    pub(crate) foreign_interrupts: AtomicU32,
    pub(crate) coalesced: AtomicU32,
    pub(crate) dropped: AtomicU32,
    pub(crate) drain_passes: AtomicU32,
    pub(crate) messages_drained: AtomicU32,
    pub(crate) kicks: AtomicU32,
    pub(crate) kick_timeouts: AtomicU32,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU32, n: u32) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DoorbellStats {
        DoorbellStats {
            interrupts: self.interrupts.load(Ordering::Relaxed),
            foreign_interrupts: self.foreign_interrupts.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            drain_passes: self.drain_passes.load(Ordering::Relaxed),
            messages_drained: self.messages_drained.load(Ordering::Relaxed),
            kicks: self.kicks.load(Ordering::Relaxed),
            kick_timeouts: self.kick_timeouts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_wrap() {
        let counters = Counters::default();
        counters.kicks.store(u32::MAX, Ordering::Relaxed);
        Counters::bump(&counters.kicks);
        Counters::add(&counters.messages_drained, 3);
        Counters::add(&counters.messages_drained, u32::MAX);

        let stats = counters.snapshot();
        assert_eq!(stats.kicks, 0);
        assert_eq!(stats.messages_drained, 2);
    }
}
