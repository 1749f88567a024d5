//! Vring event handling (bottom half)
//!
//! One pass drains the receive virtqueue until the transport reports it
//! empty, then pokes the transmit virtqueue once so DSP-side senders
//! blocked on buffer space can make progress. The pass has no count bound:
//! a DSP that keeps posting keeps the worker busy.

use alloc::sync::Arc;

use super::stats::Counters;
use super::{Virtqueues, RX_VQ, TX_VQ};
use crate::core::workqueue::Runnable;

/// Work body run for each scheduled drain
pub struct VringEvents {
    vqs: Arc<dyn Virtqueues>,
    counters: Arc<Counters>,
}

impl VringEvents {
    pub(crate) fn new(vqs: Arc<dyn Virtqueues>, counters: Arc<Counters>) -> Self {
        Self { vqs, counters }
    }

    /// Run one drain pass, returning the number of receive entries consumed
    pub fn drain(&self) -> u32 {
        let mut drained = 0u32;
        while self.vqs.try_pop_one(RX_VQ) {
            drained = drained.wrapping_add(1);
        }

        // Unconditional: a sender may be waiting for buffers even when
        // nothing came in.
        self.vqs.notify_release(TX_VQ);

        Counters::add(&self.counters.messages_drained, drained);
        Counters::bump(&self.counters.drain_passes);
        log::trace!("vring drain: {} message(s)", drained);
        drained
    }
}

impl Runnable for VringEvents {
    fn run(&self) {
        self.drain();
    }
}
