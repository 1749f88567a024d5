//! Doorbell interrupt handler (top half)
//!
//! Runs in interrupt context on a line the DSP may share with other
//! devices. It only reads and clears CHIPSIG and schedules the drain.
//! The drain is scheduled before CHIPINT0 is cleared: a signal that lands
//! in between is picked up because the drain empties the whole queue.

use alloc::sync::Arc;

use super::doorbell::{Channel, Doorbell};
use super::stats::Counters;
use crate::config::IrqAttribution;
use crate::core::irq::{IrqHandler, IrqNumber, IrqReturn};
use crate::core::workqueue::{WorkItem, WorkQueue};

/// Interrupt action name
pub const IRQ_NAME: &str = "davinci-remoteproc";

/// CHIPINT0 handler
pub struct DoorbellIrq {
    doorbell: Doorbell,
    work: Arc<WorkItem>,
    queue: Arc<dyn WorkQueue>,
    attribution: IrqAttribution,
    counters: Arc<Counters>,
}

impl DoorbellIrq {
    pub(crate) fn new(
        doorbell: Doorbell,
        work: Arc<WorkItem>,
        queue: Arc<dyn WorkQueue>,
        attribution: IrqAttribution,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            doorbell,
            work,
            queue,
            attribution,
            counters,
        }
    }
}

impl IrqHandler for DoorbellIrq {
    fn handle(&self, irq: IrqNumber) -> IrqReturn {
        if !self.doorbell.is_signaled(Channel::Inbound) {
            Counters::bump(&self.counters.foreign_interrupts);
            return match self.attribution {
                IrqAttribution::Strict => IrqReturn::None,
                IrqAttribution::AlwaysHandled => IrqReturn::Handled,
            };
        }

        Counters::bump(&self.counters.interrupts);
        match self.work.schedule(&*self.queue) {
            Ok(true) => log::trace!("IRQ {}: vring drain scheduled", irq),
            Ok(false) => Counters::bump(&self.counters.coalesced),
            Err(err) => {
                Counters::bump(&self.counters.dropped);
                log::error!("IRQ {}: cannot schedule vring drain: {}", irq, err);
            }
        }

        self.doorbell.clear(Channel::Inbound);
        IrqReturn::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workqueue::BoundedWorkQueue;
    use crate::drivers::remoteproc::event::VringEvents;
    use crate::drivers::remoteproc::regs;
    use crate::drivers::remoteproc::testing::{Access, FakeVirtqueues, SysCfg0};
    use crate::Error;
    use test_case::test_case;

    struct Fixture {
        syscfg: Arc<SysCfg0>,
        queue: Arc<BoundedWorkQueue<4>>,
        work: Arc<WorkItem>,
        counters: Arc<Counters>,
        vqs: Arc<FakeVirtqueues>,
    }

    impl Fixture {
        fn new() -> Self {
            let counters = Arc::new(Counters::default());
            let vqs = FakeVirtqueues::with_pending(2);
            let body = Arc::new(VringEvents::new(vqs.clone(), counters.clone()));
            Self {
                syscfg: SysCfg0::new(),
                queue: Arc::new(BoundedWorkQueue::new()),
                work: WorkItem::new("vring", body),
                counters,
                vqs,
            }
        }

        fn handler(&self, attribution: IrqAttribution) -> DoorbellIrq {
            self.handler_on(self.queue.clone(), attribution)
        }

        fn handler_on(&self, queue: Arc<dyn WorkQueue>, attribution: IrqAttribution) -> DoorbellIrq {
            DoorbellIrq::new(
                Doorbell::new(self.syscfg.clone()),
                self.work.clone(),
                queue,
                attribution,
                self.counters.clone(),
            )
        }
    }

    #[test]
    fn test_inbound_signal_schedules_then_clears() {
        let fx = Fixture::new();
        let handler = fx.handler(IrqAttribution::Strict);

        fx.syscfg.raise(Channel::Inbound);
        assert_eq!(handler.handle(28), IrqReturn::Handled);

        assert!(fx.work.is_pending());
        assert!(!fx.syscfg.is_raised(Channel::Inbound));
        assert_eq!(
            fx.syscfg.writes(),
            [Access::Write(regs::CHIPSIG_CLR, Channel::Inbound.mask())]
        );

        // The transport is only touched by the worker.
        assert!(fx.vqs.calls().is_empty());
        assert_eq!(fx.queue.run_pending(), 1);
        assert_eq!(fx.counters.snapshot().messages_drained, 2);
    }

    #[test]
    fn test_repeated_signals_coalesce() {
        let fx = Fixture::new();
        let handler = fx.handler(IrqAttribution::Strict);

        for _ in 0..3 {
            fx.syscfg.raise(Channel::Inbound);
            handler.handle(28);
        }

        let stats = fx.counters.snapshot();
        assert_eq!(stats.interrupts, 3);
        assert_eq!(stats.coalesced, 2);
        assert_eq!(fx.queue.run_pending(), 1);
        assert_eq!(fx.counters.snapshot().drain_passes, 1);
    }

    #[test_case(IrqAttribution::Strict, IrqReturn::None)]
    #[test_case(IrqAttribution::AlwaysHandled, IrqReturn::Handled)]
    fn test_foreign_interrupt(attribution: IrqAttribution, expected: IrqReturn) {
        let fx = Fixture::new();
        let handler = fx.handler(attribution);

        // Outbound bit pending is still not ours to act on here.
        fx.syscfg.raise(Channel::Outbound);
        assert_eq!(handler.handle(28), expected);

        assert!(!fx.work.is_pending());
        assert!(fx.syscfg.writes().is_empty());
        assert_eq!(fx.counters.snapshot().foreign_interrupts, 1);
    }

    struct Full;

    impl WorkQueue for Full {
        fn enqueue(&self, _work: Arc<WorkItem>) -> crate::Result<()> {
            Err(Error::QueueFull)
        }
    }

    #[test]
    fn test_refused_schedule_still_clears() {
        let fx = Fixture::new();
        let handler = fx.handler_on(Arc::new(Full), IrqAttribution::Strict);

        fx.syscfg.raise(Channel::Inbound);
        assert_eq!(handler.handle(28), IrqReturn::Handled);

        assert!(!fx.work.is_pending());
        assert!(!fx.syscfg.is_raised(Channel::Inbound));
        assert_eq!(fx.counters.snapshot().dropped, 1);
    }
}
