//! DaVinci (DA850 / OMAP-L138) DSP remote processor driver
//!
//! The C674x DSP is held in local reset by the power/sleep controller
//! while the host programs its boot address in SYSCFG0 `HOST1CFG`. The
//! two sides then signal each other through the SYSCFG0 CHIPSIG bits:
//!
//! - CHIPINT0, DSP to host: raises the doorbell interrupt, drained by a
//!   deferred [`VringEvents`] pass
//! - CHIPINT2, host to DSP: rung by [`DavinciRproc::kick`], cleared by the
//!   DSP when it has seen it
//!
//! Each instance owns its doorbell, reset line, work item and interrupt
//! registration, so several DSPs can be driven side by side.

use alloc::boxed::Box;
use alloc::sync::Arc;

use super::doorbell::{Channel, Doorbell};
use super::event::VringEvents;
use super::irq::{DoorbellIrq, IRQ_NAME};
use super::regs::{self, BOOT_ADDR_ALIGN};
use super::reset::LocalReset;
use super::stats::{Counters, DoorbellStats};
use super::{RprocFramework, RprocHandle, RprocOps, RprocState, Virtqueues};
use crate::arch::{MmioAccess, MmioRegion};
use crate::config::{DavinciRprocConfig, KickPolicy, SocConfig};
use crate::core::irq::{IrqFlags, IrqRegistry, IrqToken};
use crate::core::sync::SpinLock;
use crate::core::workqueue::{WorkItem, WorkQueue};
use crate::drivers::clock::{Clock, ClockProvider};
use crate::drivers::platform::{dma_bit_mask, PlatformDevice};
use crate::utils::Backoff;
use crate::{Error, Resource, Result};

/// Platform driver name
pub const DRIVER_NAME: &str = "davinci-rproc";

/// Coherent DMA mask width; the DSP sees a 32-bit bus
const DMA_MASK_BITS: u32 = 32;

/// Services and register windows an instance runs on
#[derive(Clone)]
pub struct DavinciResources {
    /// SYSCFG0 block
    pub syscfg0: Arc<dyn MmioAccess>,
    /// Power/sleep controller owning the DSP module
    pub psc: Arc<dyn MmioAccess>,
    /// Clock lookup
    pub clocks: Arc<dyn ClockProvider>,
    /// Interrupt line registration
    pub irqs: Arc<dyn IrqRegistry>,
    /// Worker the vring drain runs on
    pub workqueue: Arc<dyn WorkQueue>,
    /// Virtqueue transport
    pub vqs: Arc<dyn Virtqueues>,
}

/// Map the SYSCFG0 and PSC windows described by `soc`
///
/// # Safety
/// The physical bases in `soc` must be identity mapped device memory that
/// stays mapped for as long as the returned regions live.
pub unsafe fn map_registers(
    soc: &SocConfig,
) -> Result<(Arc<dyn MmioAccess>, Arc<dyn MmioAccess>)> {
    let syscfg0 = MmioRegion::from_addr(soc.syscfg0_base, regs::SYSCFG0_SIZE)
        .ok_or(Error::InvalidArgument)?;
    let psc = MmioRegion::from_addr(soc.psc_base, regs::PSC_SIZE).ok_or(Error::InvalidArgument)?;

    log::debug!(
        "SYSCFG0 at {:#x}, PSC at {:#x}",
        syscfg0.base_address(),
        psc.base_address()
    );
    Ok((Arc::new(syscfg0), Arc::new(psc)))
}

/// Mutable lifecycle state, guarded by the instance lock
struct Lifecycle {
    state: RprocState,
    /// Acquired DSP clock; enabled only while `Running`
    clock: Option<Box<dyn Clock>>,
    /// Doorbell handler registration
    irq: Option<IrqToken>,
    boot_addr: Option<u32>,
}

/// One DSP instance
pub struct DavinciRproc {
    config: DavinciRprocConfig,
    doorbell: Doorbell,
    reset: LocalReset,
    clocks: Arc<dyn ClockProvider>,
    irqs: Arc<dyn IrqRegistry>,
    handler: Arc<DoorbellIrq>,
    work: Arc<WorkItem>,
    counters: Arc<Counters>,
    lifecycle: SpinLock<Lifecycle>,
}

impl DavinciRproc {
    /// Build a halted instance
    ///
    /// Touches no hardware; [`probe`] asserts the local reset once the
    /// instance is registered.
    pub fn new(config: DavinciRprocConfig, resources: DavinciResources) -> Result<Arc<Self>> {
        config.validate()?;

        let counters = Arc::new(Counters::default());
        let doorbell = Doorbell::new(resources.syscfg0);
        let events = Arc::new(VringEvents::new(resources.vqs, counters.clone()));
        let work = WorkItem::new("davinci-vring", events);
        let handler = Arc::new(DoorbellIrq::new(
            doorbell.clone(),
            work.clone(),
            resources.workqueue,
            config.attribution,
            counters.clone(),
        ));

        Ok(Arc::new(Self {
            doorbell,
            reset: LocalReset::new(resources.psc, config.soc.dsp_lpsc),
            clocks: resources.clocks,
            irqs: resources.irqs,
            handler,
            work,
            counters,
            lifecycle: SpinLock::new(Lifecycle {
                state: RprocState::Halted,
                clock: None,
                irq: None,
                boot_addr: None,
            }),
            config,
        }))
    }

    /// Remote processor name
    pub fn name(&self) -> &'static str {
        self.config.pdata.name
    }

    /// Driver configuration
    pub fn config(&self) -> &DavinciRprocConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> RprocState {
        self.lifecycle.lock().state
    }

    /// Boot address of the last successful start
    pub fn boot_address(&self) -> Option<u32> {
        self.lifecycle.lock().boot_addr
    }

    /// Check if the doorbell handler is registered
    pub fn irq_registered(&self) -> bool {
        self.lifecycle.lock().irq.is_some()
    }

    /// Counter snapshot
    pub fn stats(&self) -> DoorbellStats {
        self.counters.snapshot()
    }

    /// Release the DSP from reset at `boot_addr`
    ///
    /// `boot_addr` must be 1 KiB aligned. A failure leaves the DSP halted;
    /// an interrupt registration or clock acquired before the failing step
    /// is kept and reused by the next start.
    pub fn start(&self, boot_addr: u32) -> Result<()> {
        if !is_aligned!(boot_addr, BOOT_ADDR_ALIGN) {
            log::error!(
                "{}: invalid boot address {:#010x}, must be 1 KiB aligned",
                self.name(),
                boot_addr
            );
            return Err(Error::Configuration(boot_addr));
        }

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != RprocState::Halted {
            log::warn!("{}: start while running", self.name());
            return Err(Error::InvalidState);
        }

        // The boot address and clock may only change under reset.
        self.reset.assert();

        if lifecycle.irq.is_none() {
            let irq = self.config.soc.irq;
            let token = self
                .irqs
                .request_irq(irq, IrqFlags::SHARED, IRQ_NAME, self.handler.clone())
                .map_err(|err| {
                    log::error!("{}: request_irq({}) failed: {}", self.name(), irq, err);
                    Error::ResourceAcquisition(Resource::IrqLine(irq))
                })?;
            lifecycle.irq = Some(token);
        }

        let clock = match lifecycle.clock.take() {
            Some(clock) => clock,
            None => self.clocks.get(self.config.pdata.clk_name).map_err(|err| {
                log::error!("{}: clock '{}': {}", self.name(), self.config.pdata.clk_name, err);
                Error::ResourceAcquisition(Resource::Clock)
            })?,
        };
        let clock = lifecycle.clock.insert(clock);

        self.doorbell.program_boot_address(boot_addr);

        clock.enable().map_err(|err| {
            log::error!("{}: clock enable failed: {}", self.name(), err);
            Error::ResourceAcquisition(Resource::Clock)
        })?;

        self.reset.release();

        lifecycle.state = RprocState::Running;
        lifecycle.boot_addr = Some(boot_addr);
        log::info!("{}: started at {:#010x}", self.name(), boot_addr);
        Ok(())
    }

    /// Halt the DSP and release its clock and interrupt line
    ///
    /// Returns only once no vring drain is running or will run, so the
    /// transport is not touched after this call.
    pub fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != RprocState::Running {
            log::warn!("{}: stop while halted", self.name());
            return Err(Error::InvalidState);
        }

        self.reset.assert();

        // No new drains can be scheduled once the handler is gone.
        if let Some(token) = lifecycle.irq.take() {
            if let Err(err) = self.irqs.free_irq(token) {
                log::warn!("{}: free_irq failed: {}", self.name(), err);
            }
        }
        self.work.flush();

        if let Some(mut clock) = lifecycle.clock.take() {
            clock.disable();
            clock.release();
        }

        lifecycle.state = RprocState::Halted;
        log::info!("{}: stopped", self.name());
        Ok(())
    }

    /// Ring the DSP's doorbell for virtqueue `vqid`
    ///
    /// Waits for the DSP to acknowledge the previous kick first. The
    /// outbound bit is never written while it is still set.
    pub fn kick(&self, vqid: usize) -> Result<()> {
        let mut backoff = match self.config.kick {
            KickPolicy::Bounded { max_polls } => Backoff::bounded(max_polls),
            KickPolicy::Unbounded => Backoff::unbounded(),
        };

        while self.doorbell.is_signaled(Channel::Outbound) {
            if !backoff.snooze() {
                Counters::bump(&self.counters.kick_timeouts);
                log::warn!(
                    "{}: kick vq {}: no acknowledge after {} polls",
                    self.name(),
                    vqid,
                    backoff.polls()
                );
                return Err(Error::TimedOut);
            }
        }

        self.doorbell.signal(Channel::Outbound);
        Counters::bump(&self.counters.kicks);
        log::trace!("{}: kicked vq {}", self.name(), vqid);
        Ok(())
    }

    /// Put a halted DSP in reset without touching anything else
    fn hold_in_reset(&self) {
        let lifecycle = self.lifecycle.lock();
        if lifecycle.state == RprocState::Halted {
            self.reset.assert();
        }
    }

    /// Drop resources a failed start left behind
    fn release_leftovers(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if let Some(token) = lifecycle.irq.take() {
            if let Err(err) = self.irqs.free_irq(token) {
                log::warn!("{}: free_irq failed: {}", self.name(), err);
            }
            self.work.flush();
        }
        if let Some(clock) = lifecycle.clock.take() {
            clock.release();
        }
    }
}

impl RprocOps for DavinciRproc {
    fn start(&self, boot_addr: u32) -> Result<()> {
        DavinciRproc::start(self, boot_addr)
    }

    fn stop(&self) -> Result<()> {
        DavinciRproc::stop(self)
    }

    fn kick(&self, vqid: usize) -> Result<()> {
        DavinciRproc::kick(self, vqid)
    }
}

/// A DSP registered with the remote processor framework
pub struct RegisteredRproc {
    rproc: Arc<DavinciRproc>,
    framework: Arc<dyn RprocFramework>,
    handle: RprocHandle,
}

impl RegisteredRproc {
    /// The driven instance
    pub fn rproc(&self) -> &Arc<DavinciRproc> {
        &self.rproc
    }

    /// Framework handle
    pub fn handle(&self) -> &RprocHandle {
        &self.handle
    }

    /// Unbind the device
    ///
    /// A running DSP is stopped first. The handle is freed even if the
    /// framework fails to unregister it; that error is returned.
    pub fn remove(self) -> Result<()> {
        let Self {
            rproc,
            framework,
            handle,
        } = self;

        if rproc.state() == RprocState::Running {
            log::warn!("{}: removed while running, stopping", rproc.name());
            if let Err(err) = rproc.stop() {
                log::error!("{}: stop on remove failed: {}", rproc.name(), err);
            }
        }
        rproc.release_leftovers();

        let ret = framework.unregister(&handle);
        if let Err(err) = ret {
            log::error!("{}: unregister failed: {}", rproc.name(), err);
        }
        framework.free(handle);
        log::info!("{}: removed", rproc.name());
        ret
    }
}

/// Bind the DSP remote processor to `device`
///
/// Restricts coherent DMA to 32 bits, hands a new instance to `framework`
/// and finally asserts the DSP's local reset so it stays halted until the
/// framework starts it.
pub fn probe(
    device: &dyn PlatformDevice,
    framework: Arc<dyn RprocFramework>,
    config: DavinciRprocConfig,
    resources: DavinciResources,
) -> Result<RegisteredRproc> {
    log::debug!("{}: probing {}", DRIVER_NAME, device.name());

    device.set_coherent_dma_mask(DMA_MASK_BITS).map_err(|err| {
        log::error!(
            "{}: coherent DMA mask {:#x} rejected: {}",
            device.name(),
            dma_bit_mask(DMA_MASK_BITS),
            err
        );
        err
    })?;

    let rproc = DavinciRproc::new(config, resources)?;
    let pdata = config.pdata;

    let handle = framework
        .alloc(pdata.name, rproc.clone(), pdata.firmware)
        .map_err(|err| {
            log::error!("{}: rproc alloc failed: {}", pdata.name, err);
            Error::Allocation
        })?;

    if let Err(err) = framework.register(&handle) {
        log::error!("{}: rproc register failed: {}", pdata.name, err);
        framework.free(handle);
        return Err(Error::Registration);
    }

    rproc.hold_in_reset();
    log::info!("{}: registered, firmware '{}'", pdata.name, pdata.firmware);

    Ok(RegisteredRproc {
        rproc,
        framework,
        handle,
    })
}
