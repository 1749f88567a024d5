//! Test doubles for the DSP driver
//!
//! Register-file models of SYSCFG0 and the PSC, plus fake clock, transport,
//! framework and platform device services that record how they were used.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;

use super::doorbell::Channel;
use super::regs;
use super::{RprocFramework, RprocHandle, RprocOps, Virtqueues};
use crate::arch::MmioAccess;
use crate::drivers::clock::{Clock, ClockProvider};
use crate::drivers::platform::PlatformDevice;
use crate::{Error, Resource, Result};

/// A recorded register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(usize, u32),
    Write(usize, u32),
}

#[derive(Default)]
struct SysCfg0State {
    host1cfg: u32,
    chipsig: u32,
    /// Reads of CHIPSIG that still see the outbound bit before the DSP acks
    ack_after: Option<u32>,
    log: Vec<Access>,
}

/// SYSCFG0 model: write-1-to-set CHIPSIG, write-1-to-clear CHIPSIG_CLR
#[derive(Default)]
pub struct SysCfg0 {
    state: Mutex<SysCfg0State>,
}

impl SysCfg0 {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// DSP side raises a channel; not logged
    pub fn raise(&self, channel: Channel) {
        self.state.lock().unwrap().chipsig |= channel.mask();
    }

    /// DSP side acknowledges the outbound channel; not logged
    pub fn dsp_ack(&self) {
        self.state.lock().unwrap().chipsig &= !Channel::Outbound.mask();
    }

    /// Have the DSP ack the outbound channel after `reads` more CHIPSIG reads
    pub fn ack_outbound_after(&self, reads: u32) {
        self.state.lock().unwrap().ack_after = Some(reads);
    }

    pub fn is_raised(&self, channel: Channel) -> bool {
        self.state.lock().unwrap().chipsig & channel.mask() != 0
    }

    pub fn boot_address(&self) -> u32 {
        self.state.lock().unwrap().host1cfg
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn writes(&self) -> Vec<Access> {
        self.accesses()
            .into_iter()
            .filter(|access| matches!(access, Access::Write(..)))
            .collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }
}

impl MmioAccess for SysCfg0 {
    fn read_u32(&self, offset: usize) -> u32 {
        let mut state = self.state.lock().unwrap();
        let value = match offset {
            regs::HOST1CFG => state.host1cfg,
            regs::CHIPSIG => {
                match state.ack_after {
                    Some(0) => {
                        state.chipsig &= !Channel::Outbound.mask();
                        state.ack_after = None;
                    }
                    Some(n) => state.ack_after = Some(n - 1),
                    None => {}
                }
                state.chipsig
            }
            _ => 0,
        };
        state.log.push(Access::Read(offset, value));
        value
    }

    fn write_u32(&self, offset: usize, value: u32) {
        let mut state = self.state.lock().unwrap();
        match offset {
            regs::HOST1CFG => state.host1cfg = value,
            regs::CHIPSIG => state.chipsig |= value & 0xf,
            regs::CHIPSIG_CLR => state.chipsig &= !value,
            _ => panic!("write to unmodelled SYSCFG0 offset {:#x}", offset),
        }
        state.log.push(Access::Write(offset, value));
    }
}

/// PSC model: plain registers with a write log
#[derive(Default)]
pub struct Psc {
    regs: Mutex<HashMap<usize, u32>>,
    log: Mutex<Vec<Access>>,
}

impl Psc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mdctl(&self, lpsc: u32) -> u32 {
        self.regs
            .lock()
            .unwrap()
            .get(&regs::mdctl(lpsc))
            .copied()
            .unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<Access> {
        self.log.lock().unwrap().clone()
    }
}

impl MmioAccess for Psc {
    fn read_u32(&self, offset: usize) -> u32 {
        self.regs.lock().unwrap().get(&offset).copied().unwrap_or(0)
    }

    fn write_u32(&self, offset: usize, value: u32) {
        self.regs.lock().unwrap().insert(offset, value);
        self.log.lock().unwrap().push(Access::Write(offset, value));
    }
}

/// Clock usage counters shared by a provider and its handles
#[derive(Default)]
struct ClockLog {
    gets: AtomicUsize,
    enables: AtomicUsize,
    disables: AtomicUsize,
    releases: AtomicUsize,
    enabled: AtomicBool,
}

/// Clock provider with a single clock
pub struct FakeClocks {
    name: &'static str,
    available: AtomicBool,
    fail_enable: Arc<AtomicBool>,
    log: Arc<ClockLog>,
}

impl FakeClocks {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            available: AtomicBool::new(true),
            fail_enable: Arc::new(AtomicBool::new(false)),
            log: Arc::new(ClockLog::default()),
        })
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_fail_enable(&self, fail: bool) {
        self.fail_enable.store(fail, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.log.gets.load(Ordering::SeqCst)
    }

    pub fn enables(&self) -> usize {
        self.log.enables.load(Ordering::SeqCst)
    }

    pub fn disables(&self) -> usize {
        self.log.disables.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.log.releases.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.log.enabled.load(Ordering::SeqCst)
    }
}

impl ClockProvider for FakeClocks {
    fn get(&self, name: &str) -> Result<Box<dyn Clock>> {
        if name != self.name || !self.available.load(Ordering::SeqCst) {
            return Err(Error::ResourceAcquisition(Resource::Clock));
        }
        self.log.gets.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeClock {
            log: self.log.clone(),
            fail_enable: self.fail_enable.clone(),
        }))
    }
}

struct FakeClock {
    log: Arc<ClockLog>,
    fail_enable: Arc<AtomicBool>,
}

impl Clock for FakeClock {
    fn enable(&mut self) -> Result<()> {
        if self.fail_enable.load(Ordering::SeqCst) {
            return Err(Error::ResourceAcquisition(Resource::Clock));
        }
        self.log.enables.fetch_add(1, Ordering::SeqCst);
        self.log.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&mut self) {
        self.log.disables.fetch_add(1, Ordering::SeqCst);
        self.log.enabled.store(false, Ordering::SeqCst);
    }

    fn release(self: Box<Self>) {
        self.log.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// A recorded transport call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VqCall {
    /// `try_pop_one(index)` and its result
    Pop(usize, bool),
    Release(usize),
}

/// Transport holding a count of pending receive entries
pub struct FakeVirtqueues {
    pending: AtomicUsize,
    calls: Mutex<Vec<VqCall>>,
    gate_open: AtomicBool,
    in_pop: AtomicBool,
}

impl FakeVirtqueues {
    pub fn with_pending(pending: usize) -> Arc<Self> {
        Arc::new(Self {
            pending: AtomicUsize::new(pending),
            calls: Mutex::new(Vec::new()),
            gate_open: AtomicBool::new(true),
            in_pop: AtomicBool::new(false),
        })
    }

    /// Transport whose pops block until [`FakeVirtqueues::open_gate`]
    pub fn gated(pending: usize) -> Arc<Self> {
        let vqs = Self::with_pending(pending);
        vqs.gate_open.store(false, Ordering::SeqCst);
        vqs
    }

    /// DSP posts `n` more receive entries
    pub fn post(&self, n: usize) {
        self.pending.fetch_add(n, Ordering::SeqCst);
    }

    pub fn open_gate(&self) {
        self.gate_open.store(true, Ordering::SeqCst);
    }

    /// Spin until a pop is blocked on the gate
    pub fn wait_in_pop(&self) {
        while !self.in_pop.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    }

    pub fn calls(&self) -> Vec<VqCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn releases(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, VqCall::Release(_)))
            .count()
    }

    pub fn remaining(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Virtqueues for FakeVirtqueues {
    fn try_pop_one(&self, index: usize) -> bool {
        self.in_pop.store(true, Ordering::SeqCst);
        while !self.gate_open.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        self.in_pop.store(false, Ordering::SeqCst);

        let popped = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        self.calls.lock().unwrap().push(VqCall::Pop(index, popped));
        popped
    }

    fn notify_release(&self, index: usize) {
        self.calls.lock().unwrap().push(VqCall::Release(index));
    }
}

/// A recorded framework call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwCall {
    Alloc(&'static str, &'static str),
    Register(u32),
    Unregister(u32),
    Free(u32),
}

/// Remote processor framework that records calls and keeps the ops
#[derive(Default)]
pub struct FakeFramework {
    fail_alloc: AtomicBool,
    fail_register: AtomicBool,
    next_id: AtomicU32,
    calls: Mutex<Vec<FwCall>>,
    ops: Mutex<Option<Arc<dyn RprocOps>>>,
}

impl FakeFramework {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_alloc(&self, fail: bool) {
        self.fail_alloc.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<FwCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Operations handed over at alloc, dropped again at free
    pub fn ops(&self) -> Option<Arc<dyn RprocOps>> {
        self.ops.lock().unwrap().clone()
    }
}

impl RprocFramework for FakeFramework {
    fn alloc(
        &self,
        name: &'static str,
        ops: Arc<dyn RprocOps>,
        firmware: &'static str,
    ) -> Result<RprocHandle> {
        self.calls.lock().unwrap().push(FwCall::Alloc(name, firmware));
        if self.fail_alloc.load(Ordering::SeqCst) {
            return Err(Error::Allocation);
        }
        *self.ops.lock().unwrap() = Some(ops);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(RprocHandle::new(id, name, firmware))
    }

    fn register(&self, handle: &RprocHandle) -> Result<()> {
        self.calls.lock().unwrap().push(FwCall::Register(handle.id()));
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(Error::Registration);
        }
        Ok(())
    }

    fn unregister(&self, handle: &RprocHandle) -> Result<()> {
        self.calls.lock().unwrap().push(FwCall::Unregister(handle.id()));
        Ok(())
    }

    fn free(&self, handle: RprocHandle) {
        self.calls.lock().unwrap().push(FwCall::Free(handle.id()));
        *self.ops.lock().unwrap() = None;
    }
}

/// Platform device recording its DMA mask
#[derive(Default)]
pub struct FakeDevice {
    reject_dma: AtomicBool,
    dma_bits: Mutex<Option<u32>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_dma() -> Self {
        let device = Self::default();
        device.reject_dma.store(true, Ordering::SeqCst);
        device
    }

    pub fn dma_bits(&self) -> Option<u32> {
        *self.dma_bits.lock().unwrap()
    }
}

impl PlatformDevice for FakeDevice {
    fn name(&self) -> &str {
        "davinci-rproc.0"
    }

    fn set_coherent_dma_mask(&self, bits: u32) -> Result<()> {
        if self.reject_dma.load(Ordering::SeqCst) {
            return Err(Error::InvalidArgument);
        }
        *self.dma_bits.lock().unwrap() = Some(bits);
        Ok(())
    }
}
