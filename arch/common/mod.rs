//! Architecture-independent MMIO access, memory ordering and local
//! interrupt masking
//!
//! Register blocks are reached through the [`MmioAccess`] trait so the
//! protocol code above it can run against real memory-mapped hardware
//! ([`MmioRegion`]) or against a register-file model in tests.

use ::core::ptr::NonNull;
use volatile::VolatilePtr;

/// Memory-mapped I/O access trait
///
/// Offsets are byte offsets from the start of the region. Implementations
/// must perform exactly one bus access per call.
pub trait MmioAccess: Send + Sync {
    /// Read a 32-bit register
    fn read_u32(&self, offset: usize) -> u32;

    /// Write a 32-bit register
    fn write_u32(&self, offset: usize, value: u32);
}

/// A mapped MMIO window
pub struct MmioRegion {
    base: NonNull<u8>,
    size: usize,
}

// The region only hands out volatile accesses; register-level atomicity is a
// property of the bus, not of this type.
unsafe impl Send for MmioRegion {}
unsafe impl Sync for MmioRegion {}

impl MmioRegion {
    /// Create a new MMIO region
    ///
    /// # Safety
    /// `base` must point at a device mapping of at least `size` bytes that
    /// stays mapped for the lifetime of the region.
    pub const unsafe fn new(base: NonNull<u8>, size: usize) -> Self {
        Self { base, size }
    }

    /// Create a region from a raw (identity-mapped) physical address
    ///
    /// Returns `None` for a null base.
    ///
    /// # Safety
    /// Same contract as [`MmioRegion::new`].
    pub unsafe fn from_addr(addr: usize, size: usize) -> Option<Self> {
        NonNull::new(addr as *mut u8).map(|base| Self { base, size })
    }

    /// Get the base address
    pub fn base_address(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Get the size of the window in bytes
    pub const fn size(&self) -> usize {
        self.size
    }

    fn reg(&self, offset: usize) -> VolatilePtr<'_, u32> {
        debug_assert!(offset % 4 == 0, "unaligned register offset {:#x}", offset);
        debug_assert!(offset + 4 <= self.size, "register offset {:#x} outside window", offset);
        // SAFETY: the constructor contract covers `base..base + size`, and the
        // offset was checked against that window above.
        unsafe {
            VolatilePtr::new(NonNull::new_unchecked(
                self.base.as_ptr().add(offset).cast::<u32>(),
            ))
        }
    }
}

impl MmioAccess for MmioRegion {
    fn read_u32(&self, offset: usize) -> u32 {
        self.reg(offset).read()
    }

    fn write_u32(&self, offset: usize, value: u32) {
        self.reg(offset).write(value)
    }
}

/// Write memory barrier
///
/// Orders a register write before any later access to memory shared with
/// the coprocessor.
#[inline]
pub fn wmb() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "aarch64")] {
            use aarch64_cpu::asm::barrier;
            barrier::dmb(barrier::ST);
        } else {
            ::core::sync::atomic::fence(::core::sync::atomic::Ordering::Release);
        }
    }
}

/// Full memory barrier
#[inline]
pub fn mb() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "aarch64")] {
            use aarch64_cpu::asm::barrier;
            barrier::dsb(barrier::SY);
        } else {
            ::core::sync::atomic::fence(::core::sync::atomic::Ordering::SeqCst);
        }
    }
}

/// Local interrupt mask state saved by [`local_irq_save`]
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct IrqState(usize);

cfg_if::cfg_if! {
    if #[cfg(test)] {
        use std::cell::Cell;

        std::thread_local! {
            static MASKED: Cell<bool> = const { Cell::new(false) };
            static SAVES: Cell<usize> = const { Cell::new(0) };
        }

        /// Mask interrupts on the current CPU, returning the previous state
        pub fn local_irq_save() -> IrqState {
            SAVES.with(|saves| saves.set(saves.get() + 1));
            IrqState(MASKED.with(|masked| masked.replace(true)) as usize)
        }

        /// Restore a state returned by [`local_irq_save`]
        pub fn local_irq_restore(state: IrqState) {
            MASKED.with(|masked| masked.set(state.0 != 0));
        }

        /// Check if the calling thread runs with interrupts masked
        pub(crate) fn irqs_masked() -> bool {
            MASKED.with(Cell::get)
        }

        /// Number of [`local_irq_save`] calls on the calling thread
        pub(crate) fn irq_saves() -> usize {
            SAVES.with(Cell::get)
        }
    } else if #[cfg(target_arch = "aarch64")] {
        use aarch64_cpu::registers::{ReadWriteable, Readable, Writeable, DAIF};

        /// Mask interrupts on the current CPU, returning the previous state
        pub fn local_irq_save() -> IrqState {
            let daif = DAIF.get();
            DAIF.modify(DAIF::I::Masked);
            IrqState(daif as usize)
        }

        /// Restore a state returned by [`local_irq_save`]
        pub fn local_irq_restore(state: IrqState) {
            DAIF.set(state.0 as u64);
        }
    } else if #[cfg(target_arch = "arm")] {
        /// Mask interrupts on the current CPU, returning the previous state
        pub fn local_irq_save() -> IrqState {
            let cpsr: u32;
            // ARMv5 has no `cpsid`; set the CPSR I bit (0x80) by hand.
            unsafe {
                ::core::arch::asm!(
                    "mrs {cpsr}, cpsr",
                    "orr {tmp}, {cpsr}, #0x80",
                    "msr cpsr_c, {tmp}",
                    cpsr = out(reg) cpsr,
                    tmp = out(reg) _,
                    options(nostack),
                );
            }
            IrqState(cpsr as usize)
        }

        /// Restore a state returned by [`local_irq_save`]
        pub fn local_irq_restore(state: IrqState) {
            unsafe {
                ::core::arch::asm!(
                    "msr cpsr_c, {0}",
                    in(reg) state.0 as u32,
                    options(nostack),
                );
            }
        }
    } else {
        /// Mask interrupts on the current CPU, returning the previous state
        ///
        /// Hosts without a local interrupt mask have nothing to save.
        pub fn local_irq_save() -> IrqState {
            IrqState(0)
        }

        /// Restore a state returned by [`local_irq_save`]
        pub fn local_irq_restore(_state: IrqState) {}
    }
}
