//! DSP local reset through the power/sleep controller
//!
//! The DSP's module control register keeps the power domain enabled in
//! both states; only the local reset bit moves. The register is written
//! whole, never read-modify-written.

use alloc::sync::Arc;

use super::regs::{self, MDCTL};
use crate::arch::{mb, MmioAccess};

/// Local reset line of one PSC module
pub struct LocalReset {
    regs: Arc<dyn MmioAccess>,
    mdctl: usize,
}

impl LocalReset {
    /// Local reset of module `lpsc` in the PSC mapped at `regs`
    pub fn new(regs: Arc<dyn MmioAccess>, lpsc: u32) -> Self {
        Self {
            regs,
            mdctl: regs::mdctl(lpsc),
        }
    }

    /// Hold the DSP in reset
    pub fn assert(&self) {
        self.write((MDCTL::NEXT::Enable + MDCTL::LRST::Asserted).value);
    }

    /// Let the DSP run from its boot address
    pub fn release(&self) {
        self.write((MDCTL::NEXT::Enable + MDCTL::LRST::Released).value);
    }

    /// Check if the DSP is out of reset
    #[cfg(test)]
    pub fn is_released(&self) -> bool {
        let mdctl = self.regs.read_u32(self.mdctl);
        tock_registers::LocalRegisterCopy::<u32, MDCTL::Register>::new(mdctl)
            .matches_all(MDCTL::LRST::Released)
    }

    fn write(&self, value: u32) {
        log::debug!("MDCTL@{:#x} <- {:#x}", self.mdctl, value);
        self.regs.write_u32(self.mdctl, value);
        // The reset state has to land before the boot address or clock
        // change that follows.
        mb();
    }
}
