//! Platform device interface
//!
//! What a driver's probe routine needs from the bus-level device it binds
//! to.

use crate::Result;

/// Mask covering the low `bits` address bits
pub const fn dma_bit_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Platform device handed to probe
pub trait PlatformDevice: Send + Sync {
    /// Device name
    fn name(&self) -> &str;

    /// Restrict coherent DMA allocations to the low `bits` address bits
    fn set_coherent_dma_mask(&self, bits: u32) -> Result<()>;
}
