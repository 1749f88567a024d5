//! Architecture support
//!
//! Only the architecture-independent MMIO layer is needed by the
//! coprocessor driver; barrier and interrupt-mask selection per target
//! lives in [`common`].

pub mod common;

pub use common::{local_irq_restore, local_irq_save, mb, wmb, IrqState, MmioAccess, MmioRegion};
