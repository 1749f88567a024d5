//! Remote processor support
//!
//! Interfaces between a remote processor driver and the framework that
//! loads firmware and owns the virtqueues, plus the DaVinci DSP driver.
//!
//! The framework allocates a handle for each remote processor and drives
//! it through the [`RprocOps`] the driver supplies. Message traffic runs
//! over two virtqueues: [`RX_VQ`] carries buffers from the remote side to
//! the host, [`TX_VQ`] carries host buffers to the remote side.

use alloc::sync::Arc;

use crate::Result;

pub mod davinci;
pub mod doorbell;
pub mod event;
pub mod irq;
pub mod regs;
pub mod reset;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

/// Virtqueue the host receives on
pub const RX_VQ: usize = 0;

/// Virtqueue the host transmits on; release notifications are sent here
pub const TX_VQ: usize = 1;

/// Remote processor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RprocState {
    /// Held in local reset
    Halted,
    /// Released from reset and executing firmware
    Running,
}

/// Driver operations the framework calls
pub trait RprocOps: Send + Sync {
    /// Power up and release the remote processor at `boot_addr`
    fn start(&self, boot_addr: u32) -> Result<()>;

    /// Halt the remote processor and release its resources
    fn stop(&self) -> Result<()>;

    /// Tell the remote processor that virtqueue `vqid` has new entries
    fn kick(&self, vqid: usize) -> Result<()>;
}

/// Virtqueue transport
///
/// Errors inside the transport are the transport's business; these calls
/// only report whether work was done.
pub trait Virtqueues: Send + Sync {
    /// Process one used entry of virtqueue `index`
    ///
    /// Returns `true` if an entry was consumed.
    fn try_pop_one(&self, index: usize) -> bool;

    /// Wake producers waiting for free buffers on virtqueue `index`
    fn notify_release(&self, index: usize);
}

/// Framework handle of an allocated remote processor
#[derive(Debug, PartialEq, Eq)]
pub struct RprocHandle {
    id: u32,
    name: &'static str,
    firmware: &'static str,
}

impl RprocHandle {
    /// Create a handle; frameworks hand these out from `alloc`
    pub const fn new(id: u32, name: &'static str, firmware: &'static str) -> Self {
        Self { id, name, firmware }
    }

    /// Framework-assigned identifier
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Remote processor name
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Firmware image name
    pub const fn firmware(&self) -> &'static str {
        self.firmware
    }
}

/// Remote processor framework
pub trait RprocFramework: Send + Sync {
    /// Allocate a handle driven through `ops`
    ///
    /// Fails with `Allocation`.
    fn alloc(
        &self,
        name: &'static str,
        ops: Arc<dyn RprocOps>,
        firmware: &'static str,
    ) -> Result<RprocHandle>;

    /// Make the remote processor available to users
    ///
    /// Fails with `Registration`.
    fn register(&self, handle: &RprocHandle) -> Result<()>;

    /// Withdraw a registered remote processor
    fn unregister(&self, handle: &RprocHandle) -> Result<()>;

    /// Release a handle
    fn free(&self, handle: RprocHandle);
}
