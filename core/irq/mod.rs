//! Interrupt handling module
//!
//! Interrupt lines are requested through the [`IrqRegistry`] trait. The
//! in-crate [`IrqManager`] is a software registry that keeps a list of
//! actions per line, so a line may be shared between unrelated devices as
//! long as every requester passes [`IrqFlags::SHARED`].

use alloc::sync::Arc;
use alloc::vec::Vec;
use bitflags::bitflags;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::core::sync::SpinLock;
use crate::{Error, Resource, Result};

/// Interrupt number type
pub type IrqNumber = u32;

/// Outcome reported by an interrupt handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not raised by this handler's device
    None,
    /// The interrupt was serviced
    Handled,
}

impl IrqReturn {
    /// Combine the results of two handlers sharing a line
    pub fn merge(self, other: IrqReturn) -> IrqReturn {
        if self == IrqReturn::Handled || other == IrqReturn::Handled {
            IrqReturn::Handled
        } else {
            IrqReturn::None
        }
    }
}

bitflags! {
    /// Flags passed when requesting a line
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u32 {
        /// Line may be shared with other devices
        const SHARED = 1 << 0;
    }
}

/// Interrupt handler
///
/// Handlers run in interrupt context: they must not block, sleep or call
/// back into the registry.
pub trait IrqHandler: Send + Sync {
    /// Service an interrupt on `irq`
    fn handle(&self, irq: IrqNumber) -> IrqReturn;
}

/// Proof of a successful `request_irq`, consumed by `free_irq`
#[derive(Debug, PartialEq, Eq)]
pub struct IrqToken {
    irq: IrqNumber,
    id: u32,
}

impl IrqToken {
    /// Create a token; registries hand these out from `request_irq`
    pub const fn new(irq: IrqNumber, id: u32) -> Self {
        Self { irq, id }
    }

    /// Line this token refers to
    pub const fn irq(&self) -> IrqNumber {
        self.irq
    }

    /// Registry-specific action identifier
    pub const fn id(&self) -> u32 {
        self.id
    }
}

/// Interrupt line registration service
///
/// `request_irq` and `free_irq` are called from process context with
/// interrupts enabled. Any lock they share with the dispatch path must be
/// held with local interrupts masked, so a handler firing on the same CPU
/// never spins on it.
pub trait IrqRegistry: Send + Sync {
    /// Attach `handler` to `irq`
    fn request_irq(
        &self,
        irq: IrqNumber,
        flags: IrqFlags,
        name: &'static str,
        handler: Arc<dyn IrqHandler>,
    ) -> Result<IrqToken>;

    /// Detach a handler
    ///
    /// Must not return while the handler is still executing, and the handler
    /// must never be called again afterwards.
    fn free_irq(&self, token: IrqToken) -> Result<()>;
}

/// One registered handler on a line
struct IrqAction {
    id: u32,
    irq: IrqNumber,
    flags: IrqFlags,
    name: &'static str,
    handler: Arc<dyn IrqHandler>,
}

/// IRQ statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IrqStats {
    /// Total interrupts dispatched
    pub total_interrupts: u32,
    /// Dispatches no handler claimed
    pub unhandled_interrupts: u32,
}

/// Software interrupt registry
pub struct IrqManager {
    /// Registered actions, all lines
    actions: SpinLock<Vec<IrqAction>>,
    /// Next action identifier
    next_id: AtomicU32,
    /// Total interrupts dispatched
    total: AtomicU32,
    /// Dispatches no handler claimed
    unhandled: AtomicU32,
}

impl IrqManager {
    /// Create a new IRQ manager
    pub const fn new() -> Self {
        Self {
            actions: SpinLock::new(Vec::new()),
            next_id: AtomicU32::new(1),
            total: AtomicU32::new(0),
            unhandled: AtomicU32::new(0),
        }
    }

    /// Deliver an interrupt on `irq` to every action registered on it
    ///
    /// Called in interrupt context with local interrupts masked. The
    /// registry lock is held across the handlers, which is what lets
    /// `free_irq` act as a synchronization point.
    pub fn dispatch(&self, irq: IrqNumber) -> IrqReturn {
        self.total.fetch_add(1, Ordering::Relaxed);

        let actions = self.actions.lock();
        let ret = actions
            .iter()
            .filter(|action| action.irq == irq)
            .fold(IrqReturn::None, |ret, action| {
                ret.merge(action.handler.handle(irq))
            });

        if ret == IrqReturn::None {
            self.unhandled.fetch_add(1, Ordering::Relaxed);
            log::trace!("IRQ {} not claimed by any handler", irq);
        }
        ret
    }

    /// Number of actions currently attached to `irq`
    pub fn action_count(&self, irq: IrqNumber) -> usize {
        self.actions
            .lock_irqsave()
            .iter()
            .filter(|action| action.irq == irq)
            .count()
    }

    /// Names of the actions attached to `irq`, in registration order
    pub fn action_names(&self, irq: IrqNumber) -> Vec<&'static str> {
        self.actions
            .lock_irqsave()
            .iter()
            .filter(|action| action.irq == irq)
            .map(|action| action.name)
            .collect()
    }

    /// Get IRQ statistics
    pub fn get_stats(&self) -> IrqStats {
        IrqStats {
            total_interrupts: self.total.load(Ordering::Relaxed),
            unhandled_interrupts: self.unhandled.load(Ordering::Relaxed),
        }
    }
}

impl Default for IrqManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqRegistry for IrqManager {
    fn request_irq(
        &self,
        irq: IrqNumber,
        flags: IrqFlags,
        name: &'static str,
        handler: Arc<dyn IrqHandler>,
    ) -> Result<IrqToken> {
        let mut actions = self.actions.lock_irqsave();

        // Every user of a line has to agree to share it.
        let conflict = actions.iter().any(|action| {
            action.irq == irq
                && !(action.flags.contains(IrqFlags::SHARED) && flags.contains(IrqFlags::SHARED))
        });
        if conflict {
            log::warn!("IRQ {} busy, cannot attach '{}'", irq, name);
            return Err(Error::ResourceAcquisition(Resource::IrqLine(irq)));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        actions.push(IrqAction {
            id,
            irq,
            flags,
            name,
            handler,
        });

        log::debug!("IRQ {}: attached '{}' ({:?})", irq, name, flags);
        Ok(IrqToken::new(irq, id))
    }

    fn free_irq(&self, token: IrqToken) -> Result<()> {
        let mut actions = self.actions.lock_irqsave();
        let index = actions
            .iter()
            .position(|action| action.id == token.id && action.irq == token.irq)
            .ok_or(Error::NotFound)?;
        let action = actions.remove(index);

        log::debug!("IRQ {}: detached '{}'", action.irq, action.name);
        Ok(())
    }
}
