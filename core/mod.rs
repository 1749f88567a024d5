//! Core kernel services
//!
//! Interrupt registration, deferred work and the locking primitives the
//! drivers are built on.

pub mod irq;
pub mod sync;
pub mod workqueue;

pub use irq::{IrqFlags, IrqHandler, IrqManager, IrqNumber, IrqRegistry, IrqReturn, IrqToken};
pub use workqueue::{BoundedWorkQueue, Runnable, WorkItem, WorkQueue};
