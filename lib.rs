//! Remote processor control for the DaVinci DSP
//!
//! Boots, stops and signals the C674x DSP of a DA850 / OMAP-L138 from the
//! ARM host. The DSP's lifecycle is driven through the power/sleep
//! controller and the SYSCFG0 boot-address register; messages travel over
//! shared-memory virtqueues and are announced with the SYSCFG0 CHIPSIG
//! doorbell bits.
//!
//! The message transport, the remote-processor framework, clocks and
//! interrupt lines are reached through traits so the same driver runs on a
//! kernel or against test doubles.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

// Core modules
#[macro_use]
pub mod utils;
pub mod config;

// Architecture-specific code
pub mod arch;

// Interrupts, deferred work and locking
pub mod core;

// Device drivers
pub mod drivers;

pub use crate::drivers::remoteproc::davinci::{
    map_registers, probe, DavinciResources, DavinciRproc, RegisteredRproc,
};
pub use crate::drivers::remoteproc::stats::DoorbellStats;
pub use crate::drivers::remoteproc::{RprocOps, RprocState, Virtqueues};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resource named by an acquisition failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The DSP clock
    Clock,
    /// An interrupt line
    IrqLine(u32),
}

/// Common error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Boot address is not a multiple of 1 KiB
    Configuration(u32),
    /// Clock or interrupt line unavailable
    ResourceAcquisition(Resource),
    /// Remote processor handle could not be allocated
    Allocation,
    /// Framework registration failed
    Registration,
    /// The DSP did not acknowledge a doorbell in time
    TimedOut,
    /// Operation not valid in the current lifecycle state
    InvalidState,
    /// Invalid argument
    InvalidArgument,
    /// Not found
    NotFound,
    /// Work queue has no free slot
    QueueFull,
}

impl ::core::fmt::Display for Error {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            Error::Configuration(addr) => {
                write!(f, "boot address {:#010x} is not 1 KiB aligned", addr)
            }
            Error::ResourceAcquisition(Resource::Clock) => f.write_str("clock unavailable"),
            Error::ResourceAcquisition(Resource::IrqLine(irq)) => {
                write!(f, "interrupt line {} unavailable", irq)
            }
            Error::Allocation => f.write_str("remote processor allocation failed"),
            Error::Registration => f.write_str("remote processor registration failed"),
            Error::TimedOut => f.write_str("timed out waiting for doorbell acknowledge"),
            Error::InvalidState => f.write_str("invalid lifecycle state"),
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::NotFound => f.write_str("not found"),
            Error::QueueFull => f.write_str("work queue full"),
        }
    }
}

/// Result type alias
pub type Result<T> = ::core::result::Result<T, Error>;
