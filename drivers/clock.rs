//! Clock service interface
//!
//! Clocks are looked up by name and handed out as owned handles. Dropping
//! a handle without [`Clock::release`] leaks the provider's reference.

use alloc::boxed::Box;

use crate::Result;

/// An acquired clock
pub trait Clock: Send {
    /// Ungate the clock
    fn enable(&mut self) -> Result<()>;

    /// Gate the clock
    fn disable(&mut self);

    /// Return the handle to its provider
    fn release(self: Box<Self>);
}

/// Clock lookup service
pub trait ClockProvider: Send + Sync {
    /// Acquire the clock called `name`
    ///
    /// Fails with `ResourceAcquisition(Resource::Clock)` when no such clock
    /// exists or it cannot be handed out.
    fn get(&self, name: &str) -> Result<Box<dyn Clock>>;
}
